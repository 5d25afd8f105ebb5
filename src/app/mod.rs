//! Application core: pure domain logic, zero I/O.
//!
//! Command handling, the connection lifecycle, periodic sampling and the
//! log transfer are orchestrated by [`service::NodeService`].  All
//! interaction with the radio, flash and sensors happens through **port
//! traits** defined in [`ports`], keeping this layer testable without
//! real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
