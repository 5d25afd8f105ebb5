//! SensorNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod log_store;
pub mod pins;
pub mod protocol;
pub mod scheduler;
pub mod sensors;
pub mod session;
pub mod timefmt;
