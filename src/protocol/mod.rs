//! Controller protocol: JSON commands in, responses and log batches out.
//!
//! ```text
//! GATT writes ──▶ framing ──▶ processor ──▶ Response ──▶ notify
//!                                  │
//!                                  └──▶ transfer (tick path) ──▶ batches
//! ```

pub mod framing;
pub mod message;
pub mod processor;
pub mod transfer;
