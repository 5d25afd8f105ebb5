//! Outbound MTU fragmentation for GATT notifications.
//!
//! A notification carries at most `mtu - 3` bytes of attribute value
//! (3 bytes of ATT header).  Messages longer than that are split into
//! consecutive notifications; the controller concatenates them and reuses
//! the same brace-balanced framing it expects for commands.
//!
//! The negotiated MTU is reported by the stack callback (`ESP_GATTS_MTU_EVT`)
//! and cached in an atomic so the adapter can read it from the main loop.
//!
//! ```text
//! payload: {"batch":{"index":1,"total":3},"data":[...]}
//!          ├── mtu-3 ──┤├── mtu-3 ──┤├── mtu-3 ──┤├ rest ┤
//! ```

use core::sync::atomic::{AtomicU16, Ordering};

use log::debug;

use crate::error::RadioError;

/// ATT header bytes in every notification.
pub const ATT_HEADER_LEN: usize = 3;

/// Minimum ATT MTU mandated by the Bluetooth core spec.
pub const MIN_MTU: u16 = 23;

/// Largest ATT MTU the stack negotiates.
pub const MAX_MTU: u16 = 517;

static NEGOTIATED_MTU: AtomicU16 = AtomicU16::new(MIN_MTU);

/// Record the MTU negotiated with the current peer (clamped to spec range).
pub fn set_mtu(mtu: u16) {
    let clamped = mtu.clamp(MIN_MTU, MAX_MTU);
    debug!("BLE: MTU {}", clamped);
    NEGOTIATED_MTU.store(clamped, Ordering::Relaxed);
}

/// Revert to the default MTU (on disconnect).
pub fn reset_mtu() {
    NEGOTIATED_MTU.store(MIN_MTU, Ordering::Relaxed);
}

pub fn current_mtu() -> u16 {
    NEGOTIATED_MTU.load(Ordering::Relaxed)
}

/// Bytes of payload one notification can carry at `mtu`.
pub fn max_notify_len(mtu: u16) -> usize {
    usize::from(mtu.max(MIN_MTU)) - ATT_HEADER_LEN
}

/// Split `payload` into notification-sized fragments.
pub fn fragments(payload: &[u8], mtu: u16) -> core::slice::Chunks<'_, u8> {
    payload.chunks(max_notify_len(mtu))
}

/// Send `payload` as one or more notifications through `notify_fn`.
///
/// Stops at the first failed fragment.  Returns the number of
/// notifications sent.
pub fn send_fragmented<F>(payload: &[u8], mtu: u16, mut notify_fn: F) -> Result<usize, RadioError>
where
    F: FnMut(&[u8]) -> Result<(), RadioError>,
{
    let mut sent = 0;
    for frag in fragments(payload, mtu) {
        notify_fn(frag)?;
        sent += 1;
    }
    Ok(sent)
}

// ── Tests ────────────────────────────────────────────────────
