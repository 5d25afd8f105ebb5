//! Radio event channel.
//!
//! GATT/GAP callbacks run in the Bluedroid task and cannot touch the
//! service directly.  They only enqueue [`RadioEvent`]s into a bounded
//! `embassy-sync` channel; the main loop drains it once per tick.
//!
//! ```text
//! ┌──────────────────┐  RadioEvent  ┌──────────────┐
//! │ GATT/GAP callback│─────────────▶│  Main Loop   │
//! │ (Bluedroid task) │  try_send    │ (tick drain) │
//! └──────────────────┘              └──────────────┘
//! ```
//!
//! Producers never block: when the channel is full the event is dropped
//! and counted, and the caller logs it.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::app::ports::{ConnHandle, EventSource};

/// Largest single GATT write we accept (BLE 5 max attribute length).
pub const MAX_WRITE_LEN: usize = 512;

/// Channel depth for radio events.
pub const RADIO_EVENT_DEPTH: usize = 16;

/// Something the radio stack reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// A central connected.
    Connected(ConnHandle),
    /// A central disconnected.
    Disconnected(ConnHandle),
    /// A central wrote to the RX characteristic.
    Write {
        conn: ConnHandle,
        data: Vec<u8, MAX_WRITE_LEN>,
    },
}

impl RadioEvent {
    /// Build a write event; `None` if `bytes` exceeds [`MAX_WRITE_LEN`].
    pub fn write(conn: ConnHandle, bytes: &[u8]) -> Option<Self> {
        Vec::from_slice(bytes)
            .ok()
            .map(|data| Self::Write { conn, data })
    }
}

pub type RadioEventChannel = Channel<CriticalSectionRawMutex, RadioEvent, RADIO_EVENT_DEPTH>;

/// Radio callbacks → main loop.
pub static RADIO_EVENTS: RadioEventChannel = Channel::new();

static DROPPED_EVENTS: AtomicU32 = AtomicU32::new(0);

/// Enqueue without blocking.  Returns `false` if the channel was full.
pub fn push_radio_event(event: RadioEvent) -> bool {
    push_into(&RADIO_EVENTS, event)
}

pub fn push_into(channel: &RadioEventChannel, event: RadioEvent) -> bool {
    if channel.try_send(event).is_ok() {
        true
    } else {
        DROPPED_EVENTS.fetch_add(1, Ordering::Relaxed);
        false
    }
}

/// Events lost to a full channel since boot.
pub fn dropped_events() -> u32 {
    DROPPED_EVENTS.load(Ordering::Relaxed)
}

impl EventSource for &RadioEventChannel {
    fn poll_event(&mut self) -> Option<RadioEvent> {
        self.try_receive().ok()
    }
}
