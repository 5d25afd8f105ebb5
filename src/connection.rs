//! Connection tracking and the advertising watchdog.
//!
//! Advertising is active exactly when no central is connected.  The
//! tracker restarts advertising the moment the last peer leaves; the
//! watchdog is a second line that re-advertises if the node has sat
//! disconnected past a grace interval (e.g. the restart call failed).

use heapless::Vec;
use log::{info, warn};

use crate::app::ports::{ConnHandle, RadioPort};
use crate::error::RadioError;

/// Most simultaneous peers the tracker records.
pub const MAX_CONNECTIONS: usize = 4;

#[derive(Debug, Default)]
pub struct ConnectionTracker {
    handles: Vec<ConnHandle, MAX_CONNECTIONS>,
    advertising: bool,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new peer.  Returns `false` if it was already known or the
    /// table is full.
    pub fn on_connect(&mut self, conn: ConnHandle) -> bool {
        // The stack stops advertising once a central connects.
        self.advertising = false;
        if self.handles.contains(&conn) {
            return false;
        }
        if self.handles.push(conn).is_err() {
            warn!("conn: table full, handle {} not tracked", conn);
            return false;
        }
        info!("conn: {} connected ({} live)", conn, self.handles.len());
        true
    }

    /// Forget a peer; restart advertising if none remain.
    ///
    /// Returns `Ok(true)` when advertising was restarted.
    pub fn on_disconnect<R: RadioPort>(
        &mut self,
        conn: ConnHandle,
        radio: &mut R,
    ) -> Result<bool, RadioError> {
        self.handles.retain(|h| *h != conn);
        info!("conn: {} disconnected ({} live)", conn, self.handles.len());
        if !self.handles.is_empty() {
            return Ok(false);
        }
        self.readvertise(radio)?;
        Ok(true)
    }

    pub fn readvertise<R: RadioPort>(&mut self, radio: &mut R) -> Result<(), RadioError> {
        match radio.start_advertising() {
            Ok(()) => {
                self.advertising = true;
                Ok(())
            }
            Err(e) => {
                self.advertising = false;
                Err(e)
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.handles.is_empty()
    }

    pub fn contains(&self, conn: ConnHandle) -> bool {
        self.handles.contains(&conn)
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn peers(&self) -> &[ConnHandle] {
        &self.handles
    }
}

/// Periodic "are we still discoverable?" check.
#[derive(Debug)]
pub struct AdvertisingWatchdog {
    check_interval_ms: u64,
    grace_ms: u64,
    last_check_ms: u64,
    disconnected_since_ms: Option<u64>,
}

impl AdvertisingWatchdog {
    pub fn new(check_interval_ms: u32, grace_ms: u32) -> Self {
        Self {
            check_interval_ms: u64::from(check_interval_ms),
            grace_ms: u64::from(grace_ms),
            last_check_ms: 0,
            disconnected_since_ms: None,
        }
    }

    /// Run the check if `check_interval_ms` has passed since the last one.
    ///
    /// Returns `Ok(true)` when advertising was restarted.
    pub fn poll<R: RadioPort>(
        &mut self,
        now_ms: u64,
        tracker: &mut ConnectionTracker,
        radio: &mut R,
    ) -> Result<bool, RadioError> {
        if tracker.is_connected() {
            self.disconnected_since_ms = None;
            return Ok(false);
        }
        let since = *self.disconnected_since_ms.get_or_insert(now_ms);

        if now_ms.saturating_sub(self.last_check_ms) < self.check_interval_ms {
            return Ok(false);
        }
        self.last_check_ms = now_ms;

        if now_ms.saturating_sub(since) < self.grace_ms {
            return Ok(false);
        }
        // Restart the grace window so a dead radio is retried once per grace period.
        self.disconnected_since_ms = Some(now_ms);
        tracker.readvertise(radio)?;
        Ok(true)
    }
}
