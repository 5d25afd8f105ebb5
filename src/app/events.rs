//! Outbound application events.
//!
//! The [`NodeService`](super::service::NodeService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, count them in a
//! test, etc.

use chrono::NaiveDateTime;

use super::commands::CommandKind;
use super::ports::{ConnHandle, SensorReading};
use crate::error::{Error, TransferError};
use crate::timefmt::Period;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started advertising under `name`.
    Started { name: String },

    /// A central connected.
    Connected(ConnHandle),

    /// A central disconnected; `readvertised` is true if that left no peers.
    Disconnected { conn: ConnHandle, readvertised: bool },

    /// The advertising watchdog restarted advertising.
    AdvertisingRestarted,

    /// A command passed validation and was applied to the session.
    CommandAccepted(CommandKind),

    /// A message was answered with an error response.
    CommandRejected(Error),

    /// The device name changed (already persisted).
    Renamed { name: String },

    /// The RTC was set from a controller-supplied time.
    ClockSet(NaiveDateTime),

    /// The sampling schedule was (re)armed.
    ScheduleArmed { origin: NaiveDateTime, period: Period },

    /// A record was appended to the log.
    RecordLogged { time: NaiveDateTime, reading: SensorReading },

    /// A record could not be written.
    RecordFailed { time: NaiveDateTime },

    /// Every batch was delivered and the log was reset to its header.
    TransferCompleted { batches: usize, lines: usize },

    /// A transfer was aborted; the log is untouched unless the error is `Truncate`.
    TransferFailed(TransferError),
}
