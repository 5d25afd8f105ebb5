//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeService (domain)
//! ```
//!
//! Driven adapters (radio, log file, name file, RTC, sensors, event sinks,
//! config storage) implement these traits.  The
//! [`NodeService`](super::service::NodeService) consumes them via generics,
//! so the domain core never touches hardware directly.
//!
//! ## Contract notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **RecordFile** `overwrite` MUST replace the whole file; a torn write
//!   that leaves data lines behind would resend them on the next transfer.
//! - All port errors are typed; callers must handle every variant explicitly.

use chrono::NaiveDateTime;

use crate::config::NodeConfig;
use crate::error::{RadioError, StorageError};
use crate::events::RadioEvent;

/// Opaque connection handle assigned by the radio stack.
pub type ConnHandle = u16;

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain → GATT server)
// ───────────────────────────────────────────────────────────────

/// Outbound side of the wireless peripheral.
///
/// Inbound traffic (connects, disconnects, writes) arrives as
/// [`RadioEvent`]s through an [`EventSource`] instead.
pub trait RadioPort {
    /// Send one logical message to `conn` on the notify characteristic.
    /// Adapters split it into MTU-sized notifications as needed.
    fn notify(&mut self, conn: ConnHandle, payload: &[u8]) -> Result<(), RadioError>;

    /// (Re)start connectable advertising with the current identity.
    fn start_advertising(&mut self) -> Result<(), RadioError>;

    /// Update the GAP device name and the advertising payload.
    fn set_identity(&mut self, name: &str) -> Result<(), RadioError>;
}

// ───────────────────────────────────────────────────────────────
// Event source (driven adapter: radio callbacks → domain)
// ───────────────────────────────────────────────────────────────

/// Non-blocking source of radio events, drained once per tick.
pub trait EventSource {
    fn poll_event(&mut self) -> Option<RadioEvent>;
}

// ───────────────────────────────────────────────────────────────
// Storage ports (driven adapter: domain ↔ flash filesystem)
// ───────────────────────────────────────────────────────────────

/// Whole-file access to the sensor log.
pub trait RecordFile {
    /// Read the complete file.  [`StorageError::NotFound`] if it does not exist.
    fn read_to_string(&self) -> Result<String, StorageError>;

    /// Append `text` at the end, creating the file if needed.
    fn append(&mut self, text: &str) -> Result<(), StorageError>;

    /// Replace the file contents with `text`.
    fn overwrite(&mut self, text: &str) -> Result<(), StorageError>;
}

/// Persisted device name (single value, overwritten wholesale).
pub trait NameStore {
    /// `Ok(None)` when no name has been stored yet.
    fn load(&self) -> Result<Option<String>, StorageError>;

    fn save(&mut self, name: &str) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: RTC + monotonic timer)
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Current wall-clock time from the RTC.
    fn now(&self) -> NaiveDateTime;

    /// Set the RTC.
    fn set(&mut self, time: NaiveDateTime);

    /// Milliseconds since boot (monotonic, unaffected by [`set`](Self::set)).
    fn uptime_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One sample of every sensor.  `None` marks a failed read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    /// Ambient temperature (°C).
    pub temperature: Option<f32>,
    /// Relative humidity (%).
    pub humidity: Option<f32>,
    /// Analog probe reading (scaled volts × 100).
    pub cpu_temperature: Option<f32>,
}

pub trait SensorPort {
    /// Read every sensor.  Individual failures become `None` fields.
    fn sample(&mut self) -> SensorReading;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`NodeConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from sensors and storage)
// ───────────────────────────────────────────────────────────────

/// Callback the [`SampleScheduler`](crate::scheduler::SampleScheduler)
/// invokes when a sample is due.
pub trait SampleDelegate {
    /// Take a sample and append a record stamped `at`.
    fn on_sample_due(&mut self, at: &NaiveDateTime);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
