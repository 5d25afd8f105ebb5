//! Unified error types for the SensorNode firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! session layer's "catch everything, answer with an error response" rule
//! uniform.  The `Display` text of each variant is what the peer sees in
//! the `message` field of an error response.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Inbound bytes could not be turned into a command message.
    Decode(DecodeError),
    /// The `command` field was missing or not one we understand.
    UnknownCommand,
    /// A settings field (time, period, name) failed to parse or validate.
    Settings(SettingsError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// The radio stack rejected an operation.
    Radio(RadioError),
    /// A bulk log transfer did not complete.
    Transfer(TransferError),
    /// A transfer is already pending or running.
    Busy,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "{e}"),
            Self::UnknownCommand => write!(f, "Unknown command"),
            Self::Settings(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Transfer(e) => write!(f, "transfer: {e}"),
            Self::Busy => write!(f, "Transfer in progress"),
        }
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The assembled bytes are not a valid JSON command object.
    InvalidJson,
    /// The partial buffer grew past the configured maximum.
    Oversize,
    /// A length-prefixed frame announced zero bytes or too many.
    BadLength,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson => write!(f, "Invalid JSON"),
            Self::Oversize => write!(f, "Message too large"),
            Self::BadLength => write!(f, "Invalid frame length"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Settings errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    /// `latest_time` is not `YYYY-MM-DD HH:MM:SS`.
    InvalidTime,
    /// `period` is not `H:M:S`, `M:S` or `S`, or is zero.
    InvalidPeriod,
    /// `name` is too long or contains non-printable bytes.
    InvalidName,
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTime => write!(f, "Invalid time (expected YYYY-MM-DD HH:MM:SS)"),
            Self::InvalidPeriod => write!(f, "Invalid period (expected H:M:S, M:S or S)"),
            Self::InvalidName => write!(f, "Invalid name"),
        }
    }
}

impl From<SettingsError> for Error {
    fn from(e: SettingsError) -> Self {
        Self::Settings(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested file or key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error (open, read, write).
    Io,
    /// Stored bytes failed to deserialize.
    Corrupted,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Full => write!(f, "storage full"),
            Self::Io => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "corrupted"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Radio errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// No central is connected.
    NotConnected,
    /// GATT notify failed.
    NotifyFailed,
    /// GAP advertising could not be (re)started.
    AdvertiseFailed,
    /// Advertising payload or device name could not be set.
    IdentityFailed,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::NotifyFailed => write!(f, "notify failed"),
            Self::AdvertiseFailed => write!(f, "advertising failed"),
            Self::IdentityFailed => write!(f, "identity update failed"),
        }
    }
}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

// ---------------------------------------------------------------------------
// Transfer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// The peer disconnected before the given 1-based batch was sent.
    Disconnected { before_batch: usize },
    /// The radio rejected the notify for the given 1-based batch.
    SendFailed { batch: usize },
    /// Reading the log failed.
    Read,
    /// Every batch went out but the log could not be reset to its header.
    Truncate,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected { before_batch } => {
                write!(f, "peer disconnected before batch {before_batch}")
            }
            Self::SendFailed { batch } => write!(f, "send failed on batch {batch}"),
            Self::Read => write!(f, "log read failed"),
            Self::Truncate => write!(f, "log truncate failed"),
        }
    }
}

impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        Self::Transfer(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C transaction failed.
    Bus,
    /// The sensor is still measuring.
    Busy,
    /// CRC over the measurement bytes did not match.
    Checksum,
    /// ADC read failed.
    Adc,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "I2C transaction failed"),
            Self::Busy => write!(f, "sensor busy"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::Adc => write!(f, "ADC read failed"),
        }
    }
}

impl core::error::Error for Error {}
impl core::error::Error for DecodeError {}
impl core::error::Error for SettingsError {}
impl core::error::Error for StorageError {}
impl core::error::Error for RadioError {}
impl core::error::Error for TransferError {}
impl core::error::Error for SensorError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
