//! Timestamp and period text formats.
//!
//! The wire carries `YYYY-MM-DD HH:MM:SS` (a `T` separator is accepted on
//! input); log records use `YYYY-MM-DDTHH:MM:SS`.  Epochs are whole
//! seconds since 1970-01-01 with the RTC treated as UTC.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, NaiveDateTime};

use crate::error::SettingsError;

pub const WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const RECORD_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a wire timestamp.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, SettingsError> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, WIRE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, RECORD_FORMAT))
        .map_err(|_| SettingsError::InvalidTime)
}

pub fn format_wire(t: &NaiveDateTime) -> String {
    t.format(WIRE_FORMAT).to_string()
}

pub fn format_record(t: &NaiveDateTime) -> String {
    t.format(RECORD_FORMAT).to_string()
}

pub fn to_epoch(t: &NaiveDateTime) -> i64 {
    t.and_utc().timestamp()
}

pub fn from_epoch(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

// ---------------------------------------------------------------------------
// Sampling period
// ---------------------------------------------------------------------------

/// A non-zero sampling period in whole seconds.
///
/// Parsed from `H:M:S`, `M:S` or `S`; displayed as zero-padded `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(u32);

impl Period {
    pub const ONE_HOUR: Self = Self(3600);

    pub fn from_secs(secs: u32) -> Option<Self> {
        (secs > 0).then_some(Self(secs))
    }

    pub fn as_secs(self) -> u32 {
        self.0
    }
}

impl FromStr for Period {
    type Err = SettingsError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut parts = [0u32; 3];
        let mut count = 0;
        for field in text.trim().split(':') {
            if count == parts.len() {
                return Err(SettingsError::InvalidPeriod);
            }
            let field = field.trim();
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(SettingsError::InvalidPeriod);
            }
            parts[count] = field.parse().map_err(|_| SettingsError::InvalidPeriod)?;
            count += 1;
        }

        // Right-align so "M:S" and "S" fill the low units.
        let (h, m, s) = match count {
            1 => (0, 0, parts[0]),
            2 => (0, parts[0], parts[1]),
            3 => (parts[0], parts[1], parts[2]),
            _ => return Err(SettingsError::InvalidPeriod),
        };

        let secs = h
            .checked_mul(3600)
            .and_then(|v| v.checked_add(m.checked_mul(60)?))
            .and_then(|v| v.checked_add(s))
            .ok_or(SettingsError::InvalidPeriod)?;

        Self::from_secs(secs).ok_or(SettingsError::InvalidPeriod)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        write!(f, "{h:02}:{m:02}:{s:02}")
    }
}
