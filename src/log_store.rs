//! Append-only sensor log with a header row.
//!
//! The file is CSV: one header line (`time,tp,hd,cputp`) followed by data
//! lines in append order.  The header is never data.  Failed readings are
//! written as empty fields.

use core::fmt::Write as _;

use chrono::NaiveDateTime;
use log::{info, warn};

use crate::app::ports::{RecordFile, SensorReading};
use crate::config::DATA_HEADER;
use crate::error::StorageError;
use crate::timefmt;

/// One row of the log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    pub time: NaiveDateTime,
    pub reading: SensorReading,
}

impl LogRecord {
    pub fn new(time: NaiveDateTime, reading: SensorReading) -> Self {
        Self { time, reading }
    }

    /// `2025-01-01T00:00:00,21.5,40.12,` (missing cpu reading)
    pub fn to_csv_line(&self) -> String {
        let mut line = timefmt::format_record(&self.time);
        for field in [
            self.reading.temperature,
            self.reading.humidity,
            self.reading.cpu_temperature,
        ] {
            line.push(',');
            if let Some(v) = field {
                let _ = write!(line, "{v}");
            }
        }
        line
    }
}

pub fn header_line() -> String {
    DATA_HEADER.join(",")
}

pub struct LogStore<F: RecordFile> {
    file: F,
}

impl<F: RecordFile> LogStore<F> {
    pub fn new(file: F) -> Self {
        Self { file }
    }

    /// Create the file with its header if it is missing or empty.
    ///
    /// Returns `Ok(true)` if the header was written.
    pub fn ensure_header(&mut self) -> Result<bool, StorageError> {
        match self.file.read_to_string() {
            Ok(text) if !text.trim().is_empty() => Ok(false),
            Ok(_) | Err(StorageError::NotFound) => {
                self.file.overwrite(&format!("{}\n", header_line()))?;
                info!("log: created with header");
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    pub fn append(&mut self, record: &LogRecord) -> Result<(), StorageError> {
        // A log deleted behind our back gets its header back first.
        if matches!(self.file.read_to_string(), Err(StorageError::NotFound)) {
            self.ensure_header()?;
        }
        self.file.append(&format!("{}\n", record.to_csv_line()))
    }

    /// All data lines in append order; a missing file has none.
    pub fn read_data_lines(&self) -> Result<Vec<String>, StorageError> {
        let text = match self.file.read_to_string() {
            Ok(text) => text,
            Err(StorageError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(text
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Drop every data line, keeping only the header.
    pub fn truncate_to_header(&mut self) -> Result<(), StorageError> {
        self.file
            .overwrite(&format!("{}\n", header_line()))
            .inspect_err(|e| warn!("log: truncate failed: {}", e))
    }

    pub fn file(&self) -> &F {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut F {
        &mut self.file
    }

    pub fn into_inner(self) -> F {
        self.file
    }
}
