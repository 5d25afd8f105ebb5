//! Flash filesystem adapter.
//!
//! Implements [`RecordFile`] for the sensor log and [`NameStore`] for the
//! persisted device name on top of `std::fs`.  On target the files live on
//! the SPIFFS partition mounted by `main` at [`SPIFFS_ROOT`]; on the host
//! any directory works.
//!
//! The name file holds the bare name with no trailing newline.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::utils::validate_device_name;
use crate::app::ports::{NameStore, RecordFile};
use crate::config::{DATA_FILE, NAME_FILE};
use crate::error::StorageError;

/// VFS mount point of the data partition.
pub const SPIFFS_ROOT: &str = "/spiffs";

const ENOSPC: i32 = 28;

fn map_io(e: io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        _ if e.raw_os_error() == Some(ENOSPC) => StorageError::Full,
        _ => {
            warn!("fs: {}", e);
            StorageError::Io
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Sensor log
// ───────────────────────────────────────────────────────────────

pub struct FileRecordStore {
    path: PathBuf,
}

impl FileRecordStore {
    /// The log file under `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(DATA_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordFile for FileRecordStore {
    fn read_to_string(&self) -> Result<String, StorageError> {
        fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => StorageError::Corrupted,
            _ => map_io(e),
        })
    }

    fn append(&mut self, text: &str) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(map_io)?;
        file.write_all(text.as_bytes()).map_err(map_io)?;
        file.flush().map_err(map_io)
    }

    fn overwrite(&mut self, text: &str) -> Result<(), StorageError> {
        fs::write(&self.path, text).map_err(map_io)?;
        debug!("fs: rewrote {} ({} bytes)", self.path.display(), text.len());
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Device name
// ───────────────────────────────────────────────────────────────

pub struct FileNameStore {
    path: PathBuf,
}

impl FileNameStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(NAME_FILE),
        }
    }
}

impl NameStore for FileNameStore {
    /// Whitespace is trimmed; a blank or invalid file reads as no name.
    fn load(&self) -> Result<Option<String>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(map_io(e)),
        };
        let name = text.trim();
        if validate_device_name(name).is_err() {
            if !name.is_empty() {
                warn!("fs: ignoring invalid stored name {:?}", name);
            }
            return Ok(None);
        }
        Ok(Some(name.to_string()))
    }

    fn save(&mut self, name: &str) -> Result<(), StorageError> {
        fs::write(&self.path, name).map_err(map_io)
    }
}
