//! Shared utilities for name validation.
//!
//! Used by the command processor (controller-supplied names) and the
//! name file adapter (names read back from flash).

use crate::config::MAX_NAME_LEN;
use crate::error::SettingsError;

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
pub(crate) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// A device name must be 1–[`MAX_NAME_LEN`] printable ASCII bytes.
pub(crate) fn validate_device_name(name: &str) -> Result<(), SettingsError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || !is_printable_ascii(name) {
        return Err(SettingsError::InvalidName);
    }
    Ok(())
}
