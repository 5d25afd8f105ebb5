//! Device identity derived from the ESP32 factory MAC address.
//!
//! The default advertised name is `<prefix>XXXX`, where `XXXX` is the last
//! four characters of the MAC in uppercase hex (e.g. `MedMCAFE`).  It is
//! stable across reboots and only used until a controller renames the
//! node.

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Uppercase hex of the whole MAC (`DEADBEEFCAFE`).
pub fn unique_id_hex(mac: &MacAddress) -> heapless::String<12> {
    let mut id = heapless::String::new();
    for b in mac {
        let _ = write!(id, "{:02X}", b);
    }
    id
}

/// `<prefix>` followed by the last four hex characters of the MAC.
pub fn default_device_name(prefix: &str, mac: &MacAddress) -> String {
    let hex = unique_id_hex(mac);
    format!("{}{}", prefix, &hex[hex.len() - 4..])
}
