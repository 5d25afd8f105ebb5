//! Node configuration parameters
//!
//! All tunable parameters for the SensorNode logger.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Sensor log file, relative to the storage root.
pub const DATA_FILE: &str = "sensor_data.csv";

/// Persisted device name, relative to the storage root.
pub const NAME_FILE: &str = "name.txt";

/// Column names of the sensor log header row.
pub const DATA_HEADER: [&str; 4] = ["time", "tp", "hd", "cputp"];

/// Longest device name that still fits the advertising payload.
pub const MAX_NAME_LEN: usize = 29;

/// How inbound write fragments are delimited into messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FramingMode {
    /// A message ends when its outermost JSON object closes.
    #[default]
    Braces,
    /// Each message is preceded by a 4-byte little-endian length.
    LengthPrefixed,
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Identity ---
    /// Prefix of the default device name (`<prefix><last 4 hex of chip id>`)
    pub name_prefix: String,

    // --- Radio ---
    /// Advertising interval (microseconds)
    pub advertise_interval_us: u32,
    /// How often the tick loop checks that advertising is alive (milliseconds)
    pub adv_check_interval_ms: u32,
    /// How long the node may sit disconnected before advertising is forced (milliseconds)
    pub adv_grace_ms: u32,
    /// ATT MTU assumed until the peer negotiates a larger one
    pub default_mtu: u16,

    // --- Protocol ---
    /// Inbound message delimiting
    pub framing: FramingMode,
    /// Largest inbound message accepted before the partial buffer is discarded (bytes)
    pub max_message_len: u16,

    // --- Transfer ---
    /// Data lines per batch notification
    pub batch_size: u16,
    /// Pause between batch notifications (milliseconds)
    pub batch_pacing_ms: u32,

    // --- Logging ---
    /// Origin time used until a controller sends one (`YYYY-MM-DD HH:MM:SS`)
    pub default_origin: String,
    /// Sampling period used until a controller sends one (`H:M:S`)
    pub default_period: String,
    /// Main loop tick interval (milliseconds)
    pub tick_interval_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name_prefix: String::from("MedM"),

            advertise_interval_us: 1_000_000, // 1 s
            adv_check_interval_ms: 5_000,
            adv_grace_ms: 5_000,
            default_mtu: 23,

            framing: FramingMode::Braces,
            max_message_len: 1024,

            batch_size: 10,
            batch_pacing_ms: 300,

            default_origin: String::from("2025-01-01 00:00:00"),
            default_period: String::from("01:00:00"),
            tick_interval_ms: 1_000, // 1 Hz
        }
    }
}
