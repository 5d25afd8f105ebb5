//! GPIO / peripheral pin assignments for the sensor node board.
//!
//! Every driver references this module rather than hard-coding pin
//! numbers.

// ---------------------------------------------------------------------------
// I²C bus (DHT20)
// ---------------------------------------------------------------------------

pub const I2C_SCL_GPIO: i32 = 21;
pub const I2C_SDA_GPIO: i32 = 20;
pub const I2C_FREQ_HZ: u32 = 400_000;

// ---------------------------------------------------------------------------
// Analog probe (ADC1)
// ---------------------------------------------------------------------------

/// ADC1 channel 4 (GPIO 5 on ESP32-S3).
pub const PROBE_ADC_CHANNEL: u32 = 4;
pub const PROBE_ADC_GPIO: i32 = 5;
