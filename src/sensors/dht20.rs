//! DHT20 (AHT20 core) temperature / humidity sensor over I²C.
//!
//! One measurement: trigger with `AC 33 00`, wait 80 ms, read 7 bytes
//! (status, 20-bit humidity, 20-bit temperature, CRC-8).
//!
//! ```text
//! byte  0       1      2      3          4      5      6
//!       status  rh     rh     rh|t       t      t      crc
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::SensorError;

pub const DHT20_ADDR: u8 = 0x38;

const CMD_TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];
const MEASURE_WAIT_MS: u32 = 80;
const STATUS_BUSY: u8 = 0x80;
const FULL_SCALE: f32 = 1_048_576.0; // 2^20

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Percent relative humidity.
    pub humidity: f32,
}

/// CRC-8, polynomial 0x31, initial value 0xFF.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Decode a 7-byte measurement frame.
pub fn decode(frame: &[u8; 7]) -> Result<Measurement, SensorError> {
    if frame[0] & STATUS_BUSY != 0 {
        return Err(SensorError::Busy);
    }
    if crc8(&frame[..6]) != frame[6] {
        return Err(SensorError::Checksum);
    }
    let raw_rh = (u32::from(frame[1]) << 12) | (u32::from(frame[2]) << 4) | (u32::from(frame[3]) >> 4);
    let raw_t = (u32::from(frame[3] & 0x0F) << 16) | (u32::from(frame[4]) << 8) | u32::from(frame[5]);
    Ok(Measurement {
        humidity: raw_rh as f32 / FULL_SCALE * 100.0,
        temperature: raw_t as f32 / FULL_SCALE * 200.0 - 50.0,
    })
}

pub struct Dht20<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> Dht20<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            addr: DHT20_ADDR,
        }
    }

    /// Trigger a conversion and read it back.
    pub fn measure<D: DelayNs>(&mut self, delay: &mut D) -> Result<Measurement, SensorError> {
        self.i2c
            .write(self.addr, &CMD_TRIGGER)
            .map_err(|_| SensorError::Bus)?;
        delay.delay_ms(MEASURE_WAIT_MS);
        let mut frame = [0u8; 7];
        self.i2c
            .read(self.addr, &mut frame)
            .map_err(|_| SensorError::Bus)?;
        decode(&frame)
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}
