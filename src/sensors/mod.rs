//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns the DHT20 and the analog probe and produces one
//! [`SensorReading`] per scheduled sample.  A failed read becomes a
//! `None` field; it never aborts the sample.

pub mod cpu_temp;
pub mod dht20;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::{SensorPort, SensorReading};
use cpu_temp::AnalogProbe;
use dht20::Dht20;

/// Round to two decimal places, as logged.
pub fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

/// Aggregates all sensor drivers and produces a unified reading.
pub struct SensorHub<I2C, D, A> {
    dht: Dht20<I2C>,
    delay: D,
    probe: A,
}

impl<I2C, D, A> SensorHub<I2C, D, A>
where
    I2C: I2c,
    D: DelayNs,
    A: AnalogProbe,
{
    pub fn new(i2c: I2C, delay: D, probe: A) -> Self {
        Self {
            dht: Dht20::new(i2c),
            delay,
            probe,
        }
    }
}

impl<I2C, D, A> SensorPort for SensorHub<I2C, D, A>
where
    I2C: I2c,
    D: DelayNs,
    A: AnalogProbe,
{
    fn sample(&mut self) -> SensorReading {
        let (temperature, humidity) = match self.dht.measure(&mut self.delay) {
            Ok(m) => (Some(round2(m.temperature)), Some(round2(m.humidity))),
            Err(e) => {
                warn!("DHT20: {}", e);
                (None, None)
            }
        };
        let cpu_temperature = match self.probe.read_u16() {
            Ok(raw) => Some(round2(cpu_temp::raw_to_reading(raw))),
            Err(e) => {
                warn!("probe: {}", e);
                None
            }
        };
        SensorReading {
            temperature,
            humidity,
            cpu_temperature,
        }
    }
}
