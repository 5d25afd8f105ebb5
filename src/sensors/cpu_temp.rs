//! Analog probe on ADC channel 4.
//!
//! The reading is reported as `voltage × 100` on a 16-bit scale
//! (`raw × 3.3 / 65535 × 100`).  The ESP32 ADC is 12-bit, so target
//! readings are widened to 16 bits before conversion.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `main` wraps the oneshot ADC channel in a closure.
//! On host/test: reads from a static AtomicU16 for injection.

use core::sync::atomic::{AtomicU16, Ordering};

use crate::error::SensorError;

const V_REF: f32 = 3.3;
const FULL_SCALE_16: f32 = 65_535.0;

static SIM_PROBE_RAW: AtomicU16 = AtomicU16::new(0);

pub fn sim_set_probe_raw(raw: u16) {
    SIM_PROBE_RAW.store(raw, Ordering::Relaxed);
}

/// Source of raw 16-bit ADC samples.
pub trait AnalogProbe {
    fn read_u16(&mut self) -> Result<u16, SensorError>;
}

impl<F> AnalogProbe for F
where
    F: FnMut() -> Result<u16, SensorError>,
{
    fn read_u16(&mut self) -> Result<u16, SensorError> {
        self()
    }
}

/// Host probe backed by [`sim_set_probe_raw`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SimProbe;

impl AnalogProbe for SimProbe {
    fn read_u16(&mut self) -> Result<u16, SensorError> {
        Ok(SIM_PROBE_RAW.load(Ordering::Relaxed))
    }
}

/// Widen a 12-bit ADC sample to the full 16-bit range.
pub fn widen_12_bit(raw: u16) -> u16 {
    let raw = raw & 0x0FFF;
    (raw << 4) | (raw >> 8)
}

pub fn raw_to_reading(raw: u16) -> f32 {
    f32::from(raw) * V_REF / FULL_SCALE_16 * 100.0
}
