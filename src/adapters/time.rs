//! ESP32 clock adapter.
//!
//! Implements [`ClockPort`]: wall-clock time from the RTC plus monotonic
//! uptime.
//!
//! - **`target_os = "espidf"`**: `gettimeofday` / `settimeofday` for the
//!   RTC and `esp_timer_get_time()` for uptime.
//! - **`not(target_os = "espidf")`**: an offset over `std::time::Instant`
//!   for host-side simulation.
//!
//! The RTC is treated as UTC; the node has no notion of time zones.

use chrono::NaiveDateTime;
use log::warn;

use crate::app::ports::ClockPort;
use crate::timefmt;

pub struct RtcClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    /// Wall-clock epoch at `start`.
    #[cfg(not(target_os = "espidf"))]
    base_epoch: i64,
}

impl Default for RtcClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RtcClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            base_epoch: 0,
        }
    }

    #[cfg(target_os = "espidf")]
    fn epoch_now(&self) -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            warn!("RTC: gettimeofday failed");
            return 0;
        }
        tv.tv_sec as i64
    }

    #[cfg(not(target_os = "espidf"))]
    fn epoch_now(&self) -> i64 {
        self.base_epoch + self.start.elapsed().as_secs() as i64
    }

    #[cfg(target_os = "espidf")]
    fn set_epoch(&mut self, secs: i64) {
        let tv = esp_idf_svc::sys::timeval {
            tv_sec: secs as esp_idf_svc::sys::time_t,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::settimeofday(&tv, core::ptr::null()) } != 0 {
            warn!("RTC: settimeofday failed");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_epoch(&mut self, secs: i64) {
        self.base_epoch = secs - self.start.elapsed().as_secs() as i64;
    }
}

impl ClockPort for RtcClock {
    fn now(&self) -> NaiveDateTime {
        let secs = self.epoch_now();
        timefmt::from_epoch(secs).unwrap_or_else(|| {
            warn!("RTC: epoch {} out of range", secs);
            NaiveDateTime::default()
        })
    }

    fn set(&mut self, time: NaiveDateTime) {
        self.set_epoch(timefmt::to_epoch(&time));
    }

    #[cfg(target_os = "espidf")]
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
