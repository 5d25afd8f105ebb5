//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production, stderr on the host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::timefmt;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn field(v: Option<f32>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { name } => info!("START | advertising as '{}'", name),
            AppEvent::Connected(conn) => info!("CONN  | connected conn={}", conn),
            AppEvent::Disconnected { conn, readvertised } => info!(
                "CONN  | disconnected conn={} readvertised={}",
                conn, readvertised
            ),
            AppEvent::AdvertisingRestarted => info!("CONN  | advertising restarted"),
            AppEvent::CommandAccepted(kind) => info!("CMD   | {} accepted", kind.as_str()),
            AppEvent::CommandRejected(e) => warn!("CMD   | rejected: {}", e),
            AppEvent::Renamed { name } => info!("CMD   | renamed to '{}'", name),
            AppEvent::ClockSet(t) => info!("CMD   | clock set to {}", timefmt::format_wire(t)),
            AppEvent::ScheduleArmed { origin, period } => info!(
                "LOG   | armed origin={} period={}",
                timefmt::format_wire(origin),
                period
            ),
            AppEvent::RecordLogged { time, reading } => info!(
                "LOG   | {} T={}\u{00b0}C RH={}% cpu={}",
                timefmt::format_record(time),
                field(reading.temperature),
                field(reading.humidity),
                field(reading.cpu_temperature),
            ),
            AppEvent::RecordFailed { time } => {
                warn!("LOG   | append failed at {}", timefmt::format_record(time))
            }
            AppEvent::TransferCompleted { batches, lines } => {
                info!("XFER  | done, {} lines in {} batches", lines, batches)
            }
            AppEvent::TransferFailed(e) => warn!("XFER  | failed: {}", e),
        }
    }
}
