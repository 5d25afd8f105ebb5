//! Mock adapters for integration tests.
//!
//! Every port the service drives is replaced by an in-memory double that
//! records what it was asked to do, so tests can assert on the full
//! conversation without a radio, flash or sensors.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;
use sensornode::app::events::AppEvent;
use sensornode::app::ports::{
    ClockPort, ConnHandle, EventSink, EventSource, NameStore, RadioPort, RecordFile,
    SensorPort, SensorReading,
};
use sensornode::app::service::NodeService;
use sensornode::config::NodeConfig;
use sensornode::error::{RadioError, StorageError};
use sensornode::events::RadioEvent;
use sensornode::timefmt;

// ── Radio events ──────────────────────────────────────────────

/// Event queue shared between the test, the service and [`MockRadio`].
#[derive(Clone, Default)]
pub struct SharedEvents(Rc<RefCell<VecDeque<RadioEvent>>>);

#[allow(dead_code)]
impl SharedEvents {
    pub fn push(&self, event: RadioEvent) {
        self.0.borrow_mut().push_back(event);
    }

    pub fn connect(&self, conn: ConnHandle) {
        self.push(RadioEvent::Connected(conn));
    }

    pub fn disconnect(&self, conn: ConnHandle) {
        self.push(RadioEvent::Disconnected(conn));
    }

    pub fn write(&self, conn: ConnHandle, bytes: &[u8]) {
        self.push(RadioEvent::write(conn, bytes).unwrap());
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl EventSource for SharedEvents {
    fn poll_event(&mut self) -> Option<RadioEvent> {
        self.0.borrow_mut().pop_front()
    }
}

// ── MockRadio ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockRadio {
    /// Whole messages per connection, in send order.
    pub sent: Vec<(ConnHandle, String)>,
    pub adverts: u32,
    pub identity: Option<String>,
    /// Fail the notify with this 0-based index, once.
    pub fail_notify_at: Option<usize>,
    /// After this many successful notifies, queue the event.
    pub inject_after: Option<(usize, RadioEvent, SharedEvents)>,
}

#[allow(dead_code)]
impl MockRadio {
    pub fn messages_to(&self, conn: ConnHandle) -> Vec<serde_json::Value> {
        self.sent
            .iter()
            .filter(|(c, _)| *c == conn)
            .map(|(_, text)| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub fn last_to(&self, conn: ConnHandle) -> Option<serde_json::Value> {
        self.messages_to(conn).pop()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }

    /// Batch headers sent to `conn` as `(index, total)`.
    pub fn batches_to(&self, conn: ConnHandle) -> Vec<(u64, u64)> {
        self.messages_to(conn)
            .iter()
            .filter_map(|m| {
                let b = m.get("batch")?;
                Some((b["index"].as_u64()?, b["total"].as_u64()?))
            })
            .collect()
    }
}

impl RadioPort for MockRadio {
    fn notify(&mut self, conn: ConnHandle, payload: &[u8]) -> Result<(), RadioError> {
        if self.fail_notify_at == Some(self.sent.len()) {
            self.fail_notify_at = None;
            return Err(RadioError::NotifyFailed);
        }
        self.sent
            .push((conn, String::from_utf8(payload.to_vec()).unwrap()));
        if let Some((after, event, events)) = &self.inject_after {
            if self.sent.len() == *after {
                events.push(event.clone());
            }
        }
        Ok(())
    }

    fn start_advertising(&mut self) -> Result<(), RadioError> {
        self.adverts += 1;
        Ok(())
    }

    fn set_identity(&mut self, name: &str) -> Result<(), RadioError> {
        self.identity = Some(name.to_string());
        Ok(())
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemFile {
    pub text: Option<String>,
    pub fail_overwrite: bool,
}

#[allow(dead_code)]
impl MemFile {
    pub fn with_lines(lines: usize) -> Self {
        let mut text = String::from("time,tp,hd,cputp\n");
        for i in 0..lines {
            text.push_str(&format!("2025-01-01T00:{:02}:{:02},21.5,40,30\n", i / 60, i % 60));
        }
        Self {
            text: Some(text),
            fail_overwrite: false,
        }
    }

    pub fn data_lines(&self) -> Vec<String> {
        self.text
            .as_deref()
            .unwrap_or_default()
            .lines()
            .skip(1)
            .map(String::from)
            .collect()
    }
}

impl RecordFile for MemFile {
    fn read_to_string(&self) -> Result<String, StorageError> {
        self.text.clone().ok_or(StorageError::NotFound)
    }

    fn append(&mut self, text: &str) -> Result<(), StorageError> {
        self.text.get_or_insert_with(String::new).push_str(text);
        Ok(())
    }

    fn overwrite(&mut self, text: &str) -> Result<(), StorageError> {
        if self.fail_overwrite {
            return Err(StorageError::Io);
        }
        self.text = Some(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemNames {
    pub stored: Option<String>,
}

impl NameStore for MemNames {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.stored.clone())
    }

    fn save(&mut self, name: &str) -> Result<(), StorageError> {
        self.stored = Some(name.to_string());
        Ok(())
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// RTC that only moves when the test says so.
pub struct ManualClock {
    pub now: NaiveDateTime,
    pub uptime_ms: u64,
    pub sets: Vec<NaiveDateTime>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(text: &str) -> Self {
        Self {
            now: timefmt::parse_timestamp(text).unwrap(),
            uptime_ms: 0,
            sets: Vec::new(),
        }
    }

    pub fn advance_secs(&mut self, secs: i64) {
        self.now += chrono::Duration::seconds(secs);
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }

    fn set(&mut self, time: NaiveDateTime) {
        self.now = time;
        self.sets.push(time);
    }

    fn uptime_ms(&self) -> u64 {
        self.uptime_ms
    }
}

// ── Sensors ───────────────────────────────────────────────────

/// Returns the same reading every time and counts samples.
pub struct FixedSensor {
    pub reading: SensorReading,
    pub samples: u32,
}

impl Default for FixedSensor {
    fn default() -> Self {
        Self {
            reading: SensorReading {
                temperature: Some(21.5),
                humidity: Some(40.25),
                cpu_temperature: Some(30.0),
            },
            samples: 0,
        }
    }
}

impl SensorPort for FixedSensor {
    fn sample(&mut self) -> SensorReading {
        self.samples += 1;
        self.reading
    }
}

// ── Event sink / delay ────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

#[derive(Default)]
pub struct NoDelay {
    pub total_ms: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ms += u64::from(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += u64::from(ms);
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type MockService = NodeService<MockRadio, MemFile, MemNames, ManualClock, FixedSensor>;

/// A started service plus its event queue, delay and sink.
pub struct Rig {
    pub svc: MockService,
    pub events: SharedEvents,
    pub delay: NoDelay,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with(NodeConfig::default(), MemFile::default(), MemNames::default())
    }

    /// A log already holding `lines` data lines.
    pub fn with_lines(lines: usize) -> Self {
        Self::with(NodeConfig::default(), MemFile::with_lines(lines), MemNames::default())
    }

    pub fn with(config: NodeConfig, file: MemFile, names: MemNames) -> Self {
        let mut svc = NodeService::new(
            config,
            "MedMCAFE",
            MockRadio::default(),
            file,
            names,
            ManualClock::at("2024-12-31 23:59:00"),
            FixedSensor::default(),
        );
        let mut sink = RecordingSink::default();
        svc.start(&mut sink);
        Self {
            svc,
            events: SharedEvents::default(),
            delay: NoDelay::default(),
            sink,
        }
    }

    pub fn tick(&mut self) {
        let mut events = self.events.clone();
        self.svc.tick(&mut events, &mut self.delay, &mut self.sink);
    }

    /// Queue a write and run one tick.
    pub fn send(&mut self, conn: ConnHandle, json: &str) {
        self.events.write(conn, json.as_bytes());
        self.tick();
    }

    pub fn connect(&mut self, conn: ConnHandle) {
        self.events.connect(conn);
        self.tick();
    }

    pub fn advance(&mut self, secs: i64) {
        self.svc.clock_mut().advance_secs(secs);
    }

    pub fn radio(&self) -> &MockRadio {
        self.svc.radio()
    }

    pub fn radio_mut(&mut self) -> &mut MockRadio {
        self.svc.radio_mut()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.svc.store().read_data_lines().unwrap()
    }
}
