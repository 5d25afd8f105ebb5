//! Application service: the hexagonal core.
//!
//! [`NodeService`] owns the session, connection tracker, scheduler and
//! log store.  It exposes a clean, hardware-agnostic API.  All I/O flows
//! through port traits, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!  EventSource ──▶ ┌──────────────────────────────┐ ──▶ RadioPort
//!                  │         NodeService          │
//!   SensorPort ──▶ │ Session · Tracker · Schedule │ ──▶ RecordFile
//!    ClockPort ◀─▶ └──────────────────────────────┘ ──▶ EventSink
//! ```
//!
//! Radio events are handled as they are drained; command responses go
//! out immediately.  Everything slow (clock sync, re-arming, transfers,
//! sampling) happens on the tick path.

use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::adapters::utils::validate_device_name;
use crate::config::NodeConfig;
use crate::connection::{AdvertisingWatchdog, ConnectionTracker};
use crate::error::{Error, RadioError};
use crate::events::RadioEvent;
use crate::log_store::{LogRecord, LogStore};
use crate::protocol::framing::FrameAssembler;
use crate::protocol::message::Response;
use crate::protocol::processor::{CommandProcessor, Dispatch};
use crate::protocol::transfer::{ChunkedTransfer, TransferLink};
use crate::scheduler::SampleScheduler;
use crate::session::{SessionContext, Settings};
use crate::timefmt::{self, Period};

use super::commands::{CommandKind, CommandRequest};
use super::events::AppEvent;
use super::ports::{
    ClockPort, ConnHandle, EventSink, EventSource, NameStore, RadioPort, RecordFile,
    SampleDelegate, SensorPort,
};

/// Message of the final response to an `update` command.
pub const TRANSFER_DONE_MESSAGE: &str = "Data update";

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

pub struct NodeService<R, F: RecordFile, N, C, S> {
    config: NodeConfig,
    radio: R,
    store: LogStore<F>,
    names: N,
    clock: C,
    sensor: S,
    session: SessionContext,
    tracker: ConnectionTracker,
    watchdog: AdvertisingWatchdog,
    scheduler: SampleScheduler,
    transfer: ChunkedTransfer,
    tick_count: u64,
}

impl<R, F, N, C, S> NodeService<R, F, N, C, S>
where
    R: RadioPort,
    F: RecordFile,
    N: NameStore,
    C: ClockPort,
    S: SensorPort,
{
    /// Build the service from configuration and adapters.
    ///
    /// The device name is the persisted one if present and valid,
    /// otherwise `default_name`.  Does **not** touch the radio; call
    /// [`start`](Self::start) next.
    pub fn new(
        config: NodeConfig,
        default_name: &str,
        radio: R,
        file: F,
        names: N,
        clock: C,
        sensor: S,
    ) -> Self {
        let name = match names.load() {
            Ok(Some(stored)) if validate_device_name(&stored).is_ok() => stored,
            Ok(Some(stored)) => {
                warn!("stored name {:?} is invalid, using default", stored);
                default_name.to_string()
            }
            Ok(None) => default_name.to_string(),
            Err(e) => {
                warn!("name load failed ({}), using default", e);
                default_name.to_string()
            }
        };

        let origin_time = timefmt::parse_timestamp(&config.default_origin).unwrap_or_else(|_| {
            warn!("bad default origin {:?}", config.default_origin);
            NaiveDateTime::default()
        });
        let period = config.default_period.parse().unwrap_or_else(|_| {
            warn!("bad default period {:?}", config.default_period);
            Period::ONE_HOUR
        });

        let assembler = FrameAssembler::new(config.framing, usize::from(config.max_message_len));
        let session = SessionContext::new(
            Settings {
                name,
                origin_time,
                period,
            },
            assembler,
        );

        Self {
            watchdog: AdvertisingWatchdog::new(config.adv_check_interval_ms, config.adv_grace_ms),
            transfer: ChunkedTransfer::new(config.batch_size, config.batch_pacing_ms),
            config,
            radio,
            store: LogStore::new(file),
            names,
            clock,
            sensor,
            session,
            tracker: ConnectionTracker::new(),
            scheduler: SampleScheduler::new(),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Create the log header, publish the identity and start advertising.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        if let Err(e) = self.store.ensure_header() {
            warn!("log header init failed: {}", e);
        }
        let name = self.session.settings.name.clone();
        if let Err(e) = self.radio.set_identity(&name) {
            warn!("identity init failed: {}", e);
        }
        match self.tracker.readvertise(&mut self.radio) {
            Ok(()) => info!("NodeService started, advertising as '{}'", name),
            Err(e) => warn!("advertising failed at start: {}", e),
        }
        sink.emit(&AppEvent::Started { name });
    }

    // ── Radio events ──────────────────────────────────────────

    pub fn handle_event(&mut self, event: RadioEvent, sink: &mut impl EventSink) {
        match event {
            RadioEvent::Write { conn, data } => self.on_write(conn, &data, sink),
            other => apply_connection_event(&mut self.tracker, &mut self.radio, other, &mut *sink),
        }
    }

    fn on_write(&mut self, conn: ConnHandle, data: &[u8], sink: &mut impl EventSink) {
        self.session.assembler().push(data);
        loop {
            match self.session.assembler().next_message() {
                Ok(Some(req)) => self.process_request(conn, req, sink),
                Ok(None) => break,
                Err(e) => {
                    let err = Error::from(e);
                    warn!("cmd: decode failed: {}", err);
                    sink.emit(&AppEvent::CommandRejected(err));
                    self.respond(conn, &Response::from_error(&err));
                    break;
                }
            }
        }
    }

    fn process_request(&mut self, conn: ConnHandle, req: CommandRequest, sink: &mut impl EventSink) {
        let dispatch = CommandProcessor {
            radio: &mut self.radio,
            names: &mut self.names,
            tracker: &mut self.tracker,
            sink: &mut *sink,
        }
        .process(req, conn, &mut self.session);
        match dispatch {
            Dispatch::Respond(response) => self.respond(conn, &response),
            Dispatch::BeginTransfer => debug!("transfer queued for conn {}", conn),
        }
    }

    fn respond(&mut self, conn: ConnHandle, response: &Response) {
        if let Err(e) = self.radio.notify(conn, &response.to_bytes()) {
            warn!("response to conn {} failed: {}", conn, e);
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one main-loop cycle: drain radio events → advertising check →
    /// pending command → sampling.
    pub fn tick<E, D>(&mut self, events: &mut E, delay: &mut D, sink: &mut impl EventSink)
    where
        E: EventSource,
        D: DelayNs,
    {
        self.tick_count += 1;

        // 1. Radio events queued by the stack callbacks
        while let Some(event) = events.poll_event() {
            self.handle_event(event, sink);
        }

        // 2. Advertising watchdog
        match self
            .watchdog
            .poll(self.clock.uptime_ms(), &mut self.tracker, &mut self.radio)
        {
            Ok(true) => {
                info!("advertising restarted by watchdog");
                sink.emit(&AppEvent::AdvertisingRestarted);
            }
            Ok(false) => {}
            Err(e) => warn!("advertising watchdog: {}", e),
        }

        // 3. Work queued by an accepted command
        if let Some(work) = self.session.take_pending() {
            let origin = self.session.settings.origin_time;
            let period = self.session.settings.period;
            // An RTC still behind the origin (cold boot) would never reach it.
            let clock = work
                .clock
                .or_else(|| (self.clock.now() < origin).then_some(origin));
            if let Some(time) = clock {
                self.clock.set(time);
                info!("RTC set to {}", timefmt::format_wire(&time));
                sink.emit(&AppEvent::ClockSet(time));
            }
            self.scheduler.arm(&origin, period);
            sink.emit(&AppEvent::ScheduleArmed { origin, period });

            if work.kind == CommandKind::Update {
                self.run_transfer(work.reply_to, events, delay, sink);
            }
        }

        // 4. Sampling
        let now = self.clock.now();
        self.scheduler.tick(
            &now,
            &mut SampleWriter {
                store: &mut self.store,
                sensor: &mut self.sensor,
                sink: &mut *sink,
            },
        );
    }

    fn run_transfer<E, D>(
        &mut self,
        reply_to: ConnHandle,
        events: &mut E,
        delay: &mut D,
        sink: &mut impl EventSink,
    ) where
        E: EventSource,
        D: DelayNs,
    {
        self.session.set_transfer_active(true);
        let mut deferred = Vec::new();

        let result = {
            let mut link = SessionLink {
                radio: &mut self.radio,
                tracker: &mut self.tracker,
                session: &mut self.session,
                events,
                deferred: &mut deferred,
                sink: &mut *sink,
                conn: reply_to,
            };
            self.transfer.run(&mut self.store, &mut link, delay)
        };

        let response = match result {
            Ok(report) => {
                info!(
                    "transfer complete: {} lines in {} batches",
                    report.lines, report.batches
                );
                sink.emit(&AppEvent::TransferCompleted {
                    batches: report.batches,
                    lines: report.lines,
                });
                Response::success(TRANSFER_DONE_MESSAGE)
            }
            Err(e) => {
                warn!("transfer failed: {}", e);
                sink.emit(&AppEvent::TransferFailed(e));
                Response::error(TRANSFER_DONE_MESSAGE)
            }
        };

        if self.tracker.contains(reply_to) {
            self.respond(reply_to, &response);
        }

        // Settings written mid-transfer apply once it is over.
        for (conn, req) in deferred {
            self.process_request(conn, req, sink);
        }
        self.session.set_transfer_active(false);
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.session.settings
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &SampleScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &LogStore<F> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LogStore<F> {
        &mut self.store
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn names(&self) -> &N {
        &self.names
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Tear down into the adapters (used to simulate a restart).
    pub fn into_parts(self) -> (R, F, N, C, S) {
        (
            self.radio,
            self.store.into_inner(),
            self.names,
            self.clock,
            self.sensor,
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Connection events
// ───────────────────────────────────────────────────────────────

fn apply_connection_event<R: RadioPort>(
    tracker: &mut ConnectionTracker,
    radio: &mut R,
    event: RadioEvent,
    sink: &mut dyn EventSink,
) {
    match event {
        RadioEvent::Connected(conn) => {
            tracker.on_connect(conn);
            sink.emit(&AppEvent::Connected(conn));
        }
        RadioEvent::Disconnected(conn) => {
            let readvertised = match tracker.on_disconnect(conn, radio) {
                Ok(readvertised) => readvertised,
                Err(e) => {
                    warn!("re-advertise after disconnect failed: {} (watchdog will retry)", e);
                    false
                }
            };
            sink.emit(&AppEvent::Disconnected { conn, readvertised });
        }
        RadioEvent::Write { .. } => {}
    }
}

// ───────────────────────────────────────────────────────────────
// Transfer link
// ───────────────────────────────────────────────────────────────

/// Sends batches to the requesting peer.  Liveness checks drain the radio
/// channel so a disconnect during the transfer is seen between batches.
/// A second `update` is refused on the spot; other commands are held
/// back until the transfer ends.
struct SessionLink<'a, R, E> {
    radio: &'a mut R,
    tracker: &'a mut ConnectionTracker,
    session: &'a mut SessionContext,
    events: &'a mut E,
    deferred: &'a mut Vec<(ConnHandle, CommandRequest)>,
    sink: &'a mut dyn EventSink,
    conn: ConnHandle,
}

impl<R: RadioPort, E> SessionLink<'_, R, E> {
    fn on_write(&mut self, conn: ConnHandle, data: &[u8]) {
        self.session.assembler().push(data);
        loop {
            let err = match self.session.assembler().next_message() {
                Ok(Some(req)) if req.kind() == Some(CommandKind::Update) => Error::Busy,
                Ok(Some(req)) => {
                    self.deferred.push((conn, req));
                    continue;
                }
                Ok(None) => break,
                Err(e) => Error::from(e),
            };
            warn!("cmd: rejected during transfer: {}", err);
            self.sink.emit(&AppEvent::CommandRejected(err));
            if let Err(e) = self.radio.notify(conn, &Response::from_error(&err).to_bytes()) {
                warn!("response to conn {} failed: {}", conn, e);
            }
            if err != Error::Busy {
                break;
            }
        }
    }
}

impl<R: RadioPort, E: EventSource> TransferLink for SessionLink<'_, R, E> {
    fn is_live(&mut self) -> bool {
        while let Some(event) = self.events.poll_event() {
            match event {
                RadioEvent::Write { conn, data } => self.on_write(conn, &data),
                other => apply_connection_event(
                    &mut *self.tracker,
                    &mut *self.radio,
                    other,
                    &mut *self.sink,
                ),
            }
        }
        self.tracker.contains(self.conn)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.radio.notify(self.conn, payload)
    }
}

// ───────────────────────────────────────────────────────────────
// Sample writer
// ───────────────────────────────────────────────────────────────

struct SampleWriter<'a, F: RecordFile, S> {
    store: &'a mut LogStore<F>,
    sensor: &'a mut S,
    sink: &'a mut dyn EventSink,
}

impl<F: RecordFile, S: SensorPort> SampleDelegate for SampleWriter<'_, F, S> {
    fn on_sample_due(&mut self, at: &NaiveDateTime) {
        let reading = self.sensor.sample();
        let record = LogRecord::new(*at, reading);
        match self.store.append(&record) {
            Ok(()) => {
                info!("logged {}", record.to_csv_line());
                self.sink.emit(&AppEvent::RecordLogged { time: *at, reading });
            }
            Err(e) => {
                warn!("log append failed at {}: {}", timefmt::format_record(at), e);
                self.sink.emit(&AppEvent::RecordFailed { time: *at });
            }
        }
    }
}
