//! Epoch-driven sampling scheduler.
//!
//! Decides on every tick whether a sample is due.  The scheduler
//! notifies a [`SampleDelegate`] when it is; the service implements the
//! delegate to read the sensors and append a log record.
//!
//! ```text
//!            arm(origin, period)
//!   ┌──────┐ ───────────────────▶ ┌───────────────────────┐
//!   │ Idle │                      │ Armed(origin, period) │──┐ tick(now)
//!   └──────┘                      └───────────────────────┘◀─┘
//! ```
//!
//! While armed, a tick at RTC time `now` samples when all hold:
//!
//! - `now` is not before the origin;
//! - `now` differs from the last logged epoch;
//! - there is no last epoch, `now - last >= period`, or the RTC has been
//!   stepped back behind `last` (which re-baselines the schedule).

use chrono::NaiveDateTime;
use log::{debug, info};

use crate::app::ports::SampleDelegate;
use crate::timefmt::{self, Period};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Idle,
    Armed { origin_epoch: i64, period: Period },
}

pub struct SampleScheduler {
    state: ScheduleState,
    last_logged_epoch: Option<i64>,
}

impl Default for SampleScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleScheduler {
    pub fn new() -> Self {
        Self {
            state: ScheduleState::Idle,
            last_logged_epoch: None,
        }
    }

    /// Start (or restart) sampling from `origin` every `period`.
    ///
    /// The last logged epoch is kept so a re-arm can never produce a
    /// second record for an epoch that is already in the log.
    pub fn arm(&mut self, origin: &NaiveDateTime, period: Period) {
        let origin_epoch = timefmt::to_epoch(origin);
        info!(
            "Scheduler: armed origin={} period={}",
            timefmt::format_wire(origin),
            period
        );
        self.state = ScheduleState::Armed {
            origin_epoch,
            period,
        };
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    pub fn last_logged_epoch(&self) -> Option<i64> {
        self.last_logged_epoch
    }

    /// Tick the scheduler.  Call once per main loop tick.
    ///
    /// Returns `true` if `delegate.on_sample_due()` was called.
    pub fn tick(&mut self, now: &NaiveDateTime, delegate: &mut dyn SampleDelegate) -> bool {
        let ScheduleState::Armed {
            origin_epoch,
            period,
        } = self.state
        else {
            return false;
        };

        let current = timefmt::to_epoch(now);
        if current < origin_epoch {
            return false;
        }

        match self.last_logged_epoch {
            Some(last) if current == last => return false,
            Some(last) if current > last && current - last < i64::from(period.as_secs()) => {
                return false;
            }
            Some(last) if current < last => {
                debug!("Scheduler: clock stepped back {}s, re-baselining", last - current);
            }
            _ => {}
        }

        delegate.on_sample_due(now);
        self.last_logged_epoch = Some(current);
        true
    }
}
