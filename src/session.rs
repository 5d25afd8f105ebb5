//! Per-node session state.
//!
//! [`SessionContext`] is an explicit value owned by the service: the live
//! settings, the command waiting for the tick loop, and the partial-frame
//! buffer.  Only the command processor mutates settings.

use chrono::NaiveDateTime;

use crate::app::commands::CommandKind;
use crate::app::ports::ConnHandle;
use crate::protocol::framing::FrameAssembler;
use crate::protocol::message::SettingsEcho;
use crate::timefmt::{self, Period};

/// Settings a controller can change.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Persisted across restarts.
    pub name: String,
    /// Sampling origin; session-scoped.
    pub origin_time: NaiveDateTime,
    /// Sampling period; session-scoped.
    pub period: Period,
}

impl Settings {
    pub fn echo(&self) -> SettingsEcho {
        SettingsEcho {
            latest_time: timefmt::format_wire(&self.origin_time),
            period: self.period.to_string(),
            name: self.name.clone(),
        }
    }
}

/// Work queued by an accepted command for the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWork {
    pub kind: CommandKind,
    /// Who to answer when `kind` is `Update`.
    pub reply_to: ConnHandle,
    /// Controller-supplied time to load into the RTC.
    pub clock: Option<NaiveDateTime>,
}

pub struct SessionContext {
    pub settings: Settings,
    pending: Option<PendingWork>,
    transfer_active: bool,
    assembler: FrameAssembler,
}

impl SessionContext {
    pub fn new(settings: Settings, assembler: FrameAssembler) -> Self {
        Self {
            settings,
            pending: None,
            transfer_active: false,
            assembler,
        }
    }

    pub fn pending_command(&self) -> Option<CommandKind> {
        self.pending.map(|p| p.kind)
    }

    /// Queue `kind` for the tick loop.
    ///
    /// A queued `Update` is never downgraded by a later `Setting`: both
    /// re-arm the schedule, only `Update` also transfers.  The newest
    /// explicit clock value wins.
    pub fn mark_pending(&mut self, kind: CommandKind, conn: ConnHandle, clock: Option<NaiveDateTime>) {
        let next = match self.pending {
            Some(prev) => PendingWork {
                kind: if prev.kind == CommandKind::Update { prev.kind } else { kind },
                reply_to: if prev.kind == CommandKind::Update { prev.reply_to } else { conn },
                clock: clock.or(prev.clock),
            },
            None => PendingWork {
                kind,
                reply_to: conn,
                clock,
            },
        };
        self.pending = Some(next);
    }

    pub fn take_pending(&mut self) -> Option<PendingWork> {
        self.pending.take()
    }

    /// True while an update is queued or a transfer is running.
    pub fn is_transfer_busy(&self) -> bool {
        self.transfer_active || self.pending_command() == Some(CommandKind::Update)
    }

    pub fn set_transfer_active(&mut self, active: bool) {
        self.transfer_active = active;
    }

    pub fn assembler(&mut self) -> &mut FrameAssembler {
        &mut self.assembler
    }
}
