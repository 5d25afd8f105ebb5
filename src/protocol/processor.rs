//! Command processing.
//!
//! Turns one decoded [`CommandRequest`] into either an immediate
//! [`Response`] or a request to start a transfer.  Every failure is
//! answered with an error response; nothing escapes to the caller.
//!
//! Order of work for an accepted command:
//!
//! 1. narrow the command kind (unknown → `"Unknown command"`);
//! 2. refuse `update` while a transfer is queued or running;
//! 3. parse `latest_time` / `period`, falling back to current settings;
//! 4. validate and apply a new `name` ([`CommandProcessor::apply_rename`]);
//! 5. write origin and period through and queue work for the tick loop.
//!
//! Steps 1–3 touch no state, so a malformed value leaves settings and the
//! armed schedule exactly as they were.

use log::{info, warn};

use super::message::Response;
use crate::adapters::utils::validate_device_name;
use crate::app::commands::{Command, CommandKind, CommandRequest};
use crate::app::events::AppEvent;
use crate::app::ports::{ConnHandle, EventSink, NameStore, RadioPort};
use crate::connection::ConnectionTracker;
use crate::error::{Error, Result};
use crate::session::SessionContext;
use crate::timefmt::{self, Period};

/// What the caller must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Send this response now.
    Respond(Response),
    /// The tick loop will stream the log and then send `"Data update"`.
    BeginTransfer,
}

/// Borrowed view of everything a command may touch besides the session.
pub struct CommandProcessor<'a, R, N> {
    pub radio: &'a mut R,
    pub names: &'a mut N,
    pub tracker: &'a mut ConnectionTracker,
    pub sink: &'a mut dyn EventSink,
}

impl<R: RadioPort, N: NameStore> CommandProcessor<'_, R, N> {
    pub fn process(
        &mut self,
        req: CommandRequest,
        conn: ConnHandle,
        ctx: &mut SessionContext,
    ) -> Dispatch {
        match self.try_process(req, conn, ctx) {
            Ok(dispatch) => dispatch,
            Err(e) => {
                warn!("cmd: rejected: {}", e);
                self.sink.emit(&AppEvent::CommandRejected(e));
                Dispatch::Respond(Response::from_error(&e))
            }
        }
    }

    fn try_process(
        &mut self,
        req: CommandRequest,
        conn: ConnHandle,
        ctx: &mut SessionContext,
    ) -> Result<Dispatch> {
        let cmd = Command::try_from(req)?;

        if cmd.kind == CommandKind::Update && ctx.is_transfer_busy() {
            return Err(Error::Busy);
        }

        let clock = cmd
            .latest_time
            .as_deref()
            .map(timefmt::parse_timestamp)
            .transpose()?;
        let origin = clock.unwrap_or(ctx.settings.origin_time);
        let period = match cmd.period.as_deref() {
            Some(text) => text.parse::<Period>()?,
            None => ctx.settings.period,
        };

        if let Some(name) = cmd.name.as_deref() {
            self.apply_rename(name, ctx)?;
        }

        ctx.settings.origin_time = origin;
        ctx.settings.period = period;
        ctx.mark_pending(cmd.kind, conn, clock);

        info!(
            "cmd: {} accepted (origin={}, period={})",
            cmd.kind.as_str(),
            timefmt::format_wire(&origin),
            period
        );
        self.sink.emit(&AppEvent::CommandAccepted(cmd.kind));

        Ok(match cmd.kind {
            CommandKind::Setting => Dispatch::Respond(Response::settings(ctx.settings.echo())),
            CommandKind::Update => Dispatch::BeginTransfer,
        })
    }

    /// Validate, update the advertised identity, persist and re-arm
    /// advertising.
    ///
    /// Either every step lands or none does: a failed save puts the old
    /// identity back.  Advertising is only restarted when no peer is
    /// connected; a connected peer sees the new name after it disconnects.
    pub fn apply_rename(&mut self, name: &str, ctx: &mut SessionContext) -> Result<()> {
        validate_device_name(name)?;
        self.radio.set_identity(name)?;
        if let Err(e) = self.names.save(name) {
            if let Err(restore) = self.radio.set_identity(&ctx.settings.name) {
                warn!("cmd: restoring identity '{}' failed: {}", ctx.settings.name, restore);
            }
            return Err(e.into());
        }
        ctx.settings.name = name.to_string();

        if !self.tracker.is_connected() {
            if let Err(e) = self.tracker.readvertise(&mut *self.radio) {
                warn!("cmd: re-advertise after rename failed: {}", e);
            }
        }

        info!("cmd: renamed to '{}'", name);
        self.sink.emit(&AppEvent::Renamed {
            name: name.to_string(),
        });
        Ok(())
    }
}
