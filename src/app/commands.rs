//! Inbound commands from the controller.
//!
//! The wire object is decoded once into [`CommandRequest`] (all fields
//! optional, unknown fields ignored) and then narrowed to a [`Command`]
//! whose kind is a closed enum.  Anything that is not `"setting"` or
//! `"update"` never gets past [`Command::try_from`].

use serde::Deserialize;

use crate::error::Error;

/// The two commands the node understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Change settings and re-arm logging.
    Setting,
    /// Same as `Setting`, then stream the log back.
    Update,
}

impl CommandKind {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "setting" => Some(Self::Setting),
            "update" => Some(Self::Update),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setting => "setting",
            Self::Update => "update",
        }
    }
}

/// Raw command object as it appears on the wire.
///
/// `null` and absent fields both deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub command: Option<serde_json::Value>,
    #[serde(default)]
    pub latest_time: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CommandRequest {
    /// The command kind, if the `command` field names a known one.
    pub fn kind(&self) -> Option<CommandKind> {
        self.command
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(CommandKind::parse)
    }
}

/// A command with a known kind; field values are still unvalidated text.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub latest_time: Option<String>,
    pub period: Option<String>,
    /// Empty names are folded into `None`.
    pub name: Option<String>,
}

impl TryFrom<CommandRequest> for Command {
    type Error = Error;

    fn try_from(req: CommandRequest) -> Result<Self, Error> {
        let kind = req.kind().ok_or(Error::UnknownCommand)?;

        Ok(Self {
            kind,
            latest_time: req.latest_time,
            period: req.period,
            name: req.name.filter(|n| !n.is_empty()),
        })
    }
}
