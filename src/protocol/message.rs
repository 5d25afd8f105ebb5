//! Outbound JSON messages: command responses and log batches.

use serde::Serialize;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Settings echoed back by a successful `"setting"` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsEcho {
    pub latest_time: String,
    pub period: String,
    pub name: String,
}

/// `{ "status", "message", "data"? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SettingsEcho>,
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
            data: None,
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self::error(err.to_string())
    }

    pub fn settings(echo: SettingsEcho) -> Self {
        Self {
            status: Status::Success,
            message: String::from("Settings update"),
            data: Some(echo),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        to_json(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchHeader {
    /// 1-based.
    pub index: usize,
    pub total: usize,
}

/// `{ "batch": { "index", "total" }, "data": [line, ...] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchMessage<'a> {
    pub batch: BatchHeader,
    pub data: &'a [String],
}

impl BatchMessage<'_> {
    pub fn to_bytes(&self) -> Vec<u8> {
        to_json(self)
    }
}

fn to_json<T: Serialize>(value: &T) -> Vec<u8> {
    // Plain structs of strings and integers always serialize.
    serde_json::to_vec(value).unwrap_or_default()
}
