//! WebSocket wire messages.

use help_alert::AlertSnapshot;
use serde::{Deserialize, Serialize};

/// Outcome label in command replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    /// The request took effect.
    Success,
    /// The request was valid but had nothing to do.
    Ignored,
}

/// Messages sent from the server to an observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Reply to a successful authentication.
    Authenticate {
        /// Always `success`; failures close the stream instead.
        status: ReplyStatus,
    },
    /// Current alert state.
    Status {
        /// The alert snapshot.
        status: AlertSnapshot,
    },
    /// Reply to a command.
    Result {
        /// Outcome, absent when the command was invalid.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<ReplyStatus>,
        /// Human-readable outcome.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Set when the command could not be understood.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ServerMessage {
    /// Successful authentication reply.
    #[must_use]
    pub const fn authenticated() -> Self {
        Self::Authenticate {
            status: ReplyStatus::Success,
        }
    }

    /// A command outcome.
    #[must_use]
    pub fn result(status: ReplyStatus, message: impl Into<String>) -> Self {
        Self::Result {
            status: Some(status),
            message: Some(message.into()),
            error: None,
        }
    }

    /// Reply for a missing or unknown command.
    #[must_use]
    pub fn invalid_command() -> Self {
        Self::Result {
            status: None,
            message: None,
            error: Some("Invalid command.".to_string()),
        }
    }
}

/// Messages sent from an observer to the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Must be the first message on every stream.
    Authenticate {
        /// The shared application token.
        #[serde(rename = "appToken", default)]
        app_token: String,
    },
    /// An alert command.
    Command {
        /// `alert` or `acknowledge`.
        #[serde(default)]
        command: Option<String>,
    },
}

/// Commands an authenticated observer may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCommand {
    /// Trigger the alert.
    Alert,
    /// Acknowledge the alert.
    Acknowledge,
}

impl AlertCommand {
    /// Parse a command name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "alert" => Some(Self::Alert),
            "acknowledge" => Some(Self::Acknowledge),
            _ => None,
        }
    }
}
