//! Core types for the help request alert.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The status of the shared alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Nobody has asked for help.
    #[default]
    Ready,
    /// Help was requested and nobody has acknowledged it yet.
    Triggered,
    /// An admin has seen the request.
    Acknowledged,
}

impl AlertStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Triggered => "triggered",
            Self::Acknowledged => "acknowledged",
        }
    }

    /// Returns true while help has been requested but not yet seen.
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        matches!(self, Self::Triggered)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A consistent, point-in-time view of the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSnapshot {
    /// Current status.
    pub status: AlertStatus,
    /// When the alert last entered [`AlertStatus::Triggered`].
    pub last_trigger: Option<DateTime<Utc>>,
    /// Number of connected observers when the snapshot was taken.
    pub connections: usize,
}

/// What happened to a transition request.
///
/// Illegal transitions are not errors: concurrent observers race to trigger
/// and acknowledge, and the losers simply get [`TransitionOutcome::Ignored`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was applied; carries the state after it.
    Applied(AlertSnapshot),
    /// The request was a no-op; carries the unchanged state.
    Ignored(AlertSnapshot),
}

impl TransitionOutcome {
    /// Returns true if the transition was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// The alert state after handling the request.
    #[must_use]
    pub const fn snapshot(&self) -> &AlertSnapshot {
        match self {
            Self::Applied(s) | Self::Ignored(s) => s,
        }
    }
}

/// Delays and intervals driving the alert timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertTimings {
    /// How often notifications are re-sent while triggered.
    pub repeat_notify: Duration,
    /// How long an acknowledged alert stays acknowledged.
    pub ack_reset: Duration,
    /// How long a triggered alert may go unacknowledged before it resets.
    pub unacked_reset: Duration,
}

impl Default for AlertTimings {
    fn default() -> Self {
        Self {
            repeat_notify: Duration::from_secs(10),
            ack_reset: Duration::from_secs(2 * 60),
            unacked_reset: Duration::from_secs(60 * 60),
        }
    }
}

impl AlertTimings {
    /// Set the repeat notification interval.
    #[must_use]
    pub const fn with_repeat_notify(mut self, interval: Duration) -> Self {
        self.repeat_notify = interval;
        self
    }

    /// Set the delay before an acknowledged alert resets.
    #[must_use]
    pub const fn with_ack_reset(mut self, delay: Duration) -> Self {
        self.ack_reset = delay;
        self
    }

    /// Set the delay before an unacknowledged alert resets.
    #[must_use]
    pub const fn with_unacked_reset(mut self, delay: Duration) -> Self {
        self.unacked_reset = delay;
        self
    }
}
