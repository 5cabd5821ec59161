//! The help request notification and per-target delivery results.

use chrono::{DateTime, Utc};
use help_alert::AlertSnapshot;
use serde::{Deserialize, Serialize};

/// Title sent with every help request.
pub const HELP_TITLE: &str = "Help Needed!";

/// Body sent with every help request.
pub const HELP_MESSAGE: &str = "The help button has been pressed.";

/// A notification to be sent through a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Short title.
    pub title: String,
    /// Message body.
    pub message: String,
    /// Sound name understood by relay services.
    pub sound: String,
    /// Relay priority (1 is high, bypassing quiet hours).
    pub priority: i8,
    /// When the alert was raised.
    pub triggered_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// The fixed "help requested" notification for an alert state.
    #[must_use]
    pub fn help_requested(snapshot: &AlertSnapshot) -> Self {
        Self {
            title: HELP_TITLE.to_string(),
            message: HELP_MESSAGE.to_string(),
            sound: "gamelan".to_string(),
            priority: 1,
            triggered_at: snapshot.last_trigger,
        }
    }
}

/// Result of sending a notification to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResult {
    /// Whether the notification was delivered.
    pub success: bool,
    /// The channel that processed this notification.
    pub channel: String,
    /// Display label for the target (never a secret).
    pub target: String,
    /// Optional message or error description.
    pub message: Option<String>,
    /// Response status code (if applicable).
    pub status_code: Option<u16>,
}

impl NotificationResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(channel: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            target: target.into(),
            message: None,
            status_code: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(
        channel: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            channel: channel.into(),
            target: target.into(),
            message: Some(message.into()),
            status_code: None,
        }
    }

    /// Sets the status code.
    #[must_use]
    pub const fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use help_alert::AlertStatus;

    #[test]
    fn help_requested_carries_trigger_time() {
        let now = Utc::now();
        let snapshot = AlertSnapshot {
            status: AlertStatus::Triggered,
            last_trigger: Some(now),
            connections: 2,
        };

        let notification = Notification::help_requested(&snapshot);

        assert_eq!(notification.title, HELP_TITLE);
        assert_eq!(notification.message, HELP_MESSAGE);
        assert_eq!(notification.priority, 1);
        assert_eq!(notification.triggered_at, Some(now));
    }

    #[test]
    fn result_success() {
        let result = NotificationResult::success("pushover", "uQiR…");

        assert!(result.success);
        assert_eq!(result.channel, "pushover");
        assert!(result.message.is_none());
    }

    #[test]
    fn result_failure_with_code() {
        let result =
            NotificationResult::failure("web-push", "push.example.com", "gone").with_status_code(410);

        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("gone"));
        assert_eq!(result.status_code, Some(410));
    }
}
