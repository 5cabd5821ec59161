//! A channel that writes help requests to the log.

use async_trait::async_trait;
use tracing::warn;

use super::NotificationChannel;
use crate::error::Result;
use crate::notification::{Notification, NotificationResult};

/// Logs every help request at `warn` so it shows up on the console.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
    enabled: bool,
}

impl LogChannel {
    /// Creates a new log channel.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    /// Sets whether the channel is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new("log")
    }
}

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, notification: &Notification) -> Result<Vec<NotificationResult>> {
        warn!(
            title = %notification.title,
            triggered_at = ?notification.triggered_at,
            "HELP REQUESTED: {}",
            notification.message
        );

        Ok(vec![
            NotificationResult::success(self.name(), "console").with_message("logged to tracing"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use help_alert::{AlertSnapshot, AlertStatus};

    fn notification() -> Notification {
        Notification::help_requested(&AlertSnapshot {
            status: AlertStatus::Triggered,
            last_trigger: None,
            connections: 0,
        })
    }

    #[tokio::test]
    async fn log_channel_reports_one_success() {
        let channel = LogChannel::default();

        let results = channel.send(&notification()).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(results[0].channel, "log");
    }

    #[test]
    fn log_channel_can_be_disabled() {
        let channel = LogChannel::new("console").enabled(false);

        assert_eq!(channel.name(), "console");
        assert!(!channel.is_enabled());
    }
}
