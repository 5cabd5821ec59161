//! Fans a help request out to every enabled channel.

use std::sync::Arc;

use futures::future::join_all;
use help_alert::{AlertSnapshot, Notifier};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::channels::NotificationChannel;
use crate::notification::{Notification, NotificationResult};

/// Central notification dispatcher.
///
/// Channels run concurrently and independently; one slow or failing channel
/// never delays or cancels another.
#[derive(Debug, Default, Clone)]
pub struct Dispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no channels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher over the given channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// Adds a channel.
    pub fn add_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        info!(
            channel = channel.name(),
            enabled = channel.is_enabled(),
            "registered notification channel"
        );
        self.channels.push(channel);
    }

    /// Number of registered channels, enabled or not.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Names of the channels that will actually send.
    #[must_use]
    pub fn enabled_channels(&self) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Sends `notification` on every enabled channel without waiting.
    ///
    /// One task is spawned per channel and outcomes are only logged. Outside
    /// a Tokio runtime nothing is sent.
    pub fn dispatch_all(&self, notification: Notification) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("no async runtime, dropping help notification");
            return;
        };

        let notification = Arc::new(notification);
        for channel in self.channels.iter().filter(|c| c.is_enabled()) {
            let channel = Arc::clone(channel);
            let notification = Arc::clone(&notification);

            runtime.spawn(async move {
                let results = send_channel(channel.as_ref(), &notification).await;
                log_results(channel.name(), &results);
            });
        }
    }

    /// Sends `notification` on every enabled channel and waits for all of them.
    pub async fn dispatch_and_wait(&self, notification: &Notification) -> Vec<NotificationResult> {
        let sends = self
            .channels
            .iter()
            .filter(|c| c.is_enabled())
            .map(|channel| async move {
                let results = send_channel(channel.as_ref(), notification).await;
                log_results(channel.name(), &results);
                results
            });

        join_all(sends).await.into_iter().flatten().collect()
    }
}

impl Notifier for Dispatcher {
    fn dispatch(&self, snapshot: &AlertSnapshot) {
        self.dispatch_all(Notification::help_requested(snapshot));
    }
}

async fn send_channel(
    channel: &dyn NotificationChannel,
    notification: &Notification,
) -> Vec<NotificationResult> {
    match channel.send(notification).await {
        Ok(results) => results,
        Err(e) => {
            error!(channel = channel.name(), error = %e, "notification channel failed");
            vec![NotificationResult::failure(channel.name(), "*", e.to_string())]
        }
    }
}

fn log_results(channel: &str, results: &[NotificationResult]) {
    for result in results {
        if result.success {
            debug!(channel, recipient = %result.target, "notification delivered");
        } else {
            warn!(
                channel,
                recipient = %result.target,
                status_code = ?result.status_code,
                reason = result.message.as_deref().unwrap_or("unknown"),
                "notification failed"
            );
        }
    }

    let delivered = results.iter().filter(|r| r.success).count();
    info!(channel, delivered, total = results.len(), "notification burst finished");
}
