//! Pushover relay channel.
//!
//! Each configured user key receives its own form POST; the relay forwards
//! the message to that user's devices.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use tracing::debug;

use super::NotificationChannel;
use crate::error::Result;
use crate::notification::{Notification, NotificationResult};

/// Default Pushover message endpoint.
pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Configuration for the Pushover relay.
#[derive(Clone)]
pub struct PushoverConfig {
    /// Application token issued by Pushover.
    pub app_token: String,
    /// User or group keys to notify.
    pub targets: Vec<String>,
    /// Message endpoint, overridable for testing.
    pub api_url: String,
}

impl PushoverConfig {
    /// Creates a configuration against the public Pushover API.
    #[must_use]
    pub fn new(app_token: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            app_token: app_token.into(),
            targets,
            api_url: PUSHOVER_API_URL.to_string(),
        }
    }

    /// Sets the message endpoint.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

impl fmt::Debug for PushoverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushoverConfig")
            .field("app_token", &"[REDACTED]")
            .field("targets", &self.targets.len())
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Body returned by the Pushover API.
#[derive(Debug, Default, Deserialize)]
struct PushoverResponse {
    #[serde(default)]
    status: i32,
    #[serde(default)]
    errors: Vec<String>,
}

/// Sends help requests through Pushover.
#[derive(Debug, Clone)]
pub struct PushoverChannel {
    config: PushoverConfig,
    client: reqwest::Client,
}

impl PushoverChannel {
    /// Creates a channel whose requests give up after `timeout`.
    pub fn new(config: PushoverConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { config, client })
    }

    /// Number of configured user keys.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.config.targets.len()
    }

    async fn send_one(&self, user: &str, notification: &Notification) -> NotificationResult {
        let target = mask_key(user);
        let priority = notification.priority.to_string();
        let form = [
            ("token", self.config.app_token.as_str()),
            ("user", user),
            ("title", notification.title.as_str()),
            ("message", notification.message.as_str()),
            ("sound", notification.sound.as_str()),
            ("priority", priority.as_str()),
        ];

        let response = match self.client.post(&self.config.api_url).form(&form).send().await {
            Ok(response) => response,
            Err(e) => return NotificationResult::failure(self.name(), target, e.to_string()),
        };

        let status = response.status();
        let body: PushoverResponse = response.json().await.unwrap_or_default();
        debug!(recipient = %target, status = %status, "pushover response");

        if status.is_success() && body.status == 1 {
            NotificationResult::success(self.name(), target).with_status_code(status.as_u16())
        } else {
            let reason = if body.errors.is_empty() {
                format!("relay rejected message with {status}")
            } else {
                body.errors.join("; ")
            };
            NotificationResult::failure(self.name(), target, reason)
                .with_status_code(status.as_u16())
        }
    }
}

#[async_trait]
impl NotificationChannel for PushoverChannel {
    fn name(&self) -> &str {
        "pushover"
    }

    fn is_enabled(&self) -> bool {
        !self.config.app_token.is_empty() && !self.config.targets.is_empty()
    }

    async fn send(&self, notification: &Notification) -> Result<Vec<NotificationResult>> {
        let sends = self
            .config
            .targets
            .iter()
            .map(|user| self.send_one(user, notification));

        Ok(join_all(sends).await)
    }
}

/// Shortens a user key to a log-safe label.
fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}…")
}
