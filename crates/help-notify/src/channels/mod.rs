//! Notification channels for help request delivery.
//!
//! This module provides the [`NotificationChannel`] trait and its
//! implementations: a log channel, the Pushover relay and Web Push.

pub mod log;
pub mod pushover;
pub mod webpush;

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::notification::{Notification, NotificationResult};

pub use log::LogChannel;
pub use pushover::{PUSHOVER_API_URL, PushoverChannel, PushoverConfig};
pub use webpush::{VapidConfig, VapidSigner, WebPushChannel};

/// Trait for notification channels.
///
/// A channel fans a notification out to its own targets and reports one
/// [`NotificationResult`] per target. A failure on one target must not stop
/// delivery to the others.
#[async_trait]
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    /// Returns the name of this channel.
    fn name(&self) -> &str;

    /// Returns true if this channel is configured and should be used.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Sends a notification to every target of this channel.
    ///
    /// # Errors
    ///
    /// Returns an error only when the channel as a whole cannot run;
    /// per-target failures are reported in the returned results.
    async fn send(&self, notification: &Notification) -> Result<Vec<NotificationResult>>;
}
