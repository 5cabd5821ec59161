//! Help request notifications.
//!
//! Delivers the "help requested" notification through every configured
//! channel and keeps the list of browsers that asked for Web Push.
//!
//! - [`NotificationChannel`] is the seam every provider implements
//! - [`PushoverChannel`] relays to Pushover user keys
//! - [`WebPushChannel`] sends VAPID-signed pushes to [`SubscriptionStore`] entries
//! - [`Dispatcher`] fans out to all enabled channels and implements
//!   [`help_alert::Notifier`]
//!
//! Delivery is best effort: failures are logged per target and never reach
//! the caller that raised the alert.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod notification;
pub mod subscriptions;

pub use channels::{
    LogChannel, NotificationChannel, PUSHOVER_API_URL, PushoverChannel, PushoverConfig,
    VapidConfig, VapidSigner, WebPushChannel,
};
pub use dispatcher::Dispatcher;
pub use error::{NotifyError, Result};
pub use notification::{HELP_MESSAGE, HELP_TITLE, Notification, NotificationResult};
pub use subscriptions::{Subscription, SubscriptionKeys, SubscriptionStore};
