//! Durable store of Web Push subscriptions.
//!
//! Backed by [`help_persist::JsonStore`]. Adds validate first, then append
//! and save under one lock, so concurrent adds never lose each other's
//! writes. A failed save is logged and the in-memory list keeps the new
//! entry for the rest of the process.

use std::path::Path;

use help_persist::JsonStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{NotifyError, Result};

/// Authentication material a browser hands out with a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Client public key (base64url P-256 point).
    #[serde(default)]
    pub p256dh: String,
    /// Client auth secret (base64url).
    #[serde(default)]
    pub auth: String,
}

/// A browser push subscription as produced by `PushManager.subscribe()`.
///
/// Fields default when absent so a malformed payload surfaces as a
/// validation error naming the missing field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Push service URL for this browser.
    #[serde(default)]
    pub endpoint: String,
    /// When the push service will expire the subscription (ms since epoch).
    #[serde(default)]
    pub expiration_time: Option<f64>,
    /// Encryption and authentication keys.
    #[serde(default)]
    pub keys: Option<SubscriptionKeys>,
}

impl Subscription {
    /// Check that every required field is present.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(NotifyError::InvalidSubscription { field: "endpoint" });
        }

        let keys = self
            .keys
            .as_ref()
            .ok_or(NotifyError::InvalidSubscription { field: "keys" })?;

        if keys.p256dh.is_empty() {
            return Err(NotifyError::InvalidSubscription { field: "keys.p256dh" });
        }
        if keys.auth.is_empty() {
            return Err(NotifyError::InvalidSubscription { field: "keys.auth" });
        }

        Ok(())
    }
}

/// Append-only list of subscriptions persisted as JSON.
#[derive(Debug)]
pub struct SubscriptionStore {
    subscriptions: Mutex<Vec<Subscription>>,
    store: JsonStore,
}

impl SubscriptionStore {
    /// Open the store in `state_dir`, loading whatever is on disk.
    ///
    /// A missing or corrupt file starts an empty list.
    pub fn open(state_dir: &Path) -> Self {
        let store = JsonStore::new(state_dir, "subscriptions");
        let subscriptions: Vec<Subscription> = store.load();
        info!(
            count = subscriptions.len(),
            path = %store.path().display(),
            "loaded push subscriptions"
        );
        Self {
            subscriptions: Mutex::new(subscriptions),
            store,
        }
    }

    /// Validate and append a subscription.
    ///
    /// Returns `Ok(false)` when the endpoint is already registered.
    pub fn add(&self, subscription: Subscription) -> Result<bool> {
        subscription.validate()?;

        let mut subscriptions = self.subscriptions.lock();
        if subscriptions
            .iter()
            .any(|s| s.endpoint == subscription.endpoint)
        {
            debug!("push subscription already registered");
            return Ok(false);
        }

        subscriptions.push(subscription);
        if let Err(e) = self.store.save(&*subscriptions) {
            warn!(error = %e, "failed to persist push subscriptions, keeping in memory");
        }

        info!(count = subscriptions.len(), "registered push subscription");
        Ok(true)
    }

    /// Every registered subscription, in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<Subscription> {
        self.subscriptions.lock().clone()
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.lock().is_empty()
    }
}
