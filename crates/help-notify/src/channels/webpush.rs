//! Web Push channel.
//!
//! Sends a payload-less push message to every stored subscription. The
//! service worker on the receiving browser shows the help notification
//! itself, so no message encryption is needed; each request only carries a
//! VAPID token proving it came from this server.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::NotificationChannel;
use crate::error::{NotifyError, Result};
use crate::notification::{Notification, NotificationResult};
use crate::subscriptions::{Subscription, SubscriptionStore};

/// Lifetime of a VAPID token; push services reject anything over 24h.
const VAPID_TOKEN_TTL_SECS: i64 = 12 * 60 * 60;

/// How long the push service should hold an undelivered message.
const PUSH_TTL_SECS: u32 = 60;

/// VAPID application server keys.
#[derive(Clone)]
pub struct VapidConfig {
    /// Uncompressed P-256 public key, base64url without padding.
    pub public_key: String,
    /// Matching private key as a PKCS#8 PEM document.
    pub private_key_pem: String,
    /// Contact URI (`mailto:` or `https:`) sent to push services.
    pub subject: String,
}

impl fmt::Debug for VapidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidConfig")
            .field("public_key", &self.public_key)
            .field("private_key_pem", &"[REDACTED]")
            .field("subject", &self.subject)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct VapidClaims<'a> {
    aud: &'a str,
    exp: i64,
    sub: &'a str,
}

/// Signs VAPID `Authorization` headers.
#[derive(Clone)]
pub struct VapidSigner {
    public_key: String,
    subject: String,
    key: EncodingKey,
}

impl VapidSigner {
    /// Parse the private key and build a signer.
    pub fn new(config: &VapidConfig) -> Result<Self> {
        if config.public_key.is_empty() {
            return Err(NotifyError::NotConfigured(
                "vapid public key is empty".to_string(),
            ));
        }

        let key = EncodingKey::from_ec_pem(config.private_key_pem.as_bytes())?;
        Ok(Self {
            public_key: config.public_key.clone(),
            subject: config.subject.clone(),
            key,
        })
    }

    /// The public key browsers subscribe with.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Build the `Authorization` header value for a push endpoint.
    pub fn authorization(&self, endpoint: &str) -> Result<String> {
        let url = Url::parse(endpoint).map_err(|e| NotifyError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let audience = url.origin().ascii_serialization();

        let claims = VapidClaims {
            aud: &audience,
            exp: Utc::now().timestamp() + VAPID_TOKEN_TTL_SECS,
            sub: &self.subject,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::ES256), &claims, &self.key)?;

        Ok(format!("vapid t={token}, k={}", self.public_key))
    }
}

impl fmt::Debug for VapidSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidSigner")
            .field("public_key", &self.public_key)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Pushes help requests to every registered browser.
#[derive(Debug, Clone)]
pub struct WebPushChannel {
    signer: Option<VapidSigner>,
    subscriptions: Arc<SubscriptionStore>,
    client: reqwest::Client,
}

impl WebPushChannel {
    /// Creates a channel over `subscriptions`.
    ///
    /// Without a signer the channel stays disabled.
    pub fn new(
        signer: Option<VapidSigner>,
        subscriptions: Arc<SubscriptionStore>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            signer,
            subscriptions,
            client,
        })
    }

    async fn send_one(&self, signer: &VapidSigner, subscription: &Subscription) -> NotificationResult {
        let target = endpoint_label(&subscription.endpoint);

        let authorization = match signer.authorization(&subscription.endpoint) {
            Ok(value) => value,
            Err(e) => return NotificationResult::failure(self.name(), target, e.to_string()),
        };

        let request = self
            .client
            .post(&subscription.endpoint)
            .header("Authorization", authorization)
            .header("TTL", PUSH_TTL_SECS.to_string())
            .header("Urgency", "high")
            .body(Vec::<u8>::new());

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return NotificationResult::failure(self.name(), target, e.to_string()),
        };

        let status = response.status();
        debug!(endpoint = %target, status = %status, "push service response");

        match status {
            s if s.is_success() => {
                NotificationResult::success(self.name(), target).with_status_code(s.as_u16())
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                warn!(endpoint = %target, "push subscription has expired");
                NotificationResult::failure(self.name(), target, "subscription expired")
                    .with_status_code(status.as_u16())
            }
            s => NotificationResult::failure(
                self.name(),
                target,
                format!("push service rejected message with {s}"),
            )
            .with_status_code(s.as_u16()),
        }
    }
}

#[async_trait]
impl NotificationChannel for WebPushChannel {
    fn name(&self) -> &str {
        "web-push"
    }

    fn is_enabled(&self) -> bool {
        self.signer.is_some()
    }

    async fn send(&self, notification: &Notification) -> Result<Vec<NotificationResult>> {
        let Some(signer) = &self.signer else {
            return Err(NotifyError::NotConfigured("vapid keys not set".to_string()));
        };

        let subscriptions = self.subscriptions.all();
        debug!(
            title = %notification.title,
            subscriptions = subscriptions.len(),
            "sending web push"
        );

        let sends = subscriptions.iter().map(|s| self.send_one(signer, s));
        Ok(join_all(sends).await)
    }
}

/// Host of a push endpoint; the path identifies the browser and stays out of logs.
fn endpoint_label(endpoint: &str) -> String {
    Url::parse(endpoint)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "invalid-endpoint".to_string())
}
