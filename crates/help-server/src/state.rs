//! Shared state for the help server.

use std::sync::Arc;
use std::time::Instant;

use help_alert::AlertMachine;
use help_notify::{
    Dispatcher, LogChannel, PushoverChannel, SubscriptionStore, VapidSigner, WebPushChannel,
};
use tracing::{info, warn};

use crate::auth::AccessGateway;
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::registry::ConnectionRegistry;

/// Everything request handlers share.
#[derive(Debug)]
pub struct AppState {
    config: Arc<ServerConfig>,
    gateway: AccessGateway,
    machine: AlertMachine,
    registry: Arc<ConnectionRegistry>,
    subscriptions: Arc<SubscriptionStore>,
    push_public_key: Option<String>,
    start_time: Instant,
}

impl AppState {
    /// Wire up the alert machine, notification channels and stores.
    ///
    /// Loads the subscription list from the data directory and parses the
    /// VAPID key if one is configured.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let registry = Arc::new(ConnectionRegistry::new());
        let subscriptions = Arc::new(SubscriptionStore::open(&config.data_dir));

        let mut dispatcher = Dispatcher::new();
        dispatcher.add_channel(Arc::new(LogChannel::default()));

        if let Some(pushover) = &config.pushover {
            let channel = PushoverChannel::new(pushover.clone(), config.notify_timeout)?;
            dispatcher.add_channel(Arc::new(channel));
        }

        let signer = config.vapid.as_ref().map(VapidSigner::new).transpose()?;
        let push_public_key = signer.as_ref().map(|s| s.public_key().to_string());
        if signer.is_none() {
            warn!("VAPID keys not configured, web push disabled");
        }
        dispatcher.add_channel(Arc::new(WebPushChannel::new(
            signer,
            Arc::clone(&subscriptions),
            config.notify_timeout,
        )?));

        info!(
            channels = ?dispatcher.enabled_channels(),
            "notification dispatcher ready"
        );

        let machine = AlertMachine::new(
            config.timings,
            Arc::new(dispatcher),
            Arc::clone(&registry) as Arc<dyn help_alert::StatusBroadcaster>,
        );

        Ok(Self {
            gateway: AccessGateway::new(&config.app_token),
            config: Arc::new(config),
            machine,
            registry,
            subscriptions,
            push_public_key,
            start_time: Instant::now(),
        })
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The shared-secret gateway.
    #[must_use]
    pub fn gateway(&self) -> &AccessGateway {
        &self.gateway
    }

    /// The alert state machine.
    #[must_use]
    pub fn machine(&self) -> &AlertMachine {
        &self.machine
    }

    /// Connected observers.
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Registered Web Push subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> &Arc<SubscriptionStore> {
        &self.subscriptions
    }

    /// VAPID public key, when Web Push is configured.
    #[must_use]
    pub fn push_public_key(&self) -> Option<&str> {
        self.push_public_key.as_deref()
    }

    /// Get server uptime in seconds.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Stop alert timers and close every observer stream.
    pub fn shutdown(&self) {
        self.machine.shutdown();
        self.registry.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use help_notify::VapidConfig;

    #[tokio::test]
    async fn builds_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = AppState::new(ServerConfig::default().with_data_dir(dir.path())).unwrap();

        assert_eq!(state.registry().count(), 0);
        assert!(state.subscriptions().is_empty());
        assert!(state.push_public_key().is_none());
        assert!(state.gateway().authorize(crate::config::DEFAULT_APP_TOKEN));
    }

    #[tokio::test]
    async fn bad_vapid_key_fails_startup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ServerConfig::default()
            .with_data_dir(dir.path())
            .with_vapid(VapidConfig {
                public_key: "BPUB".to_string(),
                private_key_pem: "not a key".to_string(),
                subject: "mailto:a@b.c".to_string(),
            });

        assert!(AppState::new(config).is_err());
    }

    #[tokio::test]
    async fn shutdown_closes_machine_and_connections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = AppState::new(ServerConfig::default().with_data_dir(dir.path())).unwrap();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        state.registry().register(tx);

        state.shutdown();

        assert!(state.machine().is_closed());
        assert_eq!(state.registry().count(), 0);
    }
}
