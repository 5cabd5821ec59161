//! Server configuration.
//!
//! [`ServerArgs`] is the command line / environment surface; it resolves into
//! a [`ServerConfig`], which is also buildable directly for tests.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use help_alert::AlertTimings;
use help_notify::{PushoverConfig, VapidConfig};

use crate::error::{ServerError, ServerResult};

/// Token used when none is configured. Never suitable for production.
pub const DEFAULT_APP_TOKEN: &str = "top_secret_alert_token";

/// Default VAPID contact.
pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:admin@localhost";

/// Configuration for the help server.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Shared application token.
    pub app_token: String,
    /// Alert timer durations.
    pub timings: AlertTimings,
    /// Interval of the periodic status broadcast.
    pub status_interval: Duration,
    /// How long a new WebSocket may stay unauthenticated.
    pub ws_auth_timeout: Duration,
    /// Per-request timeout for notification providers.
    pub notify_timeout: Duration,
    /// Outbound queue depth per observer.
    pub ws_queue_capacity: usize,
    /// Directory for persisted state.
    pub data_dir: PathBuf,
    /// CORS allowed origins (empty means all).
    pub cors_origins: Vec<String>,
    /// Pushover relay settings.
    pub pushover: Option<PushoverConfig>,
    /// Web Push keys.
    pub vapid: Option<VapidConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 4000)),
            app_token: DEFAULT_APP_TOKEN.to_string(),
            timings: AlertTimings::default(),
            status_interval: Duration::from_secs(1),
            ws_auth_timeout: Duration::from_secs(20),
            notify_timeout: Duration::from_secs(10),
            ws_queue_capacity: 64,
            data_dir: PathBuf::from("./data"),
            cors_origins: Vec::new(),
            pushover: None,
            vapid: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("app_token", &"[REDACTED]")
            .field("timings", &self.timings)
            .field("status_interval", &self.status_interval)
            .field("ws_auth_timeout", &self.ws_auth_timeout)
            .field("notify_timeout", &self.notify_timeout)
            .field("ws_queue_capacity", &self.ws_queue_capacity)
            .field("data_dir", &self.data_dir)
            .field("cors_origins", &self.cors_origins)
            .field("pushover", &self.pushover)
            .field("vapid", &self.vapid)
            .finish()
    }
}

impl ServerConfig {
    /// Create a new configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the application token.
    #[must_use]
    pub fn with_app_token(mut self, token: impl Into<String>) -> Self {
        self.app_token = token.into();
        self
    }

    /// Set the alert timer durations.
    #[must_use]
    pub const fn with_timings(mut self, timings: AlertTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Set the status broadcast interval.
    #[must_use]
    pub const fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    /// Set the WebSocket authentication window.
    #[must_use]
    pub const fn with_ws_auth_timeout(mut self, timeout: Duration) -> Self {
        self.ws_auth_timeout = timeout;
        self
    }

    /// Set the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Add a CORS allowed origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origins.push(origin.into());
        self
    }

    /// Enable the Pushover relay.
    #[must_use]
    pub fn with_pushover(mut self, pushover: PushoverConfig) -> Self {
        self.pushover = Some(pushover);
        self
    }

    /// Enable Web Push.
    #[must_use]
    pub fn with_vapid(mut self, vapid: VapidConfig) -> Self {
        self.vapid = Some(vapid);
        self
    }

    /// Returns true if the built-in token is in use.
    #[must_use]
    pub fn uses_default_token(&self) -> bool {
        self.app_token == DEFAULT_APP_TOKEN
    }
}

/// Help button alert server.
#[derive(Debug, Parser)]
#[command(name = "help-server", version, about)]
pub struct ServerArgs {
    /// Interface to listen on.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// Shared application token.
    #[arg(long, env = "ALERT_APP_TOKEN", default_value = DEFAULT_APP_TOKEN, hide_env_values = true)]
    pub app_token: String,

    /// Pushover application token.
    #[arg(long, env = "PO_APP_TOKEN", default_value = "", hide_env_values = true)]
    pub pushover_token: String,

    /// Pushover user keys, comma separated.
    #[arg(long, env = "PO_TARGETS", value_delimiter = ',')]
    pub pushover_targets: Vec<String>,

    /// VAPID public key (base64url).
    #[arg(long, env = "VAPID_PUBLIC_KEY")]
    pub vapid_public_key: Option<String>,

    /// Path to the VAPID private key (PKCS#8 PEM).
    #[arg(long, env = "VAPID_PRIVATE_KEY")]
    pub vapid_private_key: Option<PathBuf>,

    /// VAPID contact URI.
    #[arg(long, env = "VAPID_SUBJECT", default_value = DEFAULT_VAPID_SUBJECT)]
    pub vapid_subject: String,

    /// Directory for persisted state.
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Allowed CORS origins, comma separated (empty allows any).
    #[arg(long = "cors-origin", env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Seconds between repeat notifications while triggered.
    #[arg(long, env = "REPEAT_NOTIFY_SECS", default_value_t = 10)]
    pub repeat_notify_secs: u64,

    /// Seconds before an acknowledged alert resets.
    #[arg(long, env = "ACK_RESET_SECS", default_value_t = 120)]
    pub ack_reset_secs: u64,

    /// Seconds before an unacknowledged alert resets.
    #[arg(long, env = "UNACKED_RESET_SECS", default_value_t = 3600)]
    pub unacked_reset_secs: u64,

    /// Milliseconds between status broadcasts.
    #[arg(long, env = "STATUS_INTERVAL_MS", default_value_t = 1000)]
    pub status_interval_ms: u64,

    /// Seconds a WebSocket may stay unauthenticated.
    #[arg(long, env = "WS_AUTH_TIMEOUT_SECS", default_value_t = 20)]
    pub ws_auth_timeout_secs: u64,

    /// Timeout for each notification request, in seconds.
    #[arg(long, env = "NOTIFY_TIMEOUT_SECS", default_value_t = 10)]
    pub notify_timeout_secs: u64,

    /// Emit logs as JSON.
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl ServerArgs {
    /// Resolve into a [`ServerConfig`], reading key files.
    pub fn into_config(self) -> ServerResult<ServerConfig> {
        if self.repeat_notify_secs == 0 || self.status_interval_ms == 0 {
            return Err(ServerError::Config(
                "repeat and status intervals must be positive".to_string(),
            ));
        }

        let targets: Vec<String> = self
            .pushover_targets
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let pushover = (!self.pushover_token.is_empty() || !targets.is_empty())
            .then(|| PushoverConfig::new(self.pushover_token, targets));

        let vapid = match (self.vapid_public_key, self.vapid_private_key) {
            (Some(public_key), Some(path)) => {
                let private_key_pem = std::fs::read_to_string(&path).map_err(|e| {
                    ServerError::Config(format!(
                        "failed to read vapid private key {}: {e}",
                        path.display()
                    ))
                })?;
                Some(VapidConfig {
                    public_key,
                    private_key_pem,
                    subject: self.vapid_subject,
                })
            }
            (None, None) => None,
            _ => {
                return Err(ServerError::Config(
                    "VAPID_PUBLIC_KEY and VAPID_PRIVATE_KEY must be set together".to_string(),
                ));
            }
        };

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
            app_token: self.app_token,
            timings: AlertTimings::default()
                .with_repeat_notify(Duration::from_secs(self.repeat_notify_secs))
                .with_ack_reset(Duration::from_secs(self.ack_reset_secs))
                .with_unacked_reset(Duration::from_secs(self.unacked_reset_secs)),
            status_interval: Duration::from_millis(self.status_interval_ms),
            ws_auth_timeout: Duration::from_secs(self.ws_auth_timeout_secs),
            notify_timeout: Duration::from_secs(self.notify_timeout_secs),
            data_dir: self.data_dir,
            cors_origins: self
                .cors_origins
                .into_iter()
                .filter(|o| !o.trim().is_empty())
                .collect(),
            pushover,
            vapid,
            ..ServerConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerArgs {
        let mut argv = vec!["help-server"];
        argv.extend_from_slice(args);
        ServerArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 4000);
        assert!(config.uses_default_token());
        assert_eq!(config.timings.repeat_notify, Duration::from_secs(10));
        assert_eq!(config.status_interval, Duration::from_secs(1));
        assert_eq!(config.ws_auth_timeout, Duration::from_secs(20));
        assert!(config.pushover.is_none());
        assert!(config.vapid.is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let config = ServerConfig::default().with_app_token("hunter2-secret");

        let debug = format!("{config:?}");

        assert!(!debug.contains("hunter2-secret"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("bind_addr"));
    }

    #[test]
    fn test_config_builder() {
        let config = ServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)))
            .with_app_token("secret")
            .with_status_interval(Duration::from_millis(50))
            .with_ws_auth_timeout(Duration::from_millis(200))
            .with_cors_origin("http://localhost:3000")
            .with_pushover(PushoverConfig::new("t", vec!["u".into()]));

        assert!(!config.uses_default_token());
        assert_eq!(config.status_interval, Duration::from_millis(50));
        assert_eq!(config.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert!(config.pushover.is_some());
    }

    #[test]
    fn args_flags_resolve() {
        let config = parse(&[
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--app-token",
            "secret",
            "--pushover-token",
            "po",
            "--pushover-targets",
            "u1, u2,,",
            "--ack-reset-secs",
            "5",
            "--cors-origin",
            "http://a.test,http://b.test",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(config.app_token, "secret");
        assert_eq!(config.timings.ack_reset, Duration::from_secs(5));
        assert_eq!(config.cors_origins.len(), 2);
        let pushover = config.pushover.unwrap();
        assert_eq!(pushover.targets, vec!["u1".to_string(), "u2".to_string()]);
    }

    #[test]
    fn vapid_key_file_is_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key_path = dir.path().join("vapid.pem");
        std::fs::write(&key_path, "PEM DATA").expect("write");

        let config = parse(&[
            "--vapid-public-key",
            "BPUB",
            "--vapid-private-key",
            key_path.to_str().unwrap(),
        ])
        .into_config()
        .unwrap();

        let vapid = config.vapid.unwrap();
        assert_eq!(vapid.public_key, "BPUB");
        assert_eq!(vapid.private_key_pem, "PEM DATA");
        assert_eq!(vapid.subject, DEFAULT_VAPID_SUBJECT);
    }

    #[test]
    fn vapid_half_configured_is_rejected() {
        let result = parse(&["--vapid-public-key", "BPUB"]).into_config();

        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = parse(&["--status-interval-ms", "0"]).into_config();

        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
