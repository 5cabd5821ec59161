//! Help server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::routes::create_router;
use crate::state::AppState;

/// HTTP and WebSocket server around the shared alert.
#[derive(Debug, Clone)]
pub struct HelpServer {
    state: Arc<AppState>,
}

impl HelpServer {
    /// Create a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a notification channel cannot be built.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Ok(Self {
            state: Arc::new(AppState::new(config)?),
        })
    }

    /// Get the shared state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Create the router without starting the server.
    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }

    /// Bind the configured address and serve until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config().bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;

        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    ///
    /// When `shutdown` resolves, alert timers are cancelled, the status
    /// ticker stops and every observer stream is closed before axum drains
    /// the remaining requests.
    pub async fn serve_listener<F>(&self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!(addr = %addr, "Help server listening");

        let ticker = spawn_status_ticker(self.state.clone());
        let ticker_abort = ticker.abort_handle();
        let state = self.state.clone();

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("shutting down");
                state.shutdown();
                ticker_abort.abort();
            })
            .await;

        ticker.abort();
        self.state.shutdown();
        result.map_err(|e| ServerError::Internal(e.to_string()))?;

        info!("Help server shut down");
        Ok(())
    }

    /// Address the server is configured to bind.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.state.config().bind_addr
    }
}

/// Broadcast the current snapshot to every observer on a fixed interval.
///
/// Keeps observers in sync even if they missed a transition broadcast.
pub fn spawn_status_ticker(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config().status_interval;

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            state.machine().broadcast_current();
        }
    })
}
