//! # help-server
//!
//! HTTP and WebSocket front end for the help button alert.
//!
//! Clients trigger the shared alert, admins acknowledge it, and every
//! authenticated WebSocket observer receives the alert state on each
//! transition and on a fixed heartbeat.
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/status` | GET | Current status and last trigger time |
//! | `/health` | GET | Liveness and uptime |
//! | `/login` | POST | Check the application token |
//! | `/alert` | POST | Trigger the alert |
//! | `/admin` | POST | Acknowledge the alert |
//! | `/subscribe` | POST | Register a Web Push subscription |
//! | `/push/public-key` | GET | VAPID key for browser subscriptions |
//! | `/ws` | GET | WebSocket status stream and commands |
//!
//! ## Example
//!
//! ```rust,no_run
//! use help_server::{HelpServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), help_server::ServerError> {
//!     let server = HelpServer::new(ServerConfig::default().with_app_token("change-me"))?;
//!     server
//!         .serve_with_shutdown(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod messages;
pub mod registry;
pub mod routes;
pub mod server;
pub mod state;
pub mod websocket;

pub use auth::AccessGateway;
pub use config::{ServerArgs, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use messages::{AlertCommand, ClientMessage, ReplyStatus, ServerMessage};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
pub use server::HelpServer;
pub use state::AppState;
