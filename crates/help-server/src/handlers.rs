//! HTTP request handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::{DateTime, Utc};
use help_alert::AlertStatus;
use help_notify::Subscription;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Body of `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// The application token, entered as a password.
    #[serde(default)]
    pub password: String,
}

/// Body of `POST /alert`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRequest {
    /// The application token.
    #[serde(default)]
    pub app_token: String,
}

/// Body of `POST /admin`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequest {
    /// The application token.
    #[serde(default)]
    pub app_token: String,
    /// Only `acknowledge` is understood.
    #[serde(default)]
    pub command: String,
}

/// Body of `POST /subscribe`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    /// The application token.
    #[serde(default)]
    pub app_token: String,
    /// Browser push subscription.
    #[serde(default)]
    pub subscription: Subscription,
}

/// Outcome of a mutating request.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    /// `success`, `triggered`, `acknowledged` or `ignored`.
    pub status: &'static str,
    /// Human-readable outcome.
    pub message: &'static str,
}

impl ActionResponse {
    const fn new(status: &'static str, message: &'static str) -> Json<Self> {
        Json(Self { status, message })
    }
}

/// Response of `GET /status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Current alert status.
    pub status: AlertStatus,
    /// When the alert was last triggered.
    pub last_trigger: Option<DateTime<Utc>>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status message.
    pub status: &'static str,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
}

/// Response of `GET /push/public-key`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    /// VAPID public key for `PushManager.subscribe()`.
    pub public_key: String,
}

/// Handle GET /health.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
    })
}

/// Handle GET /status.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.machine().snapshot();
    Json(StatusResponse {
        status: snapshot.status,
        last_trigger: snapshot.last_trigger,
    })
}

/// Handle POST /login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ServerResult<Json<ActionResponse>> {
    let Json(body) = payload?;
    state.gateway().require(&body.password)?;

    Ok(ActionResponse::new("success", "Success"))
}

/// Handle POST /alert.
pub async fn trigger_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AlertRequest>, JsonRejection>,
) -> ServerResult<Json<ActionResponse>> {
    let Json(body) = payload?;
    state.gateway().require(&body.app_token)?;

    info!("alert requested over http");
    if state.machine().trigger().is_applied() {
        Ok(ActionResponse::new("triggered", "Alert has been triggered!"))
    } else {
        Ok(ActionResponse::new("ignored", "Alert already triggered."))
    }
}

/// Handle POST /admin.
pub async fn admin_command(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AdminRequest>, JsonRejection>,
) -> ServerResult<Json<ActionResponse>> {
    let Json(body) = payload?;
    state.gateway().require(&body.app_token)?;

    if body.command != "acknowledge" {
        return Err(ServerError::InvalidCommand);
    }

    info!("acknowledgement requested over http");
    if state.machine().acknowledge().is_applied() {
        Ok(ActionResponse::new("acknowledged", "Alert has been acknowledged."))
    } else {
        Ok(ActionResponse::new(
            "ignored",
            "No alerts ready for acknowledgement.",
        ))
    }
}

/// Handle POST /subscribe.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> ServerResult<Json<ActionResponse>> {
    let Json(body) = payload?;
    state.gateway().require(&body.app_token)?;

    // the store writes to disk under its lock
    let store = Arc::clone(state.subscriptions());
    let added = tokio::task::spawn_blocking(move || store.add(body.subscription))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    if added {
        Ok(ActionResponse::new("success", "Subscription saved."))
    } else {
        Ok(ActionResponse::new("success", "Subscription already registered."))
    }
}

/// Handle GET /push/public-key.
pub async fn push_public_key(
    State(state): State<Arc<AppState>>,
) -> ServerResult<Json<PublicKeyResponse>> {
    state
        .push_public_key()
        .map(|key| {
            Json(PublicKeyResponse {
                public_key: key.to_string(),
            })
        })
        .ok_or_else(|| ServerError::NotFound("push public key".to_string()))
}
