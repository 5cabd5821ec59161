//! Route configuration for the help server.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{
    admin_command, get_status, health_check, login, push_public_key, subscribe, trigger_alert,
};
use crate::state::AppState;
use crate::websocket::ws_upgrade;

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(state.config());

    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/login", post(login))
        .route("/alert", post(trigger_alert))
        .route("/admin", post(admin_command))
        .route("/subscribe", post(subscribe))
        .route("/push/public-key", get(push_public_key))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn make_test_state(dir: &std::path::Path) -> Arc<AppState> {
        let config = ServerConfig::default()
            .with_data_dir(dir)
            .with_app_token("secret");
        Arc::new(AppState::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_cors_any_origin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = create_router(make_test_state(dir.path()));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/alert")
            .header("Origin", "http://example.com")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn test_cors_specific_origin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ServerConfig::default()
            .with_data_dir(dir.path())
            .with_cors_origin("http://localhost:3000");
        let app = create_router(Arc::new(AppState::new(config).unwrap()));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/status")
            .header("Origin", "http://localhost:3000")
            .header("Access-Control-Request-Method", "GET")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_unknown_endpoint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = create_router(make_test_state(dir.path()));

        let request = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = create_router(make_test_state(dir.path()));

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }
}
