//! Direct HTTP bridge endpoint.
//!
//! Endpoints:
//! - POST /message - Run one agent turn for an arbitrary caller
//! - GET  /health  - Liveness probe
//!
//! The gateway connector is the primary ingress; this surface exists for
//! local tooling and protocol adapters that speak plain HTTP.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use perch_types::transport::{BridgeRequest, BridgeResponse};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::classify;
use crate::state::AppState;

/// Build the bridge router with CORS and tracing middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/message", post(handle_message))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Run one turn for the caller. Blank text is rejected with a 400 before
/// touching the pipeline. Known upstream failures come back as a friendly
/// reply with status 200 so thin clients can show them verbatim; anything
/// unrecognized is a 502 with the error in the payload.
async fn handle_message(
    State(state): State<AppState>,
    Json(req): Json<BridgeRequest>,
) -> (StatusCode, Json<BridgeResponse>) {
    if req.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(BridgeResponse {
                text: String::new(),
                events: Vec::new(),
                error: Some("text is required".to_string()),
            }),
        );
    }

    let principal = req.principal_id();
    info!(principal, len = req.text.len(), "bridge message received");

    match state.turns.handle(principal, &req.text).await {
        Ok(result) => (
            StatusCode::OK,
            Json(BridgeResponse {
                text: result.text,
                events: result.events,
                error: None,
            }),
        ),
        Err(err) => {
            let msg = err.to_string();
            if let Some(friendly) = classify::friendly_error(&msg) {
                info!(principal, error = %msg, "turn failed, replying with friendly error");
                (
                    StatusCode::OK,
                    Json(BridgeResponse {
                        text: friendly,
                        events: Vec::new(),
                        error: None,
                    }),
                )
            } else {
                error!(principal, error = %msg, "turn failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(BridgeResponse {
                        text: String::new(),
                        events: Vec::new(),
                        error: Some(msg),
                    }),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use perch_infra::config::PerchConfig;

    use super::*;

    async fn state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let config = PerchConfig {
            upstream_url: "http://127.0.0.1:1".to_string(),
            app_name: "perch".to_string(),
            gateway_url: "http://127.0.0.1:1".to_string(),
            bot_name: "perch".to_string(),
            bridge_addr: "127.0.0.1:0".to_string(),
            heartbeat_interval: Duration::ZERO,
            data_dir: dir.path().to_path_buf(),
            context_window_tokens: 128_000,
            compaction_threshold_percent: 90,
            anthropic_api_key: None,
            anthropic_api_base: "http://127.0.0.1:1".to_string(),
            anthropic_model: "test".to_string(),
            telegram_token: None,
        };
        let state = AppState::init(config).await.unwrap();
        (dir, state)
    }

    #[tokio::test]
    async fn test_blank_text_rejected_before_pipeline() {
        let (_dir, state) = state().await;
        let req = BridgeRequest {
            user_id: "u-1".to_string(),
            username: String::new(),
            text: "   ".to_string(),
            protocol: String::new(),
        };

        let (status, Json(body)) = handle_message(State(state), Json(req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("text is required"));
        assert!(body.text.is_empty());
    }
}
