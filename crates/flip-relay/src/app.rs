//! Toggle endpoint and router
//!
//! The relay accepts flag changes as `POST /api/toggle` and forwards
//! them to the trigger endpoint configured for that flag. It holds no
//! state of its own; every request is validated, forwarded, and
//! answered in one pass.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use flip_core::config::Trigger;

/// Timeout for calls to trigger endpoints, in seconds
const UPSTREAM_TIMEOUT: u64 = 10;

/// Shared state for the toggle endpoint
#[derive(Clone)]
pub struct AppState {
    client: reqwest::Client,
    triggers: HashMap<String, Trigger>,
}

impl AppState {
    pub fn new(triggers: HashMap<String, Trigger>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPSTREAM_TIMEOUT))
            .user_agent(concat!("flip-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, triggers })
    }
}

/// Build the relay router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/toggle", post(toggle_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Validate a toggle request and forward it to the flag's trigger
///
/// Expects JSON of shape `{ "flag": string, "isAvailable": boolean }`.
async fn toggle_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let flag = body.get("flag").and_then(Value::as_str).unwrap_or_default();
    let is_available = body.get("isAvailable").and_then(Value::as_bool);

    // Validate request body
    let Some(is_available) = is_available.filter(|_| !flag.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "Missing or invalid flag or status",
            })),
        );
    };

    // Lookup the relevant endpoint config
    let Some(trigger) = state.triggers.get(flag) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": format!("Unknown flag: {}", flag),
            })),
        );
    };

    // Choose the on or off URL and forward the change
    let url = trigger.url_for(is_available);
    let forwarded = state
        .client
        .post(url)
        .json(&json!({ "flag": flag, "isAvailable": is_available }))
        .send()
        .await;

    match forwarded {
        Ok(response) if response.status().is_success() => {
            info!(flag = %flag, is_available, "flag change forwarded");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": format!(
                        "Flag \"{}\" is now {}",
                        flag,
                        if is_available { "available" } else { "unavailable" }
                    ),
                })),
            )
        }
        Ok(response) => {
            let status = response.status();
            let message = match status.canonical_reason() {
                Some(reason) => format!("Upstream error: {} {}", status.as_u16(), reason),
                None => format!("Upstream error: {}", status.as_u16()),
            };
            error!("Error toggling flag: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": message })),
            )
        }
        Err(e) => {
            error!("Error toggling flag: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    /// Upstream double that answers with a fixed status and records the
    /// last body it received
    async fn spawn_upstream(status: StatusCode) -> (String, Arc<Mutex<Option<Value>>>) {
        let seen = Arc::new(Mutex::new(None));
        let record = seen.clone();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new().route(
            "/trigger",
            post(move |Json(body): Json<Value>| async move {
                record.lock().unwrap().replace(body);
                status
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/trigger", addr), seen)
    }

    fn state_with(flag: &str, url: &str) -> AppState {
        let mut triggers = HashMap::new();
        triggers.insert(
            flag.to_string(),
            Trigger {
                on: url.to_string(),
                off: url.to_string(),
            },
        );
        AppState::new(triggers).unwrap()
    }

    async fn call(state: AppState, body: Value) -> (StatusCode, Value) {
        let (status, Json(reply)) = toggle_handler(State(state), Json(body)).await;
        (status, reply)
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let (status, Json(body)) = health_handler().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_toggle_rejects_missing_fields() {
        let state = state_with("release-a", "http://127.0.0.1:1/unused");

        for body in [
            json!({}),
            json!({ "flag": "release-a" }),
            json!({ "isAvailable": true }),
            json!({ "flag": "", "isAvailable": true }),
            json!({ "flag": "release-a", "isAvailable": "yes" }),
        ] {
            let (status, reply) = call(state.clone(), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(reply["success"], false);
            assert_eq!(reply["error"], "Missing or invalid flag or status");
        }
    }

    #[tokio::test]
    async fn test_toggle_rejects_unknown_flag() {
        let state = AppState::new(HashMap::new()).unwrap();

        let (status, reply) = call(
            state,
            json!({ "flag": "release-missing", "isAvailable": true }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["success"], false);
        assert_eq!(reply["error"], "Unknown flag: release-missing");
    }

    #[tokio::test]
    async fn test_toggle_forwards_and_acks() {
        let (url, seen) = spawn_upstream(StatusCode::OK).await;
        let state = state_with("release-a", &url);

        let (status, reply) = call(
            state.clone(),
            json!({ "flag": "release-a", "isAvailable": true }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["success"], true);
        assert_eq!(reply["message"], "Flag \"release-a\" is now available");

        let forwarded = seen.lock().unwrap().clone().unwrap();
        assert_eq!(forwarded["flag"], "release-a");
        assert_eq!(forwarded["isAvailable"], true);

        let (status, reply) = call(
            state,
            json!({ "flag": "release-a", "isAvailable": false }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["message"], "Flag \"release-a\" is now unavailable");
    }

    #[tokio::test]
    async fn test_toggle_maps_upstream_error() {
        let (url, _) = spawn_upstream(StatusCode::SERVICE_UNAVAILABLE).await;
        let state = state_with("release-a", &url);

        let (status, reply) = call(
            state,
            json!({ "flag": "release-a", "isAvailable": true }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply["success"], false);
        assert_eq!(reply["error"], "Upstream error: 503 Service Unavailable");
    }

    #[tokio::test]
    async fn test_toggle_reports_unreachable_upstream() {
        // Nothing listens on port 1
        let state = state_with("release-a", "http://127.0.0.1:1/trigger");

        let (status, reply) = call(
            state,
            json!({ "flag": "release-a", "isAvailable": true }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply["success"], false);
    }
}
