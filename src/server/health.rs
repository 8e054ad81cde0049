//! Health endpoint
//!
//! - `GET /health` - 200 when the API is up and the database (if any) answers
//!   a ping, 503 when the ping fails or times out

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use super::probe::{Probe, ProbeOutcome};

/// Deadline for a single database probe per request
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub const STATUS_OK: &str = "ok";
pub const STATUS_UNHEALTHY: &str = "unhealthy";

/// JSON body returned by `/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            message: "API is running".to_string(),
            error: None,
        }
    }

    pub fn unhealthy(cause: impl Into<String>) -> Self {
        Self {
            status: STATUS_UNHEALTHY.to_string(),
            message: "Database connection failed".to_string(),
            error: Some(cause.into()),
        }
    }
}

/// Health handler
///
/// Runs at most one probe per request. Retrying is left to whoever polls
/// the endpoint.
pub async fn health(State(probe): State<Probe>) -> (StatusCode, Json<HealthResponse>) {
    match probe.run(PROBE_TIMEOUT).await {
        ProbeOutcome::Skipped | ProbeOutcome::Healthy => {
            (StatusCode::OK, Json(HealthResponse::ok()))
        }
        ProbeOutcome::Failed(cause) => {
            warn!(error = %cause, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::unhealthy(cause)),
            )
        }
    }
}

/// Build the router with request logging, panic recovery and CORS
pub fn build_router(probe: Probe) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(probe)
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}
