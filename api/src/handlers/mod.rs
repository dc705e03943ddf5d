pub mod collections;
pub mod recipes;
pub mod reviews;
pub mod users;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{error::ApiError, state::AppState};

/// 404 for an entity id that parsed but matched nothing.
fn not_found(entity: &str) -> ApiError {
    ApiError::not_found(format!("{} not found", entity))
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let uptime = state.started_at.elapsed().as_secs();
    let now = chrono::Utc::now().to_rfc3339();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": now,
                "uptime_secs": uptime,
            })),
        ),
        Err(err) => {
            tracing::warn!(uptime_secs = uptime, error = %err, "health check failed: storage unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "version": env!("CARGO_PKG_VERSION"),
                    "timestamp": now,
                    "uptime_secs": uptime,
                })),
            )
        }
    }
}

pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

/// Known path, unrouted method. axum still attaches the `allow` header.
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
