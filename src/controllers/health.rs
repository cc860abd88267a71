use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use crate::infrastructure::db::{check_connection, DbPool};
use crate::infrastructure::queue::JobQueue;
use crate::infrastructure::repositories::TtsRepository;

/// Dependencies checked by the readiness endpoint
pub struct HealthState {
    pub pool: Arc<DbPool>,
    pub queue: Arc<dyn JobQueue>,
    pub synthesizer: Arc<dyn TtsRepository>,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn health_ready(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let queue = if state.queue.is_ready() { "connected" } else { "closed" };
    let provider = state.synthesizer.provider_name();

    match check_connection(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "database": "connected",
                "queue": queue,
                "tts": provider
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "database": "disconnected",
                    "queue": queue,
                    "tts": provider
                })),
            )
        }
    }
}
