use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Liveness probe.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "facecheckd",
        "backend": state.engine.backend(),
        "min_similarity": state.engine.policy().min_similarity,
        "uptime_seconds": state.uptime_seconds(),
    }))
}
