//! HTTP route handlers.

pub mod compare;
pub mod health;

use crate::error::ServerError;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// `GET /`: service name, version and endpoints.
pub async fn api_info() -> impl IntoResponse {
    Json(json!({
        "name": "facecheckd",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["POST /compare", "GET /health"],
    }))
}

pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
