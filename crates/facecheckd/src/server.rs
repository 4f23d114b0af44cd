//! Router construction and server lifecycle.

use crate::config::Config;
use crate::middleware::{log_requests, request_id};
use crate::routes::{api_info, compare, health, not_found};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the router with all routes and middleware.
///
/// Layers apply bottom-up: tracing and request ids wrap logging, which
/// wraps the timeout.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes();
    let timeout = state.config.request_timeout();

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route(
            "/compare",
            post(compare::compare_images).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind, serve until Ctrl+C / SIGTERM, then drain in-flight requests.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.bind_addr;
    let state = AppState::from_config(config)?;

    tracing::info!(
        %addr,
        backend = state.engine.backend(),
        min_similarity = ?state.engine.policy().min_similarity,
        max_upload_mb = state.config.max_upload_mb,
        timeout_secs = state.config.request_timeout_secs,
        "facecheckd listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("facecheckd shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
