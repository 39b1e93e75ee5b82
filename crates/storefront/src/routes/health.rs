//! Health check handlers.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable while the cart directory is at its limit,
/// since new visitors would be refused a cart.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let directory = state.dispatcher().directory();
    if directory.len().await < directory.max_live_sessions() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
