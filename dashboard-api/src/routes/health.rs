//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    /// False when no stock provider key is configured
    stock_provider: bool,
    active_sessions: usize,
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let stock_provider = state.market_service.has_stock_provider();

    let response = HealthResponse {
        status: if stock_provider { "healthy" } else { "degraded" }.to_string(),
        stock_provider,
        active_sessions: state.sessions.active_sessions(),
    };

    // Crypto, watchlist and auth still work without stock data
    (StatusCode::OK, Json(response))
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}
