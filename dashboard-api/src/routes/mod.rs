//! API route definitions

mod auth;
mod crypto;
mod health;
mod pages;
mod preferences;
mod stocks;
mod watchlist;
pub mod ws;

use axum::Router;
use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(stocks::routes())
        .merge(crypto::routes())
        .merge(watchlist::routes())
        .merge(preferences::routes())
        .merge(auth::routes())
        .merge(health::routes())
}

/// Create page routes behind the route guard
pub fn page_routes() -> Router<AppState> {
    pages::routes()
}

/// Create WebSocket routes (separate from API)
pub fn ws_routes() -> Router<AppState> {
    ws::routes()
}
