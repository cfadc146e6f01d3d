//! Watchlist endpoints (session required)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use dashboard_core::{AssetType, Quote, WatchlistItem};
use dashboard_services::MarketData;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WatchlistQuery {
    /// Also fetch a quote per row
    #[serde(default)]
    pub quotes: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub symbol: String,
    #[serde(alias = "type")]
    pub asset_type: AssetType,
}

#[derive(Debug, Serialize)]
pub struct WatchlistResponse {
    pub items: Vec<WatchlistItem>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotes: Option<Vec<Quote>>,
}

#[derive(Debug, Serialize)]
pub struct AddResponse {
    /// False when the pair was already on the list
    pub added: bool,
    pub items: Vec<WatchlistItem>,
}

/// Create watchlist routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/watchlist", get(list).post(add))
        .route("/watchlist/{symbol}", delete(remove))
}

async fn list(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(params): Query<WatchlistQuery>,
) -> ApiResult<Json<WatchlistResponse>> {
    let items = state.watchlist_service.load(session.user_id()).await?;
    let quotes = if params.quotes {
        Some(state.market_service.watchlist_quotes(&items).await)
    } else {
        None
    };

    Ok(Json(WatchlistResponse {
        count: items.len(),
        items,
        quotes,
    }))
}

async fn add(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(body): Json<AddRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = session.user_id();
    let added = state
        .watchlist_service
        .add(user_id, &body.symbol, body.asset_type)
        .await?;
    info!("Watchlist add {} for {}: added={}", body.symbol, user_id, added);

    let items = state.watchlist_service.load(user_id).await?;
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(AddResponse { added, items })))
}

async fn remove(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(symbol): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .watchlist_service
        .remove(session.user_id(), &symbol)
        .await?;
    info!("Watchlist remove {} for {}", symbol, session.user_id());
    Ok(StatusCode::NO_CONTENT)
}
