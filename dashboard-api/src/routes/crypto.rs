//! Crypto market endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use dashboard_core::{ChartPoint, ChartTimeframe, CryptoQuote, DashboardError, DashboardResult, MarketStats};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiResult;
use crate::AppState;

/// Longest history the provider serves at hourly granularity
const MAX_HISTORY_DAYS: u32 = 90;

/// Query parameters for crypto history; `days` wins over `timeframe`
#[derive(Debug, Default, Deserialize)]
pub struct CryptoHistoryQuery {
    pub days: Option<u32>,
    pub timeframe: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CryptoListResponse {
    pub cryptos: Vec<CryptoQuote>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct CryptoHistoryResponse {
    pub id: String,
    pub days: u32,
    pub points: Vec<ChartPoint>,
}

/// Create crypto routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/crypto/top", get(get_top))
        .route("/crypto/history/{id}", get(get_history))
        .route("/crypto/search", get(search))
        .route("/market/stats", get(get_market_stats))
}

async fn get_top(State(state): State<AppState>) -> ApiResult<Json<CryptoListResponse>> {
    let cryptos = state.market_service.coingecko().get_top_cryptos().await?;
    info!("Returning {} top cryptocurrencies", cryptos.len());
    Ok(Json(CryptoListResponse {
        count: cryptos.len(),
        cryptos,
    }))
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<CryptoHistoryQuery>,
) -> ApiResult<Json<CryptoHistoryResponse>> {
    let days = history_days(&params)?;
    info!("Fetching {} days of history for {}", days, id);

    let points = state
        .market_service
        .coingecko()
        .get_crypto_history(&id, days)
        .await?;
    Ok(Json(CryptoHistoryResponse { id, days, points }))
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchQuery>) -> ApiResult<Json<CryptoListResponse>> {
    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(DashboardError::validation("Query parameter q is required").into());
    }

    info!("Searching cryptocurrencies: {}", query);
    let cryptos = state.market_service.coingecko().search_cryptos(&query).await?;
    Ok(Json(CryptoListResponse {
        count: cryptos.len(),
        cryptos,
    }))
}

async fn get_market_stats(State(state): State<AppState>) -> ApiResult<Json<MarketStats>> {
    let stats = state.market_service.coingecko().get_market_stats().await?;
    Ok(Json(stats))
}

fn history_days(params: &CryptoHistoryQuery) -> DashboardResult<u32> {
    if let Some(days) = params.days {
        if days == 0 || days > MAX_HISTORY_DAYS {
            return Err(DashboardError::validation(format!(
                "days must be between 1 and {}",
                MAX_HISTORY_DAYS
            )));
        }
        return Ok(days);
    }

    let timeframe = match &params.timeframe {
        Some(tf) => ChartTimeframe::from_str(tf)
            .ok_or_else(|| DashboardError::validation(format!("Unknown timeframe: {}", tf)))?,
        None => ChartTimeframe::default(),
    };
    Ok(timeframe.days())
}
