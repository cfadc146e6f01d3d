//! Stock market endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use dashboard_core::{
    ChartPoint, ChartTimeframe, DashboardError, DashboardResult, StockQuote, StockSearchResult,
    StockTimespan,
};
use dashboard_polygon::StockHistoryRequest;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiResult;
use crate::AppState;

/// Query parameters for stock history
///
/// `timeframe` picks a preset range; otherwise the explicit bar size and
/// range apply on top of 5-minute bars over the last day.
#[derive(Debug, Default, Deserialize)]
pub struct StockHistoryQuery {
    pub timeframe: Option<String>,
    pub timespan: Option<String>,
    pub multiplier: Option<u32>,
    /// `YYYY-MM-DD` or epoch milliseconds
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub symbol: String,
    pub points: Vec<ChartPoint>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct StockSearchResponse {
    pub results: Vec<StockSearchResult>,
    pub count: usize,
}

/// Create stock routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stocks/quote/{symbol}", get(get_quote))
        .route("/stocks/history/{symbol}", get(get_history))
        .route("/stocks/search", get(search))
}

async fn get_quote(State(state): State<AppState>, Path(symbol): Path<String>) -> ApiResult<Json<StockQuote>> {
    info!("Fetching stock quote: {}", symbol);
    let quote = state.market_service.polygon()?.get_stock_quote(&symbol).await?;
    Ok(Json(quote))
}

async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<StockHistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    info!("Fetching stock history for {}: {:?}", symbol, params);
    let request = history_request(&symbol, &params)?;
    let points = state.market_service.stock_history_range(&request).await?;

    Ok(Json(HistoryResponse {
        symbol: request.symbol,
        count: points.len(),
        points,
    }))
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchQuery>) -> ApiResult<Json<StockSearchResponse>> {
    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(DashboardError::validation("Query parameter q is required").into());
    }

    info!("Searching stocks: {}", query);
    let results = state.market_service.polygon()?.search_stocks(&query).await?;
    Ok(Json(StockSearchResponse {
        count: results.len(),
        results,
    }))
}

fn history_request(symbol: &str, params: &StockHistoryQuery) -> DashboardResult<StockHistoryRequest> {
    let symbol = symbol.trim().to_uppercase();

    if let Some(timeframe) = &params.timeframe {
        let timeframe = ChartTimeframe::from_str(timeframe)
            .ok_or_else(|| DashboardError::validation(format!("Unknown timeframe: {}", timeframe)))?;
        return Ok(StockHistoryRequest::for_days(symbol, timeframe.days()));
    }

    let mut request = StockHistoryRequest::default_for(symbol);
    if let Some(timespan) = &params.timespan {
        request.timespan = StockTimespan::from_str(timespan)
            .ok_or_else(|| DashboardError::validation(format!("Unknown timespan: {}", timespan)))?;
    }
    if let Some(multiplier) = params.multiplier {
        if multiplier == 0 {
            return Err(DashboardError::validation("multiplier must be at least 1"));
        }
        request.multiplier = multiplier;
    }
    if let Some(from) = &params.from {
        request.from = parse_instant("from", from)?;
    }
    if let Some(to) = &params.to {
        request.to = parse_instant("to", to)?;
    }
    if request.from > request.to {
        return Err(DashboardError::validation("from must not be after to"));
    }
    Ok(request)
}

fn parse_instant(name: &str, value: &str) -> DashboardResult<DateTime<Utc>> {
    let invalid = || DashboardError::validation(format!("Invalid {} date: {}", name, value));

    if let Ok(millis) = value.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis).ok_or_else(invalid);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_preset() {
        let params = StockHistoryQuery {
            timeframe: Some("1w".to_string()),
            ..Default::default()
        };
        let request = history_request("aapl", &params).unwrap();
        assert_eq!(request.symbol, "AAPL");
        assert_eq!(request.timespan, StockTimespan::Hour);
        assert_eq!((request.to - request.from).num_days(), 7);
    }

    #[test]
    fn test_explicit_range() {
        let params = StockHistoryQuery {
            timespan: Some("day".to_string()),
            multiplier: Some(1),
            from: Some("2024-01-02".to_string()),
            to: Some("1706745600000".to_string()),
            ..Default::default()
        };
        let request = history_request("MSFT", &params).unwrap();
        assert_eq!(request.timespan, StockTimespan::Day);
        assert_eq!(request.from.to_rfc3339(), "2024-01-02T00:00:00+00:00");
        assert_eq!(request.to.timestamp_millis(), 1_706_745_600_000);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let bad = [
            StockHistoryQuery {
                timeframe: Some("5y".to_string()),
                ..Default::default()
            },
            StockHistoryQuery {
                timespan: Some("fortnight".to_string()),
                ..Default::default()
            },
            StockHistoryQuery {
                from: Some("yesterday".to_string()),
                ..Default::default()
            },
            StockHistoryQuery {
                from: Some("2024-02-01".to_string()),
                to: Some("2024-01-01".to_string()),
                ..Default::default()
            },
        ];
        for params in bad {
            assert!(matches!(
                history_request("AAPL", &params),
                Err(DashboardError::Validation(_))
            ));
        }
    }
}
