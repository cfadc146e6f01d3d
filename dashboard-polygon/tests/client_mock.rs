//! Stock client against an in-process mock provider
//!
//! Run with: cargo test -p dashboard-polygon --test client_mock

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use dashboard_core::{DashboardError, StockTimespan};
use dashboard_polygon::{PolygonClient, PolygonConfig, StockHistoryRequest};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<(String, HashMap<String, String>)>>>,
}

impl Recorded {
    fn push(&self, path: String, query: HashMap<String, String>) {
        self.queries.lock().push((path, query));
    }
}

async fn prev_close(
    State(recorded): State<Recorded>,
    Path(ticker): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    recorded.push(format!("prev/{}", ticker), query);
    match ticker.as_str() {
        "AAPL" => (
            StatusCode::OK,
            Json(json!({
                "ticker": "AAPL",
                "resultsCount": 1,
                "status": "OK",
                "results": [{"T": "AAPL", "o": 180.0, "c": 184.5, "h": 185.0, "l": 179.2, "v": 51234567.0, "t": 1700000000000_i64}]
            })),
        ),
        "FAIL" => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"status": "ERROR", "error": "You've exceeded the maximum requests per minute"})),
        ),
        _ => (
            StatusCode::OK,
            Json(json!({"ticker": ticker, "resultsCount": 0, "status": "OK"})),
        ),
    }
}

async fn range(
    State(recorded): State<Recorded>,
    Path((ticker, multiplier, timespan, from, to)): Path<(String, u32, String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorded.push(format!("range/{}/{}/{}/{}/{}", ticker, multiplier, timespan, from, to), query);
    if ticker == "EMPTY" {
        return Json(json!({"ticker": "EMPTY", "resultsCount": 0, "status": "OK"}));
    }
    Json(json!({
        "ticker": ticker,
        "resultsCount": 3,
        "status": "OK",
        "results": [
            {"o": 1.0, "c": 10.0, "v": 1.0, "t": 1000},
            {"o": 1.0, "c": 11.0, "v": 1.0, "t": 2000},
            {"o": 1.0, "c": 12.0, "v": 1.0, "t": 2000}
        ]
    }))
}

async fn tickers(
    State(recorded): State<Recorded>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorded.push("tickers".to_string(), query);
    Json(json!({
        "status": "OK",
        "results": [
            {"ticker": "AAPL", "name": "Apple Inc.", "market": "stocks", "primary_exchange": "XNAS"},
            {"ticker": "APLE", "name": "Apple Hospitality REIT, Inc.", "market": "stocks", "primary_exchange": "XNYS"}
        ]
    }))
}

async fn spawn_provider() -> (PolygonClient, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/v2/aggs/ticker/{ticker}/prev", get(prev_close))
        .route(
            "/v2/aggs/ticker/{ticker}/range/{multiplier}/{timespan}/{from}/{to}",
            get(range),
        )
        .route("/v3/reference/tickers", get(tickers))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = PolygonConfig::new("test-key")
        .with_base_url(format!("http://{}", addr))
        .with_min_interval_ms(0);
    (PolygonClient::new(config).unwrap(), recorded)
}

#[tokio::test]
async fn test_quote_change_percent_matches_open_and_close() {
    let (client, recorded) = spawn_provider().await;

    let quote = client.get_stock_quote("aapl").await.unwrap();

    assert_eq!(quote.symbol, "AAPL");
    assert_eq!(quote.price, 184.5);
    assert_eq!(quote.open, 180.0);
    let expected = (quote.price - quote.open) / quote.open * 100.0;
    assert!((quote.change_percent - expected).abs() < 1e-9);
    assert!((quote.change - 4.5).abs() < 1e-9);

    let queries = recorded.queries.lock();
    let (path, query) = &queries[0];
    assert_eq!(path, "prev/AAPL");
    assert_eq!(query.get("adjusted").map(String::as_str), Some("true"));
    assert_eq!(query.get("apiKey").map(String::as_str), Some("test-key"));
}

#[tokio::test]
async fn test_quote_without_results_is_provider_error() {
    let (client, _) = spawn_provider().await;

    let err = client.get_stock_quote("ZZZZ").await.unwrap_err();
    assert!(err.is_provider_error());
}

#[tokio::test]
async fn test_quote_http_error_is_provider_error() {
    let (client, _) = spawn_provider().await;

    let err = client.get_stock_quote("FAIL").await.unwrap_err();
    match err {
        DashboardError::Provider { message, .. } => {
            assert!(message.contains("429"));
            assert!(message.contains("maximum requests"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_history_keeps_provider_order() {
    let (client, recorded) = spawn_provider().await;

    let request = StockHistoryRequest::default_for("MSFT");
    let points: Vec<_> = client.get_stock_history(&request).await.unwrap().collect();

    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![10.0, 11.0, 12.0]);
    assert_eq!(points[1].timestamp, points[2].timestamp);

    let queries = recorded.queries.lock();
    let (path, query) = &queries[0];
    assert!(path.starts_with("range/MSFT/5/minute/"));
    assert_eq!(query.get("sort").map(String::as_str), Some("asc"));
    assert_eq!(query.get("limit").map(String::as_str), Some("120"));
}

#[tokio::test]
async fn test_history_without_data_is_empty() {
    let (client, _) = spawn_provider().await;

    let mut request = StockHistoryRequest::default_for("EMPTY");
    request.timespan = StockTimespan::Day;
    request.multiplier = 1;

    let history = client.get_stock_history(&request).await.unwrap();
    assert_eq!(history.count(), 0);
}

#[tokio::test]
async fn test_search_maps_tickers() {
    let (client, recorded) = spawn_provider().await;

    let results = client.search_stocks("apple").await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].symbol, "AAPL");
    assert_eq!(results[1].exchange.as_deref(), Some("XNYS"));

    let queries = recorded.queries.lock();
    let (_, query) = &queries[0];
    assert_eq!(query.get("search").map(String::as_str), Some("apple"));
    assert_eq!(query.get("active").map(String::as_str), Some("true"));
    assert_eq!(query.get("limit").map(String::as_str), Some("10"));
}

#[tokio::test]
async fn test_empty_search_makes_no_request() {
    let (client, recorded) = spawn_provider().await;

    assert!(client.search_stocks("   ").await.unwrap().is_empty());
    assert!(recorded.queries.lock().is_empty());
    assert_eq!(client.limiter().stats().total_requests, 0);
}
