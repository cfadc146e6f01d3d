//! Crypto client against an in-process mock provider
//!
//! Run with: cargo test -p dashboard-coingecko --test client_mock

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use dashboard_coingecko::{CoinGeckoClient, CoinGeckoConfig};
use dashboard_core::DashboardError;
use serde_json::{json, Value};

type Log = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

fn coin(id: &str, symbol: &str, name: &str, price: f64) -> Value {
    json!({
        "id": id,
        "symbol": symbol,
        "name": name,
        "current_price": price,
        "market_cap": price * 1000.0,
        "total_volume": price * 10.0,
        "price_change_percentage_24h": 1.5
    })
}

async fn markets(State(log): State<Log>, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    log.lock().unwrap().push(("markets".to_string(), query.clone()));

    match query.get("ids") {
        // The batch answers in market-cap order and omits unknown ids
        Some(ids) => {
            let wanted: Vec<&str> = ids.split(',').collect();
            let all = [
                coin("bitcoin", "btc", "Bitcoin", 50_000.0),
                coin("wrapped-bitcoin", "wbtc", "Wrapped Bitcoin", 49_900.0),
                coin("bitcoin-cash", "bch", "Bitcoin Cash", 250.0),
            ];
            Json(Value::Array(
                all.into_iter()
                    .filter(|c| wanted.contains(&c["id"].as_str().unwrap_or_default()))
                    .collect(),
            ))
        }
        None => Json(json!([
            coin("bitcoin", "btc", "Bitcoin", 50_000.0),
            coin("ethereum", "eth", "Ethereum", 3_000.0)
        ])),
    }
}

async fn market_chart(
    State(log): State<Log>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    log.lock().unwrap().push((format!("chart/{}", id), query));
    if id == "missing" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({
        "prices": [[1700000000000_i64, 1.0], [1700003600000_i64, 2.0]],
        "market_caps": [],
        "total_volumes": []
    })))
}

async fn search(State(log): State<Log>, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    log.lock().unwrap().push(("search".to_string(), query));
    Json(json!({
        "coins": [
            {"id": "bitcoin-cash", "name": "Bitcoin Cash", "symbol": "BCH", "market_cap_rank": 20},
            {"id": "delisted-bitcoin", "name": "Delisted Bitcoin", "symbol": "DBTC"},
            {"id": "bitcoin", "name": "Bitcoin", "symbol": "BTC", "market_cap_rank": 1},
            {"id": "solana", "name": "Solana", "symbol": "SOL", "market_cap_rank": 5}
        ]
    }))
}

async fn global(State(log): State<Log>) -> Json<Value> {
    log.lock().unwrap().push(("global".to_string(), HashMap::new()));
    Json(json!({
        "data": {
            "active_cryptocurrencies": 12000,
            "total_market_cap": {"usd": 1000.0},
            "total_volume": {"usd": 50.0},
            "market_cap_percentage": {"btc": 50.0}
        }
    }))
}

async fn spawn_provider() -> (CoinGeckoClient, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/api/v3/coins/markets", get(markets))
        .route("/api/v3/coins/{id}/market_chart", get(market_chart))
        .route("/api/v3/search", get(search))
        .route("/api/v3/global", get(global))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = CoinGeckoConfig::default()
        .with_base_url(format!("http://{}/api/v3", addr))
        .with_top_limit(50);
    (CoinGeckoClient::new(config).unwrap(), log)
}

fn interval_of(log: &Log, index: usize) -> Option<String> {
    log.lock().unwrap()[index].1.get("interval").cloned()
}

#[tokio::test]
async fn test_history_interval_follows_days() {
    let (client, log) = spawn_provider().await;

    client.get_crypto_history("bitcoin", 1).await.unwrap();
    client.get_crypto_history("bitcoin", 2).await.unwrap();
    client.get_crypto_history("bitcoin", 30).await.unwrap();

    assert_eq!(interval_of(&log, 0).as_deref(), Some("minutely"));
    assert_eq!(interval_of(&log, 1).as_deref(), Some("hourly"));
    assert_eq!(interval_of(&log, 2).as_deref(), Some("hourly"));
}

#[tokio::test]
async fn test_history_points_in_provider_order() {
    let (client, _) = spawn_provider().await;

    let points = client.get_crypto_history("bitcoin", 7).await.unwrap();
    assert_eq!(points.len(), 2);
    assert!(points[0].timestamp < points[1].timestamp);
    assert_eq!(points[1].price, 2.0);
}

#[tokio::test]
async fn test_history_http_error_is_provider_error() {
    let (client, _) = spawn_provider().await;

    let err = client.get_crypto_history("missing", 7).await.unwrap_err();
    assert!(matches!(err, DashboardError::Provider { .. }));
}

#[tokio::test]
async fn test_top_cryptos_upper_cases_symbols() {
    let (client, log) = spawn_provider().await;

    let quotes = client.get_top_cryptos().await.unwrap();
    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].symbol, "BTC");
    assert_eq!(quotes[0].id, "bitcoin");

    let entries = log.lock().unwrap();
    let query = &entries[0].1;
    assert_eq!(query.get("per_page").map(String::as_str), Some("50"));
    assert_eq!(query.get("order").map(String::as_str), Some("market_cap_desc"));
}

#[tokio::test]
async fn test_search_batches_and_keeps_rank_order() {
    let (client, log) = spawn_provider().await;

    let quotes = client.search_cryptos("bitcoin").await.unwrap();

    let ids: Vec<&str> = quotes.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, vec!["bitcoin-cash", "bitcoin"]);

    let entries = log.lock().unwrap();
    assert_eq!(entries.len(), 2, "one search plus one batched markets call");
    assert_eq!(
        entries[1].1.get("ids").map(String::as_str),
        Some("bitcoin-cash,delisted-bitcoin,bitcoin,solana")
    );
}

#[tokio::test]
async fn test_empty_search_makes_no_request() {
    let (client, log) = spawn_provider().await;

    assert!(client.search_cryptos("").await.unwrap().is_empty());
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_resolve_coin_id_prefers_top_listing() {
    let (client, log) = spawn_provider().await;

    client.get_top_cryptos().await.unwrap();
    assert_eq!(client.resolve_coin_id("eth").await.unwrap(), "ethereum");
    assert_eq!(log.lock().unwrap().len(), 1);

    // Not in the listing: falls back to search
    assert_eq!(client.resolve_coin_id("SOL").await.unwrap(), "solana");
    assert_eq!(log.lock().unwrap().len(), 2);

    let err = client.resolve_coin_id("NOPE").await.unwrap_err();
    assert!(matches!(err, DashboardError::NotFound(_)));
}

#[tokio::test]
async fn test_market_stats_volume_change() {
    let (client, _) = spawn_provider().await;

    let stats = client.get_market_stats().await.unwrap();
    assert_eq!(stats.total_market_cap, 1000.0);
    assert!((stats.volume_change_24h - (-95.0)).abs() < 1e-9);
    assert_eq!(stats.market_cap_change_24h, 0.0);
}

/// Provider whose global endpoint answers `status` with `body`
async fn spawn_failing_global(status: StatusCode, body: &'static str) -> CoinGeckoClient {
    let app = Router::new().route("/api/v3/global", get(move || async move { (status, body) }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    CoinGeckoClient::new(CoinGeckoConfig::default().with_base_url(format!("http://{}/api/v3", addr))).unwrap()
}

#[tokio::test]
async fn test_market_stats_failures_are_provider_errors() {
    let limited = spawn_failing_global(
        StatusCode::TOO_MANY_REQUESTS,
        r#"{"status":{"error_code":429,"error_message":"rate limited"}}"#,
    )
    .await;
    let err = limited.get_market_stats().await.unwrap_err();
    assert!(matches!(err, DashboardError::Provider { .. }));

    let garbled = spawn_failing_global(StatusCode::OK, r#"{"unexpected": true}"#).await;
    let err = garbled.get_market_stats().await.unwrap_err();
    assert!(matches!(err, DashboardError::Provider { .. }));
}
