//! Stock provider API client
//!
//! Provides quote, chart-history and ticker-search calls against the
//! aggregates REST API. Every request goes through the shared rate limiter.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashboard_core::{
    DashboardError, DashboardResult, Provider, StockQuote, StockSearchResult, StockTimespan,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::history::StockHistory;
use crate::rate_limiter::{RateLimiter, POLYGON_MIN_REQUEST_INTERVAL_MS};
use crate::types::{AggregatesResponse, ErrorResponse, TickersResponse};

/// Base URL for the stock provider API
pub const POLYGON_API_BASE: &str = "https://api.polygon.io";

/// Maximum number of candles requested for a chart
const HISTORY_LIMIT: u32 = 120;

/// Maximum number of tickers returned by search
const SEARCH_LIMIT: u32 = 10;

/// Stock client settings
#[derive(Debug, Clone)]
pub struct PolygonConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub min_interval_ms: u64,
}

impl PolygonConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: POLYGON_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            min_interval_ms: POLYGON_MIN_REQUEST_INTERVAL_MS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_interval_ms(mut self, min_interval_ms: u64) -> Self {
        self.min_interval_ms = min_interval_ms;
        self
    }
}

/// Parameters for a ranged aggregates request
#[derive(Debug, Clone, PartialEq)]
pub struct StockHistoryRequest {
    pub symbol: String,
    pub timespan: StockTimespan,
    pub multiplier: u32,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl StockHistoryRequest {
    /// 5-minute bars over the last 24 hours
    pub fn default_for(symbol: impl Into<String>) -> Self {
        let to = Utc::now();
        Self {
            symbol: symbol.into(),
            timespan: StockTimespan::Minute,
            multiplier: 5,
            from: to - ChronoDuration::hours(24),
            to,
        }
    }

    /// Hourly bars for `days` days when longer than one day, else the default
    pub fn for_days(symbol: impl Into<String>, days: u32) -> Self {
        let mut request = Self::default_for(symbol);
        if days > 1 {
            request.timespan = StockTimespan::Hour;
            request.multiplier = 1;
            request.from = request.to - ChronoDuration::days(i64::from(days));
        }
        request
    }
}

/// Stock provider API client
#[derive(Clone)]
pub struct PolygonClient {
    client: Client,
    base_url: Url,
    api_key: String,
    limiter: Arc<RateLimiter>,
}

impl PolygonClient {
    /// Create a client with its own rate limiter
    pub fn new(config: PolygonConfig) -> DashboardResult<Self> {
        let limiter = Arc::new(RateLimiter::new(config.min_interval_ms, "Polygon"));
        Self::with_limiter(config, limiter)
    }

    /// Create a client sharing an existing rate limiter
    pub fn with_limiter(config: PolygonConfig, limiter: Arc<RateLimiter>) -> DashboardResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DashboardError::internal(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DashboardError::config(format!("Invalid stock provider URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DashboardError::config(format!(
                "Invalid stock provider URL: {}",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Previous trading day's aggregate as a quote
    #[instrument(skip(self))]
    pub async fn get_stock_quote(&self, symbol: &str) -> DashboardResult<StockQuote> {
        let symbol = normalize_symbol(symbol)?;
        let url = self.endpoint(
            &["v2", "aggs", "ticker", &symbol, "prev"],
            &[("adjusted", "true".to_string())],
        );

        debug!("Fetching previous close for: {}", symbol);

        let response: AggregatesResponse = self.get_json(url, "previous close").await?;

        response
            .results
            .as_deref()
            .and_then(|bars| bars.first())
            .map(|bar| bar.to_stock_quote(&symbol))
            .ok_or_else(|| {
                DashboardError::provider(
                    Provider::Polygon,
                    format!("No previous close data for {}", symbol),
                )
            })
    }

    /// Ranged aggregates as a lazy chart series; no data yields an empty series
    #[instrument(skip(self), fields(symbol = %request.symbol))]
    pub async fn get_stock_history(
        &self,
        request: &StockHistoryRequest,
    ) -> DashboardResult<StockHistory> {
        let symbol = normalize_symbol(&request.symbol)?;
        let multiplier = request.multiplier.max(1).to_string();
        let from = request.from.timestamp_millis().to_string();
        let to = request.to.timestamp_millis().to_string();

        let url = self.endpoint(
            &[
                "v2",
                "aggs",
                "ticker",
                &symbol,
                "range",
                &multiplier,
                request.timespan.as_str(),
                &from,
                &to,
            ],
            &[
                ("adjusted", "true".to_string()),
                ("sort", "asc".to_string()),
                ("limit", HISTORY_LIMIT.to_string()),
            ],
        );

        debug!(
            "Fetching {}x{} aggregates for {}",
            multiplier,
            request.timespan.as_str(),
            symbol
        );

        let response: AggregatesResponse = self.get_json(url, "aggregates").await?;
        let bars = response.results.unwrap_or_default();

        debug!("Received {} aggregates for {}", bars.len(), symbol);
        Ok(StockHistory::new(bars))
    }

    /// Active tickers matching `query`, at most ten
    #[instrument(skip(self))]
    pub async fn search_stocks(&self, query: &str) -> DashboardResult<Vec<StockSearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint(
            &["v3", "reference", "tickers"],
            &[
                ("search", query.to_string()),
                ("active", "true".to_string()),
                ("sort", "ticker".to_string()),
                ("order", "asc".to_string()),
                ("limit", SEARCH_LIMIT.to_string()),
            ],
        );

        debug!("Searching tickers for: {}", query);

        let response: TickersResponse = self.get_json(url, "ticker search").await?;

        Ok(response
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.to_search_result())
            .collect())
    }

    fn endpoint(&self, segments: &[&str], params: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("apiKey", &self.api_key);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> DashboardResult<T> {
        self.limiter.acquire().await?;

        debug!("GET {}", url.path());

        let response = self.client.get(url).send().await.map_err(|e| {
            DashboardError::provider(Provider::Polygon, format!("Failed to fetch {}: {}", what, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.describe().map(str::to_string))
                .unwrap_or(body);
            return Err(DashboardError::provider(
                Provider::Polygon,
                format!("API error ({}): {}", status, detail),
            ));
        }

        response.json().await.map_err(|e| {
            DashboardError::provider(Provider::Polygon, format!("Failed to parse {}: {}", what, e))
        })
    }
}

fn normalize_symbol(symbol: &str) -> DashboardResult<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(DashboardError::validation("Symbol must not be empty"));
    }
    Ok(symbol.to_uppercase())
}

impl std::fmt::Debug for PolygonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolygonClient")
            .field("base_url", &self.base_url.as_str())
            .field("min_interval", &self.limiter.min_interval())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_history_request() {
        let request = StockHistoryRequest::default_for("AAPL");
        assert_eq!(request.timespan, StockTimespan::Minute);
        assert_eq!(request.multiplier, 5);
        assert_eq!(request.to - request.from, ChronoDuration::hours(24));
    }

    #[test]
    fn test_history_request_for_week() {
        let request = StockHistoryRequest::for_days("AAPL", 7);
        assert_eq!(request.timespan, StockTimespan::Hour);
        assert_eq!(request.to - request.from, ChronoDuration::days(7));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = PolygonClient::new(
            PolygonConfig::new("key").with_base_url("http://localhost:9000/proxy/"),
        )
        .unwrap();
        let url = client.endpoint(&["v2", "aggs"], &[("adjusted", "true".to_string())]);
        assert_eq!(url.path(), "/proxy/v2/aggs");
        assert_eq!(url.query(), Some("adjusted=true&apiKey=key"));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = PolygonClient::new(PolygonConfig::new("key").with_base_url("not a url")).unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }

    #[test]
    fn test_empty_symbol_rejected() {
        assert!(normalize_symbol("  ").is_err());
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
    }
}
