//! Crypto provider API client
//!
//! Provides methods for the public markets, chart, search and global
//! endpoints. Results are converted to dashboard-core types.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashboard_core::{
    ChartPoint, CryptoInterval, CryptoQuote, DashboardError, DashboardResult, MarketStats,
    Provider,
};
use parking_lot::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::types::{GlobalResponse, MarketChartResponse, MarketCoin, SearchResponse};

/// Base URL for the crypto provider API
pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// Size of the top listing
pub const DEFAULT_TOP_LIMIT: u32 = 100;

/// Number of search hits resolved to quotes
const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub top_limit: u32,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            top_limit: DEFAULT_TOP_LIMIT,
        }
    }
}

impl CoinGeckoConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_top_limit(mut self, top_limit: u32) -> Self {
        self.top_limit = top_limit;
        self
    }
}

/// Crypto provider API client
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: Url,
    top_limit: u32,
    /// Upper-case symbol -> provider id, from the last top listing
    directory: Arc<RwLock<HashMap<String, String>>>,
}

impl CoinGeckoClient {
    pub fn new(config: CoinGeckoConfig) -> DashboardResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DashboardError::internal(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DashboardError::config(format!("Invalid crypto provider URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DashboardError::config(format!(
                "Invalid crypto provider URL: {}",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            top_limit: config.top_limit.max(1),
            directory: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Top coins by market cap, symbols upper-cased
    #[instrument(skip(self))]
    pub async fn get_top_cryptos(&self) -> DashboardResult<Vec<CryptoQuote>> {
        let url = self.endpoint(
            &["coins", "markets"],
            &[
                ("vs_currency", "usd".to_string()),
                ("order", "market_cap_desc".to_string()),
                ("per_page", self.top_limit.to_string()),
                ("page", "1".to_string()),
                ("sparkline", "false".to_string()),
            ],
        );

        let coins: Vec<MarketCoin> = self.get_json(url, "markets").await?;

        // Highest market cap wins when several coins share a ticker
        let mut directory = HashMap::with_capacity(coins.len());
        for coin in &coins {
            directory
                .entry(coin.symbol.to_uppercase())
                .or_insert_with(|| coin.id.clone());
        }
        *self.directory.write() = directory;

        let quotes: Vec<CryptoQuote> = coins.iter().filter_map(MarketCoin::to_crypto_quote).collect();
        debug!("Fetched {} top cryptos", quotes.len());
        Ok(quotes)
    }

    /// Price series for `id` over the last `days` days, in provider order
    #[instrument(skip(self))]
    pub async fn get_crypto_history(&self, id: &str, days: u32) -> DashboardResult<Vec<ChartPoint>> {
        let id = normalize_id(id)?;
        let days = days.max(1);
        let interval = CryptoInterval::for_days(days);

        let url = self.endpoint(
            &["coins", &id, "market_chart"],
            &[
                ("vs_currency", "usd".to_string()),
                ("days", days.to_string()),
                ("interval", interval.as_str().to_string()),
            ],
        );

        let chart: MarketChartResponse = self.get_json(url, "market chart").await?;
        Ok(chart.into_chart_points())
    }

    /// Coins matching `query`, resolved to quotes with one batched request
    ///
    /// Results follow search rank. Hits missing from the batch are dropped.
    #[instrument(skip(self))]
    pub async fn search_cryptos(&self, query: &str) -> DashboardResult<Vec<CryptoQuote>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint(&["search"], &[("query", query.to_string())]);
        let search: SearchResponse = self.get_json(url, "search").await?;

        let ids: Vec<String> = search
            .coins
            .into_iter()
            .take(SEARCH_LIMIT)
            .map(|c| c.id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let quotes = self.get_markets_by_ids(&ids).await?;
        let mut by_id: HashMap<String, CryptoQuote> =
            quotes.into_iter().map(|q| (q.id.clone(), q)).collect();

        let ordered: Vec<CryptoQuote> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        if ordered.len() < ids.len() {
            debug!(
                "{} of {} search hits had no market data",
                ids.len() - ordered.len(),
                ids.len()
            );
        }
        Ok(ordered)
    }

    /// Quotes for the given provider ids in one request, in provider order
    #[instrument(skip(self))]
    pub async fn get_markets_by_ids(&self, ids: &[String]) -> DashboardResult<Vec<CryptoQuote>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint(
            &["coins", "markets"],
            &[
                ("vs_currency", "usd".to_string()),
                ("ids", ids.join(",")),
                ("sparkline", "false".to_string()),
            ],
        );

        let coins: Vec<MarketCoin> = self.get_json(url, "markets").await?;
        Ok(coins.iter().filter_map(MarketCoin::to_crypto_quote).collect())
    }

    /// Single quote by provider id
    #[instrument(skip(self))]
    pub async fn get_crypto_quote(&self, id: &str) -> DashboardResult<CryptoQuote> {
        let id = normalize_id(id)?;
        self.get_markets_by_ids(std::slice::from_ref(&id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DashboardError::not_found(format!("No market data for {}", id)))
    }

    /// Global market snapshot
    #[instrument(skip(self))]
    pub async fn get_market_stats(&self) -> DashboardResult<MarketStats> {
        let url = self.endpoint(&["global"], &[]);
        let global: GlobalResponse = self.get_json(url, "global stats").await?;
        Ok(global.data.to_market_stats())
    }

    /// Map a ticker symbol to the provider id
    ///
    /// Uses the directory from the last top listing, then falls back to search.
    #[instrument(skip(self))]
    pub async fn resolve_coin_id(&self, symbol: &str) -> DashboardResult<String> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(DashboardError::validation("Symbol must not be empty"));
        }

        if let Some(id) = self.directory.read().get(&symbol) {
            return Ok(id.clone());
        }

        debug!("{} not in top listing, searching", symbol);

        let url = self.endpoint(&["search"], &[("query", symbol.clone())]);
        let search: SearchResponse = self.get_json(url, "search").await?;

        let id = search
            .coins
            .into_iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(&symbol))
            .map(|c| c.id)
            .ok_or_else(|| DashboardError::not_found(format!("Unknown crypto symbol: {}", symbol)))?;

        self.directory.write().entry(symbol).or_insert_with(|| id.clone());
        Ok(id)
    }

    /// Provider id for `symbol` if the directory already knows it
    pub fn known_coin_id(&self, symbol: &str) -> Option<String> {
        self.directory.read().get(&symbol.to_uppercase()).cloned()
    }

    fn endpoint(&self, segments: &[&str], params: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> DashboardResult<T> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            DashboardError::provider(Provider::CoinGecko, format!("Failed to fetch {}: {}", what, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                warn!("Crypto provider rate limit hit on {}", what);
            }
            return Err(DashboardError::provider(
                Provider::CoinGecko,
                format!("API error ({}): {}", status, body),
            ));
        }

        response.json().await.map_err(|e| {
            DashboardError::provider(Provider::CoinGecko, format!("Failed to parse {}: {}", what, e))
        })
    }
}

fn normalize_id(id: &str) -> DashboardResult<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(DashboardError::validation("Coin id must not be empty"));
    }
    Ok(id.to_lowercase())
}

impl std::fmt::Debug for CoinGeckoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinGeckoClient")
            .field("base_url", &self.base_url.as_str())
            .field("top_limit", &self.top_limit)
            .field("known_symbols", &self.directory.read().len())
            .finish()
    }
}
