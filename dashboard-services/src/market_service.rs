//! Market data facade over the stock and crypto providers

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashboard_coingecko::CoinGeckoClient;
use dashboard_core::{
    AssetType, ChartPoint, ChartTimeframe, CryptoQuote, DashboardError, DashboardResult,
    MarketStats, Quote, StockQuote, StockSearchResult, WatchlistItem,
};
use dashboard_polygon::{PolygonClient, StockHistoryRequest};
use tracing::{debug, instrument, warn};

/// Market data as the views consume it
///
/// Crypto lookups take the upper-case ticker symbol stored on watchlist rows;
/// implementations resolve provider ids themselves.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn stock_quote(&self, symbol: &str) -> DashboardResult<StockQuote>;

    async fn stock_history(&self, symbol: &str, timeframe: ChartTimeframe) -> DashboardResult<Vec<ChartPoint>>;

    async fn search_stocks(&self, query: &str) -> DashboardResult<Vec<StockSearchResult>>;

    async fn top_cryptos(&self) -> DashboardResult<Vec<CryptoQuote>>;

    async fn crypto_quote(&self, symbol: &str) -> DashboardResult<CryptoQuote>;

    async fn crypto_history(&self, symbol: &str, timeframe: ChartTimeframe) -> DashboardResult<Vec<ChartPoint>>;

    async fn search_cryptos(&self, query: &str) -> DashboardResult<Vec<CryptoQuote>>;

    async fn market_stats(&self) -> DashboardResult<MarketStats>;

    /// Quotes for `symbols` one after another; failed symbols are omitted
    async fn stock_quotes(&self, symbols: &[String]) -> Vec<StockQuote> {
        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.stock_quote(symbol).await {
                Ok(quote) => quotes.push(quote),
                Err(e) => warn!("Skipping quote for {}: {}", symbol, e),
            }
        }
        quotes
    }

    /// Quotes for every watchlist row, in row order; failed rows are omitted
    ///
    /// Crypto rows are served from one top listing, with a per-symbol lookup
    /// for coins outside it.
    async fn watchlist_quotes(&self, items: &[WatchlistItem]) -> Vec<Quote> {
        let listing: HashMap<String, CryptoQuote> =
            if items.iter().any(|i| i.asset_type == AssetType::Crypto) {
                match self.top_cryptos().await {
                    Ok(top) => top.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
                    Err(e) => {
                        warn!("Top listing unavailable for watchlist quotes: {}", e);
                        HashMap::new()
                    }
                }
            } else {
                HashMap::new()
            };

        let mut quotes = Vec::with_capacity(items.len());
        for item in items {
            let quote = match item.asset_type {
                AssetType::Stock => self.stock_quote(&item.symbol).await.map(Quote::from),
                AssetType::Crypto => match listing.get(&item.symbol.to_uppercase()) {
                    Some(quote) => Ok(Quote::from(quote.clone())),
                    None => self.crypto_quote(&item.symbol).await.map(Quote::from),
                },
            };
            match quote {
                Ok(quote) => quotes.push(quote),
                Err(e) => warn!("Skipping watchlist quote for {}: {}", item.symbol, e),
            }
        }
        quotes
    }
}

/// Service for fetching market data from the configured providers
///
/// The stock provider needs an API key; without one every stock call fails
/// with a configuration error while crypto keeps working.
pub struct MarketService {
    polygon: Option<Arc<PolygonClient>>,
    coingecko: Arc<CoinGeckoClient>,
}

impl MarketService {
    pub fn new(polygon: Option<PolygonClient>, coingecko: CoinGeckoClient) -> Self {
        Self {
            polygon: polygon.map(Arc::new),
            coingecko: Arc::new(coingecko),
        }
    }

    pub fn has_stock_provider(&self) -> bool {
        self.polygon.is_some()
    }

    pub fn polygon(&self) -> DashboardResult<&PolygonClient> {
        self.polygon
            .as_deref()
            .ok_or_else(|| DashboardError::config("POLYGON_API_KEY is not set; stock data is unavailable"))
    }

    pub fn coingecko(&self) -> &CoinGeckoClient {
        &self.coingecko
    }

    /// Ranged stock aggregates as collected chart points
    #[instrument(skip(self), fields(symbol = %request.symbol))]
    pub async fn stock_history_range(&self, request: &StockHistoryRequest) -> DashboardResult<Vec<ChartPoint>> {
        let history = self.polygon()?.get_stock_history(request).await?;
        Ok(history.collect())
    }

    /// Provider id for a ticker symbol, accepting provider ids as well
    async fn coin_id(&self, symbol: &str) -> DashboardResult<String> {
        if let Some(id) = self.coingecko.known_coin_id(symbol) {
            return Ok(id);
        }
        match self.coingecko.resolve_coin_id(symbol).await {
            Ok(id) => Ok(id),
            // Lower-case input that matches no ticker is taken as an id
            Err(DashboardError::NotFound(_)) if symbol.chars().all(|c| !c.is_ascii_uppercase()) => {
                debug!("Treating {} as a provider id", symbol);
                Ok(symbol.to_string())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MarketData for MarketService {
    async fn stock_quote(&self, symbol: &str) -> DashboardResult<StockQuote> {
        self.polygon()?.get_stock_quote(symbol).await
    }

    async fn stock_history(&self, symbol: &str, timeframe: ChartTimeframe) -> DashboardResult<Vec<ChartPoint>> {
        let request = StockHistoryRequest::for_days(symbol, timeframe.days());
        self.stock_history_range(&request).await
    }

    async fn search_stocks(&self, query: &str) -> DashboardResult<Vec<StockSearchResult>> {
        self.polygon()?.search_stocks(query).await
    }

    async fn top_cryptos(&self) -> DashboardResult<Vec<CryptoQuote>> {
        self.coingecko.get_top_cryptos().await
    }

    async fn crypto_quote(&self, symbol: &str) -> DashboardResult<CryptoQuote> {
        let id = self.coin_id(symbol).await?;
        self.coingecko.get_crypto_quote(&id).await
    }

    async fn crypto_history(&self, symbol: &str, timeframe: ChartTimeframe) -> DashboardResult<Vec<ChartPoint>> {
        let id = self.coin_id(symbol).await?;
        self.coingecko.get_crypto_history(&id, timeframe.days()).await
    }

    async fn search_cryptos(&self, query: &str) -> DashboardResult<Vec<CryptoQuote>> {
        self.coingecko.search_cryptos(query).await
    }

    async fn market_stats(&self) -> DashboardResult<MarketStats> {
        self.coingecko.get_market_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dashboard_coingecko::CoinGeckoConfig;
    use dashboard_core::Provider;
    use parking_lot::Mutex;

    /// Canned provider answers; records every crypto lookup
    #[derive(Default)]
    struct Canned {
        top: Vec<CryptoQuote>,
        lookups: Mutex<Vec<String>>,
    }

    fn crypto(symbol: &str, price: f64) -> CryptoQuote {
        CryptoQuote {
            id: symbol.to_lowercase(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            price,
            volume_24h: 0.0,
            price_change_24h: 0.0,
            market_cap: None,
            image_url: None,
        }
    }

    fn row(symbol: &str, asset_type: AssetType) -> WatchlistItem {
        WatchlistItem {
            id: symbol.to_string(),
            user_id: "u1".to_string(),
            symbol: symbol.to_string(),
            asset_type,
            created_at: Utc::now(),
        }
    }

    #[async_trait]
    impl MarketData for Canned {
        async fn stock_quote(&self, symbol: &str) -> DashboardResult<StockQuote> {
            if symbol == "FAIL" {
                return Err(DashboardError::provider(Provider::Polygon, "HTTP 429"));
            }
            Ok(StockQuote::from_open_close(symbol, symbol, 100.0, 110.0, 1.0))
        }
        async fn stock_history(&self, _: &str, _: ChartTimeframe) -> DashboardResult<Vec<ChartPoint>> {
            Ok(Vec::new())
        }
        async fn search_stocks(&self, _: &str) -> DashboardResult<Vec<StockSearchResult>> {
            Ok(Vec::new())
        }
        async fn top_cryptos(&self) -> DashboardResult<Vec<CryptoQuote>> {
            Ok(self.top.clone())
        }
        async fn crypto_quote(&self, symbol: &str) -> DashboardResult<CryptoQuote> {
            self.lookups.lock().push(symbol.to_string());
            if symbol == "PEPE" {
                Ok(crypto("PEPE", 0.00001))
            } else {
                Err(DashboardError::not_found(format!("Unknown crypto symbol: {}", symbol)))
            }
        }
        async fn crypto_history(&self, _: &str, _: ChartTimeframe) -> DashboardResult<Vec<ChartPoint>> {
            Ok(Vec::new())
        }
        async fn search_cryptos(&self, _: &str) -> DashboardResult<Vec<CryptoQuote>> {
            Ok(Vec::new())
        }
        async fn market_stats(&self) -> DashboardResult<MarketStats> {
            Ok(MarketStats::default())
        }
    }

    #[tokio::test]
    async fn test_watchlist_quotes_keep_row_order_and_omit_failures() {
        let market = Canned {
            top: vec![crypto("BTC", 50_000.0), crypto("ETH", 3_000.0)],
            ..Default::default()
        };
        let rows = vec![
            row("ETH", AssetType::Crypto),
            row("AAPL", AssetType::Stock),
            row("FAIL", AssetType::Stock),
            row("PEPE", AssetType::Crypto),
            row("NOPE", AssetType::Crypto),
        ];

        let quotes = market.watchlist_quotes(&rows).await;
        let symbols: Vec<&str> = quotes.iter().map(Quote::symbol).collect();
        assert_eq!(symbols, vec!["ETH", "AAPL", "PEPE"]);

        // Only coins outside the top listing are looked up one by one
        assert_eq!(*market.lookups.lock(), vec!["PEPE".to_string(), "NOPE".to_string()]);
    }

    #[tokio::test]
    async fn test_stock_quotes_omit_failures() {
        let market = Canned::default();
        let quotes = market
            .stock_quotes(&["AAPL".to_string(), "FAIL".to_string(), "MSFT".to_string()])
            .await;
        assert_eq!(quotes.len(), 2);
        assert!((quotes[0].change_percent - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stock_calls_without_key_are_config_errors() {
        let coingecko = CoinGeckoClient::new(CoinGeckoConfig::default()).unwrap();
        let service = MarketService::new(None, coingecko);

        assert!(!service.has_stock_provider());
        let err = service.stock_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
        let err = service.search_stocks("app").await.unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }
}
