//! Crypto provider API response types
//!
//! These types mirror the provider's JSON and are converted to
//! dashboard-core types for use in the application.

use std::collections::HashMap;

use dashboard_core::{ChartPoint, CryptoQuote, MarketStats};
use serde::Deserialize;

/// A coin from GET /coins/markets
#[derive(Debug, Clone, Deserialize)]
pub struct MarketCoin {
    /// Provider id (e.g., "bitcoin")
    pub id: String,

    /// Lower-case ticker (e.g., "btc")
    pub symbol: String,

    pub name: String,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub current_price: Option<f64>,

    #[serde(default)]
    pub market_cap: Option<f64>,

    #[serde(default)]
    pub market_cap_rank: Option<u32>,

    #[serde(default)]
    pub total_volume: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

impl MarketCoin {
    /// Convert to a quote; coins without a current price are not quotable
    pub fn to_crypto_quote(&self) -> Option<CryptoQuote> {
        let price = self.current_price?;
        Some(CryptoQuote {
            id: self.id.clone(),
            symbol: self.symbol.to_uppercase(),
            name: self.name.clone(),
            price,
            volume_24h: self.total_volume.unwrap_or(0.0),
            price_change_24h: self.price_change_percentage_24h.unwrap_or(0.0),
            market_cap: self.market_cap,
            image_url: self.image.clone(),
        })
    }
}

/// Response from GET /coins/{id}/market_chart
#[derive(Debug, Clone, Deserialize)]
pub struct MarketChartResponse {
    /// `[timestamp_ms, price]` pairs
    #[serde(default)]
    pub prices: Vec<[f64; 2]>,

    #[serde(default)]
    pub market_caps: Vec<[f64; 2]>,

    #[serde(default)]
    pub total_volumes: Vec<[f64; 2]>,
}

impl MarketChartResponse {
    pub fn into_chart_points(self) -> Vec<ChartPoint> {
        self.prices
            .into_iter()
            .map(|[timestamp, price]| ChartPoint::new(timestamp as i64, price))
            .collect()
    }
}

/// Response from GET /search
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub coins: Vec<SearchCoin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,

    #[serde(default)]
    pub market_cap_rank: Option<u32>,

    #[serde(default)]
    pub thumb: Option<String>,
}

/// Response from GET /global
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalResponse {
    pub data: GlobalData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalData {
    #[serde(default)]
    pub active_cryptocurrencies: u64,

    #[serde(default)]
    pub markets: Option<u64>,

    /// Keyed by lower-case currency code
    #[serde(default)]
    pub total_market_cap: HashMap<String, f64>,

    #[serde(default)]
    pub total_volume: HashMap<String, f64>,

    /// Dominance keyed by lower-case symbol, plus optional `btc_dominance_24h`
    #[serde(default)]
    pub market_cap_percentage: HashMap<String, f64>,

    #[serde(default)]
    pub market_cap_change_percentage_24h_usd: Option<f64>,

    #[serde(default)]
    pub markets_change_24h: Option<f64>,
}

impl GlobalData {
    pub fn to_market_stats(&self) -> MarketStats {
        let total_market_cap = self.total_market_cap.get("usd").copied().unwrap_or(0.0);
        let total_24h_volume = self.total_volume.get("usd").copied().unwrap_or(0.0);

        let volume_change_24h = if total_market_cap != 0.0 {
            (total_24h_volume / total_market_cap - 1.0) * 100.0
        } else {
            0.0
        };

        MarketStats {
            total_market_cap,
            total_24h_volume,
            btc_dominance: self.market_cap_percentage.get("btc").copied().unwrap_or(0.0),
            active_cryptocurrencies: self.active_cryptocurrencies,
            market_cap_change_24h: self.market_cap_change_percentage_24h_usd.unwrap_or(0.0),
            volume_change_24h,
            btc_dominance_change_24h: self
                .market_cap_percentage
                .get("btc_dominance_24h")
                .copied()
                .unwrap_or(0.0),
            active_markets_change_24h: self.markets_change_24h.unwrap_or(0.0),
        }
    }
}
