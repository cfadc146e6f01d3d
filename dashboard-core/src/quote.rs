//! Normalized quote records
//!
//! Both market-data providers are adapted to these shapes at their crate
//! boundary; provider-native field names never reach application state.

use serde::{Deserialize, Serialize};

use crate::asset::AssetType;

/// Snapshot of a stock derived from the previous-day aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    /// Ticker symbol (e.g., "AAPL")
    pub symbol: String,

    /// Display name (the provider echoes the ticker when no name is known)
    pub name: String,

    /// Close of the aggregate
    pub price: f64,

    /// Open of the aggregate
    pub open: f64,

    /// Absolute change, close - open
    pub change: f64,

    /// Percent change relative to open
    pub change_percent: f64,

    pub volume: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
}

impl StockQuote {
    /// Build a quote from an open/close pair, deriving change fields
    pub fn from_open_close(symbol: impl Into<String>, name: impl Into<String>, open: f64, close: f64, volume: f64) -> Self {
        let change = close - open;
        let change_percent = if open != 0.0 { change / open * 100.0 } else { 0.0 };

        Self {
            symbol: symbol.into(),
            name: name.into(),
            price: close,
            open,
            change,
            change_percent,
            volume,
            company_name: None,
            market_cap: None,
        }
    }
}

/// Snapshot of a cryptocurrency from the markets listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoQuote {
    /// Provider-internal id (e.g., "bitcoin"), used for history lookups
    pub id: String,

    /// Upper-case ticker symbol (e.g., "BTC"), used as the watchlist key
    pub symbol: String,

    pub name: String,

    pub price: f64,

    pub volume_24h: f64,

    /// 24h price change in percent
    pub price_change_24h: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A quote of either kind, tagged with its asset type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Quote {
    Stock(StockQuote),
    Crypto(CryptoQuote),
}

impl Quote {
    pub fn asset_type(&self) -> AssetType {
        match self {
            Quote::Stock(_) => AssetType::Stock,
            Quote::Crypto(_) => AssetType::Crypto,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Quote::Stock(q) => &q.symbol,
            Quote::Crypto(q) => &q.symbol,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Quote::Stock(q) => &q.name,
            Quote::Crypto(q) => &q.name,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            Quote::Stock(q) => q.price,
            Quote::Crypto(q) => q.price,
        }
    }

    /// Percent change shown next to the price
    pub fn change_percent(&self) -> f64 {
        match self {
            Quote::Stock(q) => q.change_percent,
            Quote::Crypto(q) => q.price_change_24h,
        }
    }

    pub fn volume(&self) -> f64 {
        match self {
            Quote::Stock(q) => q.volume,
            Quote::Crypto(q) => q.volume_24h,
        }
    }
}

impl From<StockQuote> for Quote {
    fn from(q: StockQuote) -> Self {
        Quote::Stock(q)
    }
}

impl From<CryptoQuote> for Quote {
    fn from(q: CryptoQuote) -> Self {
        Quote::Crypto(q)
    }
}

/// Global crypto market snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub total_market_cap: f64,
    pub total_24h_volume: f64,
    pub btc_dominance: f64,
    pub active_cryptocurrencies: u64,
    pub market_cap_change_24h: f64,
    pub volume_change_24h: f64,
    pub btc_dominance_change_24h: f64,
    pub active_markets_change_24h: f64,
}

/// A ticker returned by stock search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSearchResult {
    pub symbol: String,
    pub name: String,
    /// Provider market ("stocks", "otc", ...)
    #[serde(rename = "type")]
    pub market: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_quote_change_fields() {
        let q = StockQuote::from_open_close("AAPL", "AAPL", 200.0, 210.0, 1_000.0);
        assert_eq!(q.price, 210.0);
        assert!((q.change - 10.0).abs() < 1e-9);
        assert!((q.change_percent - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_stock_quote_zero_open() {
        let q = StockQuote::from_open_close("X", "X", 0.0, 1.0, 0.0);
        assert_eq!(q.change_percent, 0.0);
    }

    #[test]
    fn test_quote_tagged_serialization() {
        let quote = Quote::Crypto(CryptoQuote {
            id: "bitcoin".to_string(),
            symbol: "BTC".to_string(),
            name: "Bitcoin".to_string(),
            price: 50_000.0,
            volume_24h: 1e9,
            price_change_24h: 2.5,
            market_cap: None,
            image_url: None,
        });

        let value = serde_json::to_value(&quote).unwrap();
        assert_eq!(value["type"], "crypto");
        assert_eq!(value["symbol"], "BTC");

        let back: Quote = serde_json::from_value(value).unwrap();
        assert_eq!(back.asset_type(), AssetType::Crypto);
    }
}
