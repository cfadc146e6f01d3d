//! Stock provider API response types
//!
//! These types mirror the provider's JSON and are converted to
//! dashboard-core types before leaving this crate.

use dashboard_core::{ChartPoint, StockQuote, StockSearchResult};
use serde::Deserialize;

/// One OHLCV candle as returned by the aggregates endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateBar {
    /// Ticker (present on previous-close responses only)
    #[serde(rename = "T", default)]
    pub ticker: Option<String>,

    #[serde(rename = "o")]
    pub open: f64,

    #[serde(rename = "h", default)]
    pub high: Option<f64>,

    #[serde(rename = "l", default)]
    pub low: Option<f64>,

    #[serde(rename = "c")]
    pub close: f64,

    #[serde(rename = "v", default)]
    pub volume: f64,

    /// Volume-weighted average price
    #[serde(rename = "vw", default)]
    pub vwap: Option<f64>,

    /// Bar start, milliseconds since epoch
    #[serde(rename = "t")]
    pub timestamp: i64,
}

impl AggregateBar {
    pub fn to_chart_point(&self) -> ChartPoint {
        ChartPoint::new(self.timestamp, self.close)
    }

    /// Quote for `symbol` derived from this bar's open and close
    pub fn to_stock_quote(&self, symbol: &str) -> StockQuote {
        let name = self.ticker.clone().unwrap_or_else(|| symbol.to_string());
        StockQuote::from_open_close(symbol, name, self.open, self.close, self.volume)
    }
}

/// Response from GET /v2/aggs/ticker/{ticker}/prev and /range/...
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatesResponse {
    #[serde(default)]
    pub ticker: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub results_count: Option<u64>,

    #[serde(default)]
    pub results: Option<Vec<AggregateBar>>,
}

/// Response from GET /v3/reference/tickers
#[derive(Debug, Clone, Deserialize)]
pub struct TickersResponse {
    #[serde(default)]
    pub results: Option<Vec<TickerResult>>,

    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerResult {
    pub ticker: String,

    #[serde(default)]
    pub name: Option<String>,

    /// "stocks", "crypto", "fx", "otc", "indices"
    #[serde(default)]
    pub market: Option<String>,

    #[serde(default)]
    pub primary_exchange: Option<String>,
}

impl TickerResult {
    pub fn to_search_result(self) -> StockSearchResult {
        StockSearchResult {
            name: self.name.unwrap_or_else(|| self.ticker.clone()),
            symbol: self.ticker,
            market: self.market.unwrap_or_else(|| "stocks".to_string()),
            exchange: self.primary_exchange,
        }
    }
}

/// Error body returned alongside non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn describe(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prev_close_parsing() {
        let json = r#"{
            "ticker": "AAPL",
            "queryCount": 1,
            "resultsCount": 1,
            "adjusted": true,
            "results": [
                {"T": "AAPL", "v": 70790813, "vw": 131.6292, "o": 130.465, "c": 130.15, "h": 133.41, "l": 129.89, "t": 1673038800000, "n": 645365}
            ],
            "status": "OK",
            "request_id": "6a7e466379af0a71039d60cc78e72282"
        }"#;

        let response: AggregatesResponse = serde_json::from_str(json).unwrap();
        let bar = &response.results.unwrap()[0];
        let quote = bar.to_stock_quote("AAPL");

        assert_eq!(quote.price, 130.15);
        assert!((quote.change - (130.15 - 130.465)).abs() < 1e-9);
        assert_eq!(quote.volume, 70790813.0);
    }

    #[test]
    fn test_empty_aggregates() {
        let json = r#"{"ticker":"ZZZZ","queryCount":0,"resultsCount":0,"adjusted":true,"status":"OK"}"#;
        let response: AggregatesResponse = serde_json::from_str(json).unwrap();
        assert!(response.results.is_none());
        assert_eq!(response.results_count, Some(0));
    }

    #[test]
    fn test_ticker_result_conversion() {
        let json = r#"{"ticker":"AAPL","name":"Apple Inc.","market":"stocks","primary_exchange":"XNAS","active":true}"#;
        let result: TickerResult = serde_json::from_str(json).unwrap();
        let search = result.to_search_result();

        assert_eq!(search.symbol, "AAPL");
        assert_eq!(search.name, "Apple Inc.");
        assert_eq!(search.market, "stocks");
        assert_eq!(search.exchange.as_deref(), Some("XNAS"));
    }
}
