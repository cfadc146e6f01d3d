//! Chart series types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single point of a price chart
///
/// Series are kept in provider order (ascending time) and are not deduplicated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Milliseconds since the Unix epoch (UTC)
    pub timestamp: i64,
    pub price: f64,
}

impl ChartPoint {
    pub fn new(timestamp: i64, price: f64) -> Self {
        Self { timestamp, price }
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Chart timeframe selectable in the dashboard views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartTimeframe {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl ChartTimeframe {
    /// Number of days of history requested for this timeframe
    pub fn days(&self) -> u32 {
        match self {
            ChartTimeframe::Day => 1,
            ChartTimeframe::Week => 7,
            ChartTimeframe::Month => 30,
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "24h" | "1d" => Some(ChartTimeframe::Day),
            "7d" | "1w" => Some(ChartTimeframe::Week),
            "30d" | "1m" => Some(ChartTimeframe::Month),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartTimeframe::Day => "24h",
            ChartTimeframe::Week => "7d",
            ChartTimeframe::Month => "30d",
        }
    }
}

impl Default for ChartTimeframe {
    fn default() -> Self {
        ChartTimeframe::Week
    }
}

impl fmt::Display for ChartTimeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Granularity of a crypto market-chart request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CryptoInterval {
    Minutely,
    Hourly,
}

impl CryptoInterval {
    /// Minute-level data for ranges of at most one day, hourly otherwise
    pub fn for_days(days: u32) -> Self {
        if days <= 1 {
            CryptoInterval::Minutely
        } else {
            CryptoInterval::Hourly
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CryptoInterval::Minutely => "minutely",
            CryptoInterval::Hourly => "hourly",
        }
    }
}

/// Bar size unit for stock aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockTimespan {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl StockTimespan {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockTimespan::Minute => "minute",
            StockTimespan::Hour => "hour",
            StockTimespan::Day => "day",
            StockTimespan::Week => "week",
            StockTimespan::Month => "month",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "minute" => Some(StockTimespan::Minute),
            "hour" => Some(StockTimespan::Hour),
            "day" => Some(StockTimespan::Day),
            "week" => Some(StockTimespan::Week),
            "month" => Some(StockTimespan::Month),
            _ => None,
        }
    }
}

impl fmt::Display for StockTimespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
