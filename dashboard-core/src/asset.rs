//! Asset kinds and upstream data providers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of asset a quote or watchlist row refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Crypto,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stock" | "stocks" => Ok(AssetType::Stock),
            "crypto" | "cryptos" => Ok(AssetType::Crypto),
            _ => Err(format!("Unknown asset type: {}", s)),
        }
    }
}

/// External services the dashboard talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Stock aggregates API
    Polygon,
    /// Crypto market-data aggregator
    CoinGecko,
    /// Hosted auth + relational store
    Supabase,
}

impl Provider {
    /// Get the full display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Polygon => "Polygon",
            Provider::CoinGecko => "CoinGecko",
            Provider::Supabase => "Supabase",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_parsing() {
        assert_eq!("stock".parse::<AssetType>(), Ok(AssetType::Stock));
        assert_eq!("Crypto".parse::<AssetType>(), Ok(AssetType::Crypto));
        assert!("bond".parse::<AssetType>().is_err());
    }

    #[test]
    fn test_asset_type_serde() {
        let json = serde_json::to_string(&AssetType::Crypto).unwrap();
        assert_eq!(json, "\"crypto\"");
    }
}
