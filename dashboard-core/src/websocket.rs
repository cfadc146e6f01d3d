//! WebSocket message types for live dashboard views
//!
//! These types define the protocol between the server and a browser view
//! mounted over `/ws`.

use serde::{Deserialize, Serialize};

use crate::asset::AssetType;
use crate::chart::ChartTimeframe;

// ============================================================================
// Client -> Server Messages
// ============================================================================

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Select an asset and load its chart
    Select {
        symbol: String,
        asset_type: AssetType,
    },
    /// Change the chart timeframe of the selected asset
    Timeframe { timeframe: ChartTimeframe },
    /// Search input changed (debounced server-side)
    Search { query: String },
    /// Switch between stock and crypto search
    SearchType { kind: SearchKind },
    /// Add the asset to the watchlist, or remove it if present
    ToggleWatchlist {
        symbol: String,
        asset_type: AssetType,
    },
    /// Ping to keep connection alive
    Ping {
        /// Client timestamp
        timestamp: i64,
    },
}

/// Which provider a search goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Stocks,
    Crypto,
}

impl Default for SearchKind {
    fn default() -> Self {
        SearchKind::Stocks
    }
}

/// Dashboard pages that can be mounted as live views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Overview,
    Crypto,
    Stocks,
    Watchlist,
}

impl ViewKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "overview" | "dashboard" | "" => Some(ViewKind::Overview),
            "crypto" => Some(ViewKind::Crypto),
            "stocks" => Some(ViewKind::Stocks),
            "watchlist" => Some(ViewKind::Watchlist),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Overview => "overview",
            ViewKind::Crypto => "crypto",
            ViewKind::Stocks => "stocks",
            ViewKind::Watchlist => "watchlist",
        }
    }
}

// ============================================================================
// Server -> Client Messages
// ============================================================================

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full rendered state of the mounted view
    View {
        view: ViewKind,
        /// Increments on every render of this view
        revision: u64,
        state: serde_json::Value,
    },
    /// Error message
    Error { code: ErrorCode, message: String },
    /// Pong response to client ping
    Pong {
        /// Echo back client timestamp
        client_timestamp: i64,
        /// Server timestamp
        server_timestamp: i64,
    },
}

/// Error codes for WebSocket errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Invalid message format
    InvalidMessage,
    /// Market-data provider failure
    ProviderError,
    /// Watchlist/preferences persistence failure
    StoreError,
    /// Session missing or expired
    Unauthorized,
    /// Internal server error
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"select","symbol":"BTC","asset_type":"crypto"}"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Select { ref symbol, asset_type: AssetType::Crypto } if symbol == "BTC"
        ));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"timeframe","timeframe":"30d"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Timeframe { timeframe: ChartTimeframe::Month }
        ));
    }

    #[test]
    fn test_view_kind_parsing() {
        assert_eq!(ViewKind::from_str("crypto"), Some(ViewKind::Crypto));
        assert_eq!(ViewKind::from_str(""), Some(ViewKind::Overview));
        assert_eq!(ViewKind::from_str("settings"), None);
    }
}
