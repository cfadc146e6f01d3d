//! Persisted per-user rows: watchlist items and preferences

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::AssetType;

/// A user-owned pointer into the market-data space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub id: String,
    /// Owner; every row belongs to exactly one user
    pub user_id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub created_at: DateTime<Utc>,
}

/// Landing view after sign-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultView {
    Stocks,
    Crypto,
}

impl Default for DefaultView {
    fn default() -> Self {
        DefaultView::Stocks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPreferences {
    /// One of "1d", "1w", "1m", "3m", "1y"
    pub timeframe: String,
    #[serde(default)]
    pub indicators: Vec<String>,
}

impl Default for ChartPreferences {
    fn default() -> Self {
        Self {
            timeframe: "1d".to_string(),
            indicators: Vec::new(),
        }
    }
}

/// One row per user, upserted by user_id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub default_view: DefaultView,
    #[serde(default)]
    pub chart_preferences: ChartPreferences,
    #[serde(default)]
    pub favorite_symbols: Vec<String>,
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_auto_refresh() -> bool {
    true
}

impl UserPreferences {
    /// Preferences created for a freshly signed-up user
    pub fn defaults_for(user_id: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            default_view: DefaultView::Stocks,
            chart_preferences: ChartPreferences::default(),
            favorite_symbols: Vec::new(),
            auto_refresh: default_auto_refresh(),
            created_at: None,
            updated_at: None,
        }
    }
}
