//! Core types for the Market Dashboard
//!
//! This crate defines the shared data structures used across the dashboard,
//! including quote records, chart series, watchlist rows, sessions and the
//! auth and persistence seams implemented by the backends.

pub mod asset;
pub mod chart;
pub mod error;
pub mod format;
pub mod quote;
pub mod session;
pub mod store;
pub mod watchlist;
pub mod websocket;

pub use asset::{AssetType, Provider};
pub use chart::{ChartPoint, ChartTimeframe, CryptoInterval, StockTimespan};
pub use error::{DashboardError, DashboardResult};
pub use format::{
    format_asset_change, format_compact_usd, format_percent_change, format_usd, ChangeTone,
};
pub use quote::{CryptoQuote, MarketStats, Quote, StockQuote, StockSearchResult};
pub use session::{Session, User};
pub use store::{AuthBackend, ChangeCallback, PreferencesStore, Subscription, WatchlistStore};
pub use watchlist::{ChartPreferences, DefaultView, UserPreferences, WatchlistItem};
pub use websocket::{ClientMessage, ErrorCode, SearchKind, ServerMessage, ViewKind};
