//! Live dashboard views
//!
//! A mounted view owns its poller, search debouncer and watchlist
//! subscription through a [`ViewHandle`]; dropping the handle tears all three
//! down.

mod handle;
mod state;

use std::sync::Arc;
use std::time::Duration;

use dashboard_core::ViewKind;

use crate::debounce::DEFAULT_SEARCH_DEBOUNCE;
use crate::market_service::MarketData;
use crate::watchlist_service::WatchlistService;

pub use handle::{ViewHandle, ViewSnapshot};
pub use state::{
    market_leaders, MarketLeaderRow, SearchResults, SearchState, SelectedAsset, ViewState,
};

/// Symbols shown on the stocks view
pub const DEFAULT_STOCK_SYMBOLS: [&str; 5] = ["AAPL", "MSFT", "GOOGL", "AMZN", "META"];

/// Timing and content knobs shared by all views
#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub crypto_poll: Duration,
    pub stock_poll: Duration,
    pub watchlist_poll: Duration,
    pub search_debounce: Duration,
    pub default_stocks: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            crypto_poll: Duration::from_secs(30),
            stock_poll: Duration::from_secs(60),
            watchlist_poll: Duration::from_secs(30),
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            default_stocks: DEFAULT_STOCK_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ViewConfig {
    pub fn poll_interval(&self, kind: ViewKind) -> Duration {
        match kind {
            ViewKind::Overview | ViewKind::Crypto => self.crypto_poll,
            ViewKind::Stocks => self.stock_poll,
            ViewKind::Watchlist => self.watchlist_poll,
        }
    }
}

/// Services a view reads from
#[derive(Clone)]
pub struct ViewContext {
    pub market: Arc<dyn MarketData>,
    pub watchlist: Arc<WatchlistService>,
    pub config: ViewConfig,
}

impl ViewContext {
    pub fn new(market: Arc<dyn MarketData>, watchlist: Arc<WatchlistService>, config: ViewConfig) -> Self {
        Self {
            market,
            watchlist,
            config,
        }
    }
}
