//! Rendered state of a dashboard view

use dashboard_core::{
    format_asset_change, format_usd, AssetType, ChangeTone, ChartPoint, ChartTimeframe,
    CryptoQuote, Quote, SearchKind, StockSearchResult, ViewKind, WatchlistItem,
};
use serde::Serialize;

/// One row of the market-leaders table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketLeaderRow {
    pub symbol: String,
    pub name: String,
    /// e.g. "$50,000.00"
    pub price: String,
    /// e.g. "+2.50%"
    pub change: String,
    pub tone: ChangeTone,
}

impl MarketLeaderRow {
    pub fn from_quote(quote: &Quote) -> Self {
        let change = quote.change_percent();
        let asset_type = quote.asset_type();
        Self {
            symbol: quote.symbol().to_string(),
            name: quote.name().to_string(),
            price: format_usd(quote.price()),
            change: format_asset_change(asset_type, change),
            tone: ChangeTone::for_asset(asset_type, change),
        }
    }
}

/// Market-leaders rows for a quote list, in list order
pub fn market_leaders(quotes: &[Quote]) -> Vec<MarketLeaderRow> {
    quotes.iter().map(MarketLeaderRow::from_quote).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedAsset {
    pub symbol: String,
    pub asset_type: AssetType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum SearchResults {
    Stocks(Vec<StockSearchResult>),
    Crypto(Vec<CryptoQuote>),
}

impl SearchResults {
    pub fn empty(kind: SearchKind) -> Self {
        match kind {
            SearchKind::Stocks => SearchResults::Stocks(Vec::new()),
            SearchKind::Crypto => SearchResults::Crypto(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SearchResults::Stocks(items) => items.len(),
            SearchResults::Crypto(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchState {
    pub kind: SearchKind,
    pub query: String,
    pub results: SearchResults,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            kind: SearchKind::default(),
            query: String::new(),
            results: SearchResults::empty(SearchKind::default()),
        }
    }
}

/// Everything a mounted view renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub view: ViewKind,
    /// Set until the first snapshot attempt finishes
    pub loading: bool,
    pub quotes: Vec<Quote>,
    pub market_leaders: Vec<MarketLeaderRow>,
    pub selected: Option<SelectedAsset>,
    pub chart: Vec<ChartPoint>,
    pub timeframe: ChartTimeframe,
    pub search: SearchState,
    pub watchlist: Vec<WatchlistItem>,
}

impl ViewState {
    pub fn new(view: ViewKind) -> Self {
        Self {
            view,
            loading: true,
            quotes: Vec::new(),
            market_leaders: Vec::new(),
            selected: None,
            chart: Vec::new(),
            timeframe: ChartTimeframe::default(),
            search: SearchState::default(),
            watchlist: Vec::new(),
        }
    }

    /// Replace the quote list and the rows derived from it
    pub fn set_quotes(&mut self, quotes: Vec<Quote>) {
        self.market_leaders = market_leaders(&quotes);
        self.quotes = quotes;
    }

    pub fn in_watchlist(&self, symbol: &str) -> bool {
        self.watchlist.iter().any(|row| row.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.symbol().eq_ignore_ascii_case(symbol))
    }
}
