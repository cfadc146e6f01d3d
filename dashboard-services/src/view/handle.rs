//! A mounted view: its state, its background tasks and client input

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use dashboard_core::{
    AssetType, ChangeCallback, ChartTimeframe, ClientMessage, DashboardError, DashboardResult,
    Quote, SearchKind, ServerMessage, Subscription, ViewKind,
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{SearchResults, SelectedAsset, ViewState};
use super::ViewContext;
use crate::debounce::SearchDebouncer;
use crate::poller::Poller;
use crate::sequencer::{RequestSequencer, Ticket};

/// A rendered state and its position in the view's render sequence
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub revision: u64,
    pub state: ViewState,
}

impl ViewSnapshot {
    pub fn to_message(&self) -> DashboardResult<ServerMessage> {
        let state = serde_json::to_value(&self.state)
            .map_err(|e| DashboardError::internal(format!("Failed to render view: {}", e)))?;
        Ok(ServerMessage::View {
            view: self.state.view,
            revision: self.revision,
            state,
        })
    }
}

struct ViewShared {
    kind: ViewKind,
    user_id: String,
    ctx: ViewContext,
    state: Mutex<ViewState>,
    revision: AtomicU64,
    disposed: AtomicBool,
    /// A poll-driven refresh is running
    polling: AtomicBool,
    publisher: watch::Sender<ViewSnapshot>,
    quotes_seq: RequestSequencer,
    chart_seq: RequestSequencer,
    search_seq: RequestSequencer,
    rows_seq: RequestSequencer,
}

impl ViewShared {
    fn read<T>(&self, f: impl FnOnce(&ViewState) -> T) -> T {
        f(&self.state.lock())
    }

    /// Mutate and publish; a disposed view drops the update
    fn apply(&self, update: impl FnOnce(&mut ViewState)) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            debug!("Dropping update for disposed {} view", self.kind.as_str());
            return false;
        }

        let mut state = self.state.lock();
        update(&mut state);
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.publisher.send_replace(ViewSnapshot {
            revision,
            state: state.clone(),
        });
        true
    }

    /// Apply only while `ticket` is the newest issued for its slot
    fn apply_if(&self, seq: &RequestSequencer, ticket: &Ticket, update: impl FnOnce(&mut ViewState)) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            debug!("Dropping {} result for disposed {} view", seq.slot(), self.kind.as_str());
            return false;
        }

        let mut state = self.state.lock();
        if !seq.is_current(ticket) {
            return false;
        }
        update(&mut state);
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.publisher.send_replace(ViewSnapshot {
            revision,
            state: state.clone(),
        });
        true
    }

    /// Apply unless a newer result for the slot has already been applied
    fn apply_newer(&self, seq: &RequestSequencer, ticket: &Ticket, update: impl FnOnce(&mut ViewState)) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            debug!("Dropping {} result for disposed {} view", seq.slot(), self.kind.as_str());
            return false;
        }

        let mut state = self.state.lock();
        if !seq.accept_newer(ticket) {
            return false;
        }
        update(&mut state);
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.publisher.send_replace(ViewSnapshot {
            revision,
            state: state.clone(),
        });
        true
    }

    /// Poll tick; skipped while the previous tick's refresh is still running
    async fn poll(&self) {
        if self.polling.swap(true, Ordering::SeqCst) {
            debug!("Skipping {} poll, previous refresh still running", self.kind.as_str());
            return;
        }
        let _running = PollGuard(&self.polling);
        self.refresh().await;
    }

    /// Fetch the view's quote list; failures keep the previous list
    async fn refresh(&self) {
        let ticket = self.quotes_seq.issue();
        let market = &self.ctx.market;

        let quotes: Option<Vec<Quote>> = match self.kind {
            ViewKind::Crypto => match market.top_cryptos().await {
                Ok(top) => Some(top.into_iter().map(Quote::from).collect()),
                Err(e) => {
                    warn!("Failed to fetch top cryptos: {}", e);
                    None
                }
            },
            ViewKind::Stocks => {
                let quotes = market.stock_quotes(&self.ctx.config.default_stocks).await;
                Some(quotes.into_iter().map(Quote::from).collect())
            }
            ViewKind::Watchlist => {
                let rows = self.read(|s| s.watchlist.clone());
                Some(market.watchlist_quotes(&rows).await)
            }
            ViewKind::Overview => {
                let stock_symbols: Vec<String> = self.read(|s| {
                    s.watchlist
                        .iter()
                        .filter(|row| row.asset_type == AssetType::Stock)
                        .map(|row| row.symbol.clone())
                        .collect()
                });
                let (top, stocks) = tokio::join!(market.top_cryptos(), market.stock_quotes(&stock_symbols));

                let mut quotes: Vec<Quote> = match top {
                    Ok(top) => top.into_iter().map(Quote::from).collect(),
                    Err(e) => {
                        warn!("Failed to fetch top cryptos: {}", e);
                        Vec::new()
                    }
                };
                quotes.extend(stocks.into_iter().map(Quote::from));
                Some(quotes)
            }
        };

        let applied = self.apply_newer(&self.quotes_seq, &ticket, |state| {
            if let Some(quotes) = quotes {
                state.set_quotes(quotes);
            }
            state.loading = false;
        });

        if applied && self.kind != ViewKind::Overview {
            self.select_first_if_none().await;
        }
    }

    async fn select_first_if_none(&self) {
        let first = self.read(|s| {
            if s.selected.is_some() {
                return None;
            }
            s.quotes
                .first()
                .map(|q| (q.symbol().to_string(), q.asset_type()))
        });
        if let Some((symbol, asset_type)) = first {
            self.select(symbol, asset_type).await;
        }
    }

    async fn select(&self, symbol: String, asset_type: AssetType) {
        self.apply(|state| {
            let name = state.quote(&symbol).map(|q| q.name().to_string());
            state.selected = Some(SelectedAsset {
                symbol,
                asset_type,
                name,
            });
        });
        self.load_chart().await;
    }

    async fn set_timeframe(&self, timeframe: ChartTimeframe) {
        self.apply(|state| state.timeframe = timeframe);
        self.load_chart().await;
    }

    /// One history fetch for the current selection; failures keep the
    /// previous chart
    async fn load_chart(&self) {
        // Selection and ticket are read together so the newest ticket always
        // belongs to the newest selection
        let pending = {
            let state = self.state.lock();
            state
                .selected
                .clone()
                .map(|selected| (selected, state.timeframe, self.chart_seq.issue()))
        };
        let Some((selected, timeframe, ticket)) = pending else {
            return;
        };

        let market = &self.ctx.market;
        let result = match selected.asset_type {
            AssetType::Stock => market.stock_history(&selected.symbol, timeframe).await,
            AssetType::Crypto => market.crypto_history(&selected.symbol, timeframe).await,
        };

        match result {
            Ok(points) => {
                self.apply_if(&self.chart_seq, &ticket, |state| state.chart = points);
            }
            Err(e) => warn!("Failed to fetch {} history for {}: {}", timeframe, selected.symbol, e),
        }
    }

    /// Search for a settled query, unless the input has moved on since
    async fn run_search(&self, query: String) {
        if query.trim().is_empty() {
            return;
        }

        let pending = {
            let state = self.state.lock();
            (state.search.query == query).then(|| (state.search.kind, self.search_seq.issue_for(&query)))
        };
        let Some((kind, ticket)) = pending else {
            debug!("Search input moved on from {:?}", query);
            return;
        };

        let market = &self.ctx.market;
        let results = match kind {
            SearchKind::Stocks => market.search_stocks(&query).await.map(SearchResults::Stocks),
            SearchKind::Crypto => market.search_cryptos(&query).await.map(SearchResults::Crypto),
        };

        match results {
            Ok(results) => {
                self.apply_if(&self.search_seq, &ticket, |state| state.search.results = results);
            }
            Err(e) => warn!("Search for {:?} failed: {}", query, e),
        }
    }

    async fn reload_watchlist(&self) {
        let ticket = self.rows_seq.issue();
        match self.ctx.watchlist.load(&self.user_id).await {
            Ok(rows) => {
                self.apply_if(&self.rows_seq, &ticket, |state| state.watchlist = rows);
            }
            Err(e) => warn!("Failed to load watchlist for {}: {}", self.user_id, e),
        }
    }

    async fn on_watchlist_changed(&self) {
        self.reload_watchlist().await;
        if matches!(self.kind, ViewKind::Watchlist | ViewKind::Overview) {
            self.refresh().await;
        }
    }
}

/// Clears the polling flag when a refresh ends or is cancelled
struct PollGuard<'a>(&'a AtomicBool);

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owner of a mounted view
///
/// Dropping the handle stops the poller and the search debouncer, releases
/// the watchlist subscription and marks the view disposed; fetches already in
/// flight finish but their results are discarded.
pub struct ViewHandle {
    shared: Arc<ViewShared>,
    subscription: Option<Subscription>,
    debouncer: SearchDebouncer,
    _poller: Poller,
}

impl ViewHandle {
    /// Mount a view for `user_id` and load its first snapshot
    pub async fn mount(ctx: ViewContext, kind: ViewKind, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let poll_interval = ctx.config.poll_interval(kind);
        let search_debounce = ctx.config.search_debounce;

        let initial = ViewState::new(kind);
        let (publisher, _) = watch::channel(ViewSnapshot {
            revision: 0,
            state: initial.clone(),
        });

        let shared = Arc::new(ViewShared {
            kind,
            user_id,
            ctx,
            state: Mutex::new(initial),
            revision: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
            polling: AtomicBool::new(false),
            publisher,
            quotes_seq: RequestSequencer::new("quotes"),
            chart_seq: RequestSequencer::new("chart"),
            search_seq: RequestSequencer::new("search"),
            rows_seq: RequestSequencer::new("watchlist"),
        });

        info!("Mounting {} view for {}", kind.as_str(), shared.user_id);

        // Subscribe before the first load so no change slips between them
        let subscription = match shared
            .ctx
            .watchlist
            .subscribe(&shared.user_id, watchlist_callback(Arc::downgrade(&shared)))
            .await
        {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!("Live watchlist updates unavailable for {}: {}", shared.user_id, e);
                None
            }
        };

        shared.reload_watchlist().await;
        shared.refresh().await;

        let weak = Arc::downgrade(&shared);
        let poller = Poller::spawn(kind.as_str(), poll_interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(shared) = weak.upgrade() {
                    shared.poll().await;
                }
            }
        });

        let weak = Arc::downgrade(&shared);
        let debouncer = SearchDebouncer::spawn(search_debounce, move |query| {
            let weak = weak.clone();
            async move {
                if let Some(shared) = weak.upgrade() {
                    shared.run_search(query).await;
                }
            }
        });

        Self {
            shared,
            subscription,
            debouncer,
            _poller: poller,
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.shared.kind
    }

    pub fn user_id(&self) -> &str {
        &self.shared.user_id
    }

    /// Latest rendered state
    pub fn snapshot(&self) -> ViewSnapshot {
        self.shared.publisher.borrow().clone()
    }

    /// Receiver that sees every subsequent render (latest wins)
    pub fn updates(&self) -> watch::Receiver<ViewSnapshot> {
        self.shared.publisher.subscribe()
    }

    pub fn has_live_updates(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Apply one client message; returns a direct reply when there is one
    pub async fn handle(&self, message: ClientMessage) -> DashboardResult<Option<ServerMessage>> {
        match message {
            ClientMessage::Select { symbol, asset_type } => {
                self.select(symbol, asset_type).await;
                Ok(None)
            }
            ClientMessage::Timeframe { timeframe } => {
                self.set_timeframe(timeframe).await;
                Ok(None)
            }
            ClientMessage::Search { query } => {
                self.search(query);
                Ok(None)
            }
            ClientMessage::SearchType { kind } => {
                self.set_search_kind(kind);
                Ok(None)
            }
            ClientMessage::ToggleWatchlist { symbol, asset_type } => {
                self.toggle_watchlist(&symbol, asset_type).await?;
                Ok(None)
            }
            ClientMessage::Ping { timestamp } => Ok(Some(ServerMessage::Pong {
                client_timestamp: timestamp,
                server_timestamp: Utc::now().timestamp_millis(),
            })),
        }
    }

    pub async fn select(&self, symbol: impl Into<String>, asset_type: AssetType) {
        let symbol = symbol.into().trim().to_string();
        if symbol.is_empty() {
            return;
        }
        // Crypto selections may carry a provider id, which is lower-case
        let symbol = match asset_type {
            AssetType::Stock => symbol.to_uppercase(),
            AssetType::Crypto => symbol,
        };
        self.shared.select(symbol, asset_type).await;
    }

    pub async fn set_timeframe(&self, timeframe: ChartTimeframe) {
        self.shared.set_timeframe(timeframe).await;
    }

    /// Record search input; the search itself runs once input settles
    ///
    /// Blank input clears the results at once without a request.
    pub fn search(&self, query: impl Into<String>) {
        let query = query.into();
        let blank = query.trim().is_empty();

        self.shared.apply(|state| {
            state.search.query = query.clone();
            if blank {
                state.search.results = SearchResults::empty(state.search.kind);
            }
        });
        if blank {
            self.shared.search_seq.invalidate();
        }
        self.debouncer.push(query);
    }

    /// Switch search provider and search the current input again
    pub fn set_search_kind(&self, kind: SearchKind) {
        self.shared.apply(|state| {
            state.search.kind = kind;
            state.search.results = SearchResults::empty(kind);
        });
        self.shared.search_seq.invalidate();

        let query = self.shared.read(|s| s.search.query.clone());
        self.debouncer.push(query);
    }

    /// Add or remove `symbol`; returns whether it is on the watchlist after
    pub async fn toggle_watchlist(&self, symbol: &str, asset_type: AssetType) -> DashboardResult<bool> {
        let member = self
            .shared
            .ctx
            .watchlist
            .toggle(&self.shared.user_id, symbol, asset_type)
            .await?;

        // Without a live channel nothing else will tell this view
        if !self.has_live_updates() {
            self.shared.on_watchlist_changed().await;
        }
        Ok(member)
    }
}

impl Drop for ViewHandle {
    fn drop(&mut self) {
        self.shared.disposed.store(true, Ordering::SeqCst);
        info!(
            "Unmounting {} view for {}",
            self.shared.kind.as_str(),
            self.shared.user_id
        );
    }
}

/// Change callback that reloads the view, if it is still mounted
fn watchlist_callback(view: Weak<ViewShared>) -> ChangeCallback {
    Arc::new(move || {
        let view = view.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Some(shared) = view.upgrade() {
                        shared.on_watchlist_changed().await;
                    }
                });
            }
            Err(_) => warn!("Watchlist change delivered outside the runtime; ignoring"),
        }
    })
}
