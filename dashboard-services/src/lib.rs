//! Business logic services for the Market Dashboard
//!
//! This crate provides the service layer between the provider/store clients
//! and the HTTP surface: the market data facade, watchlist and preference
//! services, sessions, the route guard and live dashboard views.

pub mod debounce;
pub mod local_auth;
pub mod market_service;
pub mod memory_store;
pub mod poller;
pub mod preferences_service;
pub mod route_guard;
pub mod sequencer;
pub mod session;
pub mod view;
pub mod watchlist_service;

pub use debounce::{SearchDebouncer, DEFAULT_SEARCH_DEBOUNCE};
pub use local_auth::LocalAuth;
pub use market_service::{MarketData, MarketService};
pub use memory_store::{MemoryPreferencesStore, MemoryWatchlistStore};
pub use poller::Poller;
pub use preferences_service::{PreferencesService, PreferencesUpdate};
pub use route_guard::{GuardDecision, RouteGuard};
pub use sequencer::{RequestSequencer, Ticket};
pub use session::{validate_sign_up, SessionManager, SignUpOutcome, SESSION_REVALIDATE_AFTER};
pub use view::{
    market_leaders, MarketLeaderRow, ViewConfig, ViewContext, ViewHandle, ViewSnapshot, ViewState,
    DEFAULT_STOCK_SYMBOLS,
};
pub use watchlist_service::WatchlistService;
