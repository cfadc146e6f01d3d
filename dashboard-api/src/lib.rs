//! Market Dashboard API Server
//!
//! HTTP and WebSocket surface over the stock and crypto providers, the
//! watchlist/preferences stores and the session manager.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::{
    http::{header, Method},
    Router,
};
use dashboard_coingecko::{CoinGeckoClient, CoinGeckoConfig};
use dashboard_core::{AuthBackend, DashboardResult, PreferencesStore, WatchlistStore};
use dashboard_polygon::{PolygonClient, PolygonConfig};
use dashboard_services::{
    LocalAuth, MarketService, MemoryPreferencesStore, MemoryWatchlistStore, PreferencesService,
    RouteGuard, SessionManager, ViewConfig, ViewContext, WatchlistService,
};
use dashboard_supabase::{
    SupabaseAuth, SupabaseClient, SupabaseConfig, SupabasePreferencesStore, SupabaseWatchlistStore,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::AppConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub market_service: Arc<MarketService>,
    pub watchlist_service: Arc<WatchlistService>,
    pub preferences_service: Arc<PreferencesService>,
    pub sessions: Arc<SessionManager>,
    pub guard: Arc<RouteGuard>,
    pub view_config: ViewConfig,
}

impl AppState {
    /// Build every client and service named by `config`
    pub fn from_config(config: &AppConfig) -> DashboardResult<Self> {
        let polygon = match &config.polygon_api_key {
            Some(key) => Some(PolygonClient::new(
                PolygonConfig::new(key.clone())
                    .with_base_url(config.polygon_base_url.clone())
                    .with_timeout(config.http_timeout)
                    .with_min_interval_ms(config.polygon_min_interval_ms),
            )?),
            None => {
                info!("POLYGON_API_KEY not set - stock endpoints will be unavailable");
                None
            }
        };

        let coingecko = CoinGeckoClient::new(
            CoinGeckoConfig::default()
                .with_base_url(config.coingecko_base_url.clone())
                .with_timeout(config.http_timeout)
                .with_top_limit(config.coingecko_top_limit),
        )?;

        let (auth, watchlists, preferences): (
            Arc<dyn AuthBackend>,
            Arc<dyn WatchlistStore>,
            Arc<dyn PreferencesStore>,
        ) = match &config.supabase {
            Some(settings) => {
                info!("Using hosted backend at {}", settings.url);
                let client = SupabaseClient::new(
                    SupabaseConfig::new(settings.url.clone(), settings.anon_key.clone())
                        .with_timeout(config.http_timeout),
                )?;
                (
                    Arc::new(SupabaseAuth::new(client.clone())),
                    Arc::new(SupabaseWatchlistStore::new(client.clone())),
                    Arc::new(SupabasePreferencesStore::new(client)),
                )
            }
            None => {
                info!("SUPABASE_URL not set - using in-process stores and local sessions");
                (
                    Arc::new(LocalAuth::new()),
                    Arc::new(MemoryWatchlistStore::new()),
                    Arc::new(MemoryPreferencesStore::new()),
                )
            }
        };

        let preferences_service = Arc::new(PreferencesService::new(preferences));
        let sessions = Arc::new(SessionManager::new(auth, Arc::clone(&preferences_service)));

        Ok(Self {
            market_service: Arc::new(MarketService::new(polygon, coingecko)),
            watchlist_service: Arc::new(WatchlistService::new(watchlists)),
            preferences_service,
            sessions,
            guard: Arc::new(RouteGuard::default()),
            view_config: config.view_config(),
        })
    }

    /// Dependencies of one mounted view
    pub fn view_context(&self) -> ViewContext {
        ViewContext::new(
            self.market_service.clone(),
            Arc::clone(&self.watchlist_service),
            self.view_config.clone(),
        )
    }
}

/// Full router with CORS and request tracing
pub fn app(state: AppState) -> Router {
    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", routes::api_routes())
        .merge(routes::page_routes())
        .merge(routes::ws_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
