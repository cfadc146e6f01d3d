//! Watchlist rows in the hosted `watchlist` table

use async_trait::async_trait;
use dashboard_core::{
    AssetType, ChangeCallback, DashboardError, DashboardResult, Subscription, WatchlistItem,
    WatchlistStore,
};
use reqwest::Method;
use tracing::instrument;

use crate::client::{rest_call, rest_json, SupabaseClient};
use crate::realtime::{self, ChannelJoin};
use crate::types::{NewWatchlistRow, PostgresChangesFilter};

const TABLE: &str = "watchlist";

#[derive(Debug, Clone)]
pub struct SupabaseWatchlistStore {
    client: SupabaseClient,
}

impl SupabaseWatchlistStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WatchlistStore for SupabaseWatchlistStore {
    #[instrument(skip(self))]
    async fn load(&self, user_id: &str) -> DashboardResult<Vec<WatchlistItem>> {
        let owner = format!("eq.{}", user_id);
        let url = self.client.url(
            &["rest", "v1", TABLE],
            &[
                ("select", "*"),
                ("user_id", owner.as_str()),
                ("order", "created_at.desc"),
            ],
        );
        let request = self
            .client
            .request(Method::GET, url, &self.client.bearer_for(user_id));

        rest_json(request, "load watchlist").await
    }

    #[instrument(skip(self, on_change))]
    async fn subscribe(&self, user_id: &str, on_change: ChangeCallback) -> DashboardResult<Subscription> {
        let url = self.client.realtime_url()?;
        let bearer = self.client.bearer_for(user_id);
        let join = ChannelJoin {
            topic: format!("realtime:{}:{}", TABLE, user_id),
            filter: PostgresChangesFilter::owned_rows(TABLE, user_id),
            access_token: (bearer != self.client.anon_key()).then_some(bearer),
        };

        realtime::subscribe(url, join, on_change).await
    }

    #[instrument(skip(self))]
    async fn add(&self, user_id: &str, symbol: &str, asset_type: AssetType) -> DashboardResult<()> {
        if symbol.trim().is_empty() {
            return Err(DashboardError::validation("Symbol must not be empty"));
        }

        let url = self.client.url(&["rest", "v1", TABLE], &[]);
        let request = self
            .client
            .request(Method::POST, url, &self.client.bearer_for(user_id))
            .header("Prefer", "return=minimal")
            .json(&[NewWatchlistRow {
                user_id,
                symbol,
                asset_type,
            }]);

        rest_call(request, "add to watchlist").await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, user_id: &str, symbol: &str) -> DashboardResult<()> {
        let owner = format!("eq.{}", user_id);
        let matching = format!("eq.{}", symbol);
        let url = self.client.url(
            &["rest", "v1", TABLE],
            &[("user_id", owner.as_str()), ("symbol", matching.as_str())],
        );
        let request = self
            .client
            .request(Method::DELETE, url, &self.client.bearer_for(user_id));

        rest_call(request, "remove from watchlist").await?;
        Ok(())
    }
}
