//! Per-user rows in the hosted `user_preferences` table

use async_trait::async_trait;
use dashboard_core::{DashboardError, DashboardResult, PreferencesStore, UserPreferences};
use reqwest::Method;
use tracing::instrument;

use crate::client::{rest_json, SupabaseClient};

const TABLE: &str = "user_preferences";

#[derive(Debug, Clone)]
pub struct SupabasePreferencesStore {
    client: SupabaseClient,
}

impl SupabasePreferencesStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PreferencesStore for SupabasePreferencesStore {
    #[instrument(skip(self))]
    async fn get(&self, user_id: &str) -> DashboardResult<Option<UserPreferences>> {
        let owner = format!("eq.{}", user_id);
        let url = self.client.url(
            &["rest", "v1", TABLE],
            &[("select", "*"), ("user_id", owner.as_str()), ("limit", "1")],
        );
        let request = self
            .client
            .request(Method::GET, url, &self.client.bearer_for(user_id));

        let rows: Vec<UserPreferences> = rest_json(request, "load preferences").await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, preferences), fields(user_id = %preferences.user_id))]
    async fn upsert(&self, preferences: &UserPreferences) -> DashboardResult<UserPreferences> {
        let url = self
            .client
            .url(&["rest", "v1", TABLE], &[("on_conflict", "user_id")]);
        let request = self
            .client
            .request(Method::POST, url, &self.client.bearer_for(&preferences.user_id))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[preferences]);

        let rows: Vec<UserPreferences> = rest_json(request, "save preferences").await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DashboardError::store("Preferences upsert returned no row"))
    }
}
