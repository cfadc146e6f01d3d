//! Per-user dashboard preferences

use std::sync::Arc;

use dashboard_core::{
    ChartPreferences, DashboardError, DashboardResult, DefaultView, PreferencesStore,
    UserPreferences,
};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Chart timeframes a preference row may hold
pub const CHART_TIMEFRAMES: [&str; 5] = ["1d", "1w", "1m", "3m", "1y"];

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub default_view: Option<DefaultView>,
    pub chart_preferences: Option<ChartPreferences>,
    pub favorite_symbols: Option<Vec<String>>,
    pub auto_refresh: Option<bool>,
}

pub struct PreferencesService {
    store: Arc<dyn PreferencesStore>,
}

impl PreferencesService {
    pub fn new(store: Arc<dyn PreferencesStore>) -> Self {
        Self { store }
    }

    /// Stored preferences, or the defaults when the user has no row yet
    pub async fn get_or_default(&self, user_id: &str) -> DashboardResult<UserPreferences> {
        Ok(self
            .store
            .get(user_id)
            .await?
            .unwrap_or_else(|| UserPreferences::defaults_for(user_id)))
    }

    /// Persist the default row for a new account
    #[instrument(skip(self))]
    pub async fn create_defaults(&self, user_id: &str) -> DashboardResult<UserPreferences> {
        self.store.upsert(&UserPreferences::defaults_for(user_id)).await
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, user_id: &str, update: PreferencesUpdate) -> DashboardResult<UserPreferences> {
        if let Some(chart) = &update.chart_preferences {
            if !CHART_TIMEFRAMES.contains(&chart.timeframe.as_str()) {
                return Err(DashboardError::validation(format!(
                    "Unsupported chart timeframe: {}",
                    chart.timeframe
                )));
            }
        }

        let mut preferences = self.get_or_default(user_id).await?;
        if let Some(view) = update.default_view {
            preferences.default_view = view;
        }
        if let Some(chart) = update.chart_preferences {
            preferences.chart_preferences = chart;
        }
        if let Some(symbols) = update.favorite_symbols {
            preferences.favorite_symbols = symbols
                .iter()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(auto_refresh) = update.auto_refresh {
            preferences.auto_refresh = auto_refresh;
        }

        debug!("Saving preferences for {}", user_id);
        self.store.upsert(&preferences).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryPreferencesStore;

    fn service() -> PreferencesService {
        PreferencesService::new(Arc::new(MemoryPreferencesStore::new()))
    }

    #[tokio::test]
    async fn test_missing_row_reads_as_defaults() {
        let prefs = service().get_or_default("u1").await.unwrap();
        assert_eq!(prefs, UserPreferences::defaults_for("u1"));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let service = service();
        service.create_defaults("u1").await.unwrap();

        let updated = service
            .update(
                "u1",
                PreferencesUpdate {
                    default_view: Some(DefaultView::Crypto),
                    favorite_symbols: Some(vec![" btc ".to_string(), "".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.default_view, DefaultView::Crypto);
        assert_eq!(updated.favorite_symbols, vec!["BTC".to_string()]);
        assert_eq!(updated.chart_preferences.timeframe, "1d");
        assert!(updated.auto_refresh);
    }

    #[tokio::test]
    async fn test_unknown_timeframe_rejected() {
        let err = service()
            .update(
                "u1",
                PreferencesUpdate {
                    chart_preferences: Some(ChartPreferences {
                        timeframe: "5y".to_string(),
                        indicators: Vec::new(),
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));
    }
}
