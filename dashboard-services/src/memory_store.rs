//! In-process watchlist and preference stores
//!
//! Used when no hosted backend is configured, and by tests. Change
//! notification mirrors the hosted realtime channel: every mutation fires the
//! callbacks subscribed for the owning user.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashboard_core::{
    AssetType, ChangeCallback, DashboardError, DashboardResult, PreferencesStore, Subscription,
    UserPreferences, WatchlistItem, WatchlistStore,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct WatchlistInner {
    rows: RwLock<Vec<WatchlistItem>>,
    /// user_id -> (listener id, callback)
    listeners: DashMap<String, Vec<(u64, ChangeCallback)>>,
    next_listener: AtomicU64,
}

impl WatchlistInner {
    fn notify(&self, user_id: &str) {
        // Callbacks run outside the map lock; they may subscribe or reload
        let callbacks: Vec<ChangeCallback> = self
            .listeners
            .get(user_id)
            .map(|entry| entry.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();

        debug!("Notifying {} watchlist listener(s) for {}", callbacks.len(), user_id);
        for callback in callbacks {
            callback();
        }
    }

    fn release(&self, user_id: &str, listener: u64) {
        if let Some(mut entry) = self.listeners.get_mut(user_id) {
            entry.retain(|(id, _)| *id != listener);
        }
        self.listeners.remove_if(user_id, |_, entry| entry.is_empty());
    }
}

/// Watchlist rows kept in process memory
///
/// Clones share the same rows and listeners, so two "sessions" holding clones
/// see each other's writes.
#[derive(Clone, Default)]
pub struct MemoryWatchlistStore {
    inner: Arc<WatchlistInner>,
}

impl MemoryWatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open subscriptions for `user_id`
    pub fn listener_count(&self, user_id: &str) -> usize {
        self.inner
            .listeners
            .get(user_id)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl WatchlistStore for MemoryWatchlistStore {
    async fn load(&self, user_id: &str) -> DashboardResult<Vec<WatchlistItem>> {
        let rows = self.inner.rows.read();
        // Rows are appended in insertion order; reverse first so equal
        // timestamps still come out newest first
        let mut owned: Vec<WatchlistItem> = rows
            .iter()
            .rev()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn subscribe(
        &self,
        user_id: &str,
        on_change: ChangeCallback,
    ) -> DashboardResult<Subscription> {
        let listener = self.inner.next_listener.fetch_add(1, Ordering::SeqCst);
        self.inner
            .listeners
            .entry(user_id.to_string())
            .or_default()
            .push((listener, on_change));

        let inner = Arc::clone(&self.inner);
        let owner = user_id.to_string();
        Ok(Subscription::new(format!("memory:watchlist:{}", user_id), move || {
            inner.release(&owner, listener);
        }))
    }

    async fn add(&self, user_id: &str, symbol: &str, asset_type: AssetType) -> DashboardResult<()> {
        if symbol.trim().is_empty() {
            return Err(DashboardError::validation("Symbol must not be empty"));
        }

        self.inner.rows.write().push(WatchlistItem {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            symbol: symbol.to_string(),
            asset_type,
            created_at: Utc::now(),
        });
        self.inner.notify(user_id);
        Ok(())
    }

    async fn remove(&self, user_id: &str, symbol: &str) -> DashboardResult<()> {
        let removed = {
            let mut rows = self.inner.rows.write();
            let before = rows.len();
            rows.retain(|row| !(row.user_id == user_id && row.symbol == symbol));
            before - rows.len()
        };

        if removed > 0 {
            self.inner.notify(user_id);
        }
        Ok(())
    }
}

/// Preference rows kept in process memory, keyed by user_id
#[derive(Clone, Default)]
pub struct MemoryPreferencesStore {
    rows: Arc<DashMap<String, UserPreferences>>,
}

impl MemoryPreferencesStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferencesStore for MemoryPreferencesStore {
    async fn get(&self, user_id: &str) -> DashboardResult<Option<UserPreferences>> {
        Ok(self.rows.get(user_id).map(|row| row.clone()))
    }

    async fn upsert(&self, preferences: &UserPreferences) -> DashboardResult<UserPreferences> {
        let now = Utc::now();
        let mut row = preferences.clone();

        let existing = self.rows.get(&row.user_id).map(|r| r.clone());
        row.id = row
            .id
            .or_else(|| existing.as_ref().and_then(|e| e.id.clone()))
            .or_else(|| Some(Uuid::new_v4().to_string()));
        row.created_at = existing
            .as_ref()
            .and_then(|e| e.created_at)
            .or(row.created_at)
            .or(Some(now));
        row.updated_at = Some(now);

        self.rows.insert(row.user_id.clone(), row.clone());
        Ok(row)
    }
}
