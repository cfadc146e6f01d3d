//! Watchlist mutations serialized per (user, symbol)

use std::sync::Arc;

use dashboard_core::{
    AssetType, ChangeCallback, DashboardError, DashboardResult, Subscription, WatchlistItem,
    WatchlistStore,
};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument};

type PairLocks = DashMap<(String, String), Arc<Mutex<()>>>;

/// Service wrapping a watchlist store
///
/// Rows are keyed by `(user_id, symbol)` whatever their asset type. Mutations
/// for the same pair apply in issue order, and `add` skips the insert when
/// the symbol is already present.
pub struct WatchlistService {
    store: Arc<dyn WatchlistStore>,
    /// Only pairs with a mutation running or waiting have an entry
    locks: PairLocks,
}

/// Held while one mutation of a `(user_id, symbol)` pair runs
struct PairGuard<'a> {
    locks: &'a PairLocks,
    key: (String, String),
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        // Unlock before checking for waiters
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl WatchlistService {
    pub fn new(store: Arc<dyn WatchlistStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn WatchlistStore> {
        &self.store
    }

    /// Watchlist symbols are stored upper-case
    pub fn normalize_symbol(symbol: &str) -> DashboardResult<String> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(DashboardError::validation("Symbol must not be empty"));
        }
        Ok(symbol)
    }

    async fn lock_pair(&self, user_id: &str, symbol: &str) -> PairGuard<'_> {
        let mut pair = PairGuard {
            locks: &self.locks,
            key: (user_id.to_string(), symbol.to_string()),
            guard: None,
        };
        let lock = self.locks.entry(pair.key.clone()).or_default().clone();
        pair.guard = Some(lock.lock_owned().await);
        pair
    }

    pub async fn load(&self, user_id: &str) -> DashboardResult<Vec<WatchlistItem>> {
        self.store.load(user_id).await
    }

    pub async fn subscribe(
        &self,
        user_id: &str,
        on_change: ChangeCallback,
    ) -> DashboardResult<Subscription> {
        self.store.subscribe(user_id, on_change).await
    }

    /// Add the symbol unless present; returns whether a row was inserted
    #[instrument(skip(self))]
    pub async fn add(&self, user_id: &str, symbol: &str, asset_type: AssetType) -> DashboardResult<bool> {
        let symbol = Self::normalize_symbol(symbol)?;
        let _pair = self.lock_pair(user_id, &symbol).await;

        let existing = self.store.load(user_id).await?;
        if existing.iter().any(|row| row.symbol == symbol) {
            debug!("{} already on watchlist of {}", symbol, user_id);
            return Ok(false);
        }

        self.store.add(user_id, &symbol, asset_type).await?;
        info!("Added {} ({}) to watchlist of {}", symbol, asset_type, user_id);
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: &str, symbol: &str) -> DashboardResult<()> {
        let symbol = Self::normalize_symbol(symbol)?;
        let _pair = self.lock_pair(user_id, &symbol).await;

        self.store.remove(user_id, &symbol).await?;
        info!("Removed {} from watchlist of {}", symbol, user_id);
        Ok(())
    }

    /// Remove the symbol if present, add it otherwise; returns membership after
    #[instrument(skip(self))]
    pub async fn toggle(&self, user_id: &str, symbol: &str, asset_type: AssetType) -> DashboardResult<bool> {
        let symbol = Self::normalize_symbol(symbol)?;
        let _pair = self.lock_pair(user_id, &symbol).await;

        let existing = self.store.load(user_id).await?;
        if existing.iter().any(|row| row.symbol == symbol) {
            self.store.remove(user_id, &symbol).await?;
            info!("Toggled {} off watchlist of {}", symbol, user_id);
            Ok(false)
        } else {
            self.store.add(user_id, &symbol, asset_type).await?;
            info!("Toggled {} onto watchlist of {}", symbol, user_id);
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryWatchlistStore;

    fn service() -> (WatchlistService, MemoryWatchlistStore) {
        let store = MemoryWatchlistStore::new();
        (WatchlistService::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_add_skips_existing_pair() {
        let (service, store) = service();

        assert!(service.add("u1", "aapl", AssetType::Stock).await.unwrap());
        assert!(!service.add("u1", "AAPL", AssetType::Stock).await.unwrap());

        let rows = store.load("u1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_concurrent_adds_insert_once() {
        let (service, store) = service();
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.add("u1", "BTC", AssetType::Crypto).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load("u1").await.unwrap().len(), 1);
        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn test_symbol_is_the_key_across_asset_types() {
        let (service, store) = service();

        assert!(service.add("u1", "BTC", AssetType::Crypto).await.unwrap());
        assert!(!service.add("u1", "btc", AssetType::Stock).await.unwrap());

        let rows = store.load("u1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].asset_type, AssetType::Crypto);

        assert!(!service.toggle("u1", "BTC", AssetType::Stock).await.unwrap());
        assert!(store.load("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pair_locks_released_after_use() {
        let (service, _) = service();

        service.add("u1", "AAPL", AssetType::Stock).await.unwrap();
        service.toggle("u1", "ETH", AssetType::Crypto).await.unwrap();
        service.remove("u1", "AAPL").await.unwrap();
        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_flips_membership() {
        let (service, store) = service();

        assert!(service.toggle("u1", "ETH", AssetType::Crypto).await.unwrap());
        assert_eq!(store.load("u1").await.unwrap().len(), 1);

        assert!(!service.toggle("u1", "eth", AssetType::Crypto).await.unwrap());
        assert!(store.load("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_symbol_is_validation_error() {
        let (service, _) = service();
        let err = service.remove("u1", " ").await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));
    }
}
