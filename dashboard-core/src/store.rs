//! Seams implemented by the hosted backend and the in-process fallbacks

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::asset::AssetType;
use crate::error::DashboardResult;
use crate::session::{Session, User};
use crate::watchlist::{UserPreferences, WatchlistItem};

/// Invoked on any row change for a subscribed user; consumers reload in full
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// CRUD + live-update bridge between a user and their watchlist rows
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// All rows owned by `user_id`, newest first
    async fn load(&self, user_id: &str) -> DashboardResult<Vec<WatchlistItem>>;

    /// Open a live-update channel filtered to rows owned by `user_id`
    ///
    /// The channel stays open until the returned guard is released or dropped.
    async fn subscribe(
        &self,
        user_id: &str,
        on_change: ChangeCallback,
    ) -> DashboardResult<Subscription>;

    /// Insert one row; no idempotence check is performed
    async fn add(&self, user_id: &str, symbol: &str, asset_type: AssetType) -> DashboardResult<()>;

    /// Delete every row matching `(user_id, symbol)`; zero matches is success
    async fn remove(&self, user_id: &str, symbol: &str) -> DashboardResult<()>;
}

/// Per-user preference rows
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn get(&self, user_id: &str) -> DashboardResult<Option<UserPreferences>>;

    /// Insert or update by `user_id`, returning the stored row
    async fn upsert(&self, preferences: &UserPreferences) -> DashboardResult<UserPreferences>;
}

/// Email/password accounts and the sessions issued for them
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Register an account; the caller signs in separately
    async fn sign_up(&self, email: &str, password: &str) -> DashboardResult<User>;

    async fn sign_in(&self, email: &str, password: &str) -> DashboardResult<Session>;

    /// Revoke the session's tokens
    async fn sign_out(&self, session: &Session) -> DashboardResult<()>;

    /// User owning `access_token`; rejected or expired tokens are `Auth` errors
    async fn get_user(&self, access_token: &str) -> DashboardResult<User>;
}

/// Guard for a standing live-update channel
///
/// The channel is released exactly once: on `unsubscribe` or when dropped.
pub struct Subscription {
    label: String,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
    /// Cleared by the channel when it ends on its own
    alive: Option<Arc<AtomicBool>>,
}

impl Subscription {
    pub fn new(label: impl Into<String>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            release: Some(Box::new(release)),
            alive: None,
        }
    }

    /// Report the channel inactive once `alive` is cleared
    pub fn with_liveness(mut self, alive: Arc<AtomicBool>) -> Self {
        self.alive = Some(alive);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Not yet released, and the channel has not ended by itself
    pub fn is_active(&self) -> bool {
        self.release.is_some()
            && self
                .alive
                .as_ref()
                .is_none_or(|alive| alive.load(Ordering::SeqCst))
    }

    /// Release the channel now
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}
