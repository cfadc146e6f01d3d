//! Process-wide session handling
//!
//! Every sign-up, sign-in, sign-out and token lookup goes through one
//! [`SessionManager`], which caches recently verified sessions and announces
//! sign-outs so mounted views can be torn down.

use std::sync::Arc;
use std::time::Duration;

use dashboard_core::{AuthBackend, DashboardError, DashboardResult, Session, User};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::preferences_service::PreferencesService;

/// Shortest password the hosted auth service accepts
pub const MIN_PASSWORD_LEN: usize = 6;

/// How long a verified token is trusted before the backend is asked again
pub const SESSION_REVALIDATE_AFTER: Duration = Duration::from_secs(60);

/// Result of a sign-up; the session is absent when the automatic sign-in
/// after registration failed
#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

/// Reject a sign-up form before it reaches the network
pub fn validate_sign_up(email: &str, password: &str, confirm_password: &str) -> DashboardResult<()> {
    if password != confirm_password {
        return Err(DashboardError::validation("Passwords do not match"));
    }
    validate_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DashboardError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> DashboardResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DashboardError::validation(format!("Invalid email address: {}", email)))
    }
}

#[derive(Debug, Clone)]
struct CachedSession {
    session: Session,
    verified_at: Instant,
}

pub struct SessionManager {
    auth: Arc<dyn AuthBackend>,
    preferences: Arc<PreferencesService>,
    /// access token -> session verified within `revalidate_after`
    sessions: DashMap<String, CachedSession>,
    revalidate_after: Duration,
    sign_outs: broadcast::Sender<String>,
}

impl SessionManager {
    pub fn new(auth: Arc<dyn AuthBackend>, preferences: Arc<PreferencesService>) -> Self {
        let (sign_outs, _) = broadcast::channel(64);
        Self {
            auth,
            preferences,
            sessions: DashMap::new(),
            revalidate_after: SESSION_REVALIDATE_AFTER,
            sign_outs,
        }
    }

    pub fn with_revalidate_after(mut self, revalidate_after: Duration) -> Self {
        self.revalidate_after = revalidate_after;
        self
    }

    fn cache(&self, session: Session) {
        self.evict_stale();
        self.sessions.insert(
            session.access_token.clone(),
            CachedSession {
                session,
                verified_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries and entries due for revalidation
    fn evict_stale(&self) {
        let revalidate_after = self.revalidate_after;
        self.sessions.retain(|_, cached| {
            !cached.session.is_expired() && cached.verified_at.elapsed() < revalidate_after
        });
    }

    /// Register, create default preferences, then sign in
    pub async fn sign_up(&self, email: &str, password: &str, confirm_password: &str) -> DashboardResult<SignUpOutcome> {
        validate_sign_up(email, password, confirm_password)?;

        let user = self.auth.sign_up(email.trim(), password).await?;

        if let Err(e) = self.preferences.create_defaults(&user.id).await {
            warn!("Failed to create default preferences for {}: {}", user.id, e);
        }

        let session = match self.sign_in(email, password).await {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Sign-in after registration failed for {}: {}", user.id, e);
                None
            }
        };

        Ok(SignUpOutcome { user, session })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> DashboardResult<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(DashboardError::validation("Email and password are required"));
        }

        let session = self.auth.sign_in(email.trim(), password).await?;
        info!("User {} signed in", session.user.id);
        self.cache(session.clone());
        Ok(session)
    }

    /// Revoke the session behind `access_token` and notify its views
    pub async fn sign_out(&self, access_token: &str) -> DashboardResult<()> {
        let session = match self.sessions.remove(access_token) {
            Some((_, cached)) => cached.session,
            None => {
                let user = self.auth.get_user(access_token).await?;
                Session {
                    access_token: access_token.to_string(),
                    refresh_token: None,
                    expires_at: None,
                    user,
                }
            }
        };

        let _ = self.sign_outs.send(session.access_token.clone());
        info!("User {} signed out", session.user.id);
        self.auth.sign_out(&session).await
    }

    /// Session for a presented access token
    ///
    /// A cached session is trusted until its expiry or for `revalidate_after`
    /// since the backend last confirmed it, whichever comes first.
    pub async fn resolve(&self, access_token: &str) -> DashboardResult<Session> {
        if access_token.trim().is_empty() {
            return Err(DashboardError::auth("Missing access token"));
        }

        let cached = self.sessions.get(access_token).map(|c| c.clone());
        if let Some(cached) = &cached {
            if cached.session.is_expired() {
                self.sessions.remove(access_token);
                return Err(DashboardError::auth("Session expired"));
            }
            if cached.verified_at.elapsed() < self.revalidate_after {
                return Ok(cached.session.clone());
            }
            debug!("Revalidating session of {}", cached.session.user.id);
        }

        let user = match self.auth.get_user(access_token).await {
            Ok(user) => user,
            Err(e) => {
                if matches!(e, DashboardError::Auth(_)) {
                    self.sessions.remove(access_token);
                }
                return Err(e);
            }
        };

        let session = match cached {
            Some(cached) => Session { user, ..cached.session },
            None => Session {
                access_token: access_token.to_string(),
                refresh_token: None,
                expires_at: None,
                user,
            },
        };
        self.cache(session.clone());
        Ok(session)
    }

    /// Access tokens as their sessions sign out
    pub fn sign_outs(&self) -> broadcast::Receiver<String> {
        self.sign_outs.subscribe()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
