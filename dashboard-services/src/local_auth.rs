//! In-process accounts for development without a hosted auth service

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashboard_core::{AuthBackend, DashboardError, DashboardResult, Session, User};
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

/// Lifetime of a locally issued access token
const SESSION_TTL_HOURS: i64 = 1;

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

/// Email/password accounts held in memory; lost on restart
#[derive(Debug, Default)]
pub struct LocalAuth {
    /// lower-cased email -> account
    accounts: DashMap<String, Account>,
    /// access token -> session
    sessions: DashMap<String, Session>,
}

impl LocalAuth {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthBackend for LocalAuth {
    async fn sign_up(&self, email: &str, password: &str) -> DashboardResult<User> {
        let key = email.trim().to_lowercase();
        if self.accounts.contains_key(&key) {
            return Err(DashboardError::auth("User already registered"));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: Some(email.trim().to_string()),
        };
        self.accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        info!("Registered local user {}", user.id);
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> DashboardResult<Session> {
        let account = self
            .accounts
            .get(&email.trim().to_lowercase())
            .map(|a| a.clone())
            .filter(|a| a.password == password)
            .ok_or_else(|| DashboardError::auth("Invalid login credentials"))?;

        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Some(Uuid::new_v4().to_string()),
            expires_at: Some(Utc::now() + Duration::hours(SESSION_TTL_HOURS)),
            user: account.user,
        };
        self.sessions
            .insert(session.access_token.clone(), session.clone());
        Ok(session)
    }

    async fn sign_out(&self, session: &Session) -> DashboardResult<()> {
        self.sessions.remove(&session.access_token);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> DashboardResult<User> {
        let session = self
            .sessions
            .get(access_token)
            .map(|s| s.clone())
            .ok_or_else(|| DashboardError::auth("Invalid or unknown access token"))?;

        if session.is_expired() {
            self.sessions.remove(access_token);
            return Err(DashboardError::auth("Session expired"));
        }
        Ok(session.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_sign_in_lookup() {
        let auth = LocalAuth::new();
        let user = auth.sign_up("Trader@Example.com", "hunter22").await.unwrap();

        let session = auth.sign_in("trader@example.com", "hunter22").await.unwrap();
        assert_eq!(session.user.id, user.id);
        assert!(!session.is_expired());

        let resolved = auth.get_user(&session.access_token).await.unwrap();
        assert_eq!(resolved.id, user.id);

        auth.sign_out(&session).await.unwrap();
        assert!(auth.get_user(&session.access_token).await.is_err());
    }

    #[tokio::test]
    async fn test_rejections_are_auth_errors() {
        let auth = LocalAuth::new();
        auth.sign_up("a@b.co", "secret1").await.unwrap();

        let duplicate = auth.sign_up("A@B.co", "other").await.unwrap_err();
        assert!(matches!(duplicate, DashboardError::Auth(_)));

        let wrong = auth.sign_in("a@b.co", "nope").await.unwrap_err();
        assert_eq!(wrong, DashboardError::auth("Invalid login credentials"));

        let forged = auth.get_user("forged").await.unwrap_err();
        assert!(matches!(forged, DashboardError::Auth(_)));
    }
}
