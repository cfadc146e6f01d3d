//! Email/password accounts against the hosted auth service

use async_trait::async_trait;
use dashboard_core::{AuthBackend, DashboardError, DashboardResult, Session, User};
use reqwest::Method;
use tracing::{debug, info, instrument};

use crate::client::{send, Rejection, SupabaseClient};
use crate::types::{AuthResponse, AuthUser, PasswordCredentials, SignUpResponse};

#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    client: SupabaseClient,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn rejected(what: &str, rejection: Rejection) -> DashboardError {
        if rejection.status.is_server_error() {
            DashboardError::store(format!("Auth service failed to {}: {}", what, rejection.message))
        } else {
            DashboardError::auth(rejection.message)
        }
    }
}

#[async_trait]
impl AuthBackend for SupabaseAuth {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> DashboardResult<User> {
        let url = self.client.url(&["auth", "v1", "signup"], &[]);
        let request = self
            .client
            .request(Method::POST, url, self.client.anon_key())
            .json(&PasswordCredentials { email, password });

        let response = send(request, "sign up")
            .await?
            .map_err(|r| Self::rejected("sign up", r))?;

        let user = response
            .json::<SignUpResponse>()
            .await
            .map_err(|e| DashboardError::auth(format!("Unexpected sign-up response: {}", e)))?
            .into_user();

        info!("Registered user {}", user.id);
        Ok(user)
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> DashboardResult<Session> {
        let url = self
            .client
            .url(&["auth", "v1", "token"], &[("grant_type", "password")]);
        let request = self
            .client
            .request(Method::POST, url, self.client.anon_key())
            .json(&PasswordCredentials { email, password });

        let response = send(request, "sign in")
            .await?
            .map_err(|r| Self::rejected("sign in", r))?;

        let session = response
            .json::<AuthResponse>()
            .await
            .map_err(|e| DashboardError::auth(format!("Unexpected sign-in response: {}", e)))?
            .into_session();

        self.client.remember_token(&session.user.id, &session.access_token);
        debug!("Signed in user {}", session.user.id);
        Ok(session)
    }

    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    async fn sign_out(&self, session: &Session) -> DashboardResult<()> {
        // Rows stop using the token even when the revoke call fails
        self.client.forget_token(&session.access_token);

        let url = self.client.url(&["auth", "v1", "logout"], &[]);
        let request = self
            .client
            .request(Method::POST, url, &session.access_token);

        send(request, "sign out")
            .await?
            .map_err(|r| Self::rejected("sign out", r))?;
        Ok(())
    }

    #[instrument(skip(self, access_token))]
    async fn get_user(&self, access_token: &str) -> DashboardResult<User> {
        let url = self.client.url(&["auth", "v1", "user"], &[]);
        let request = self.client.request(Method::GET, url, access_token);

        let response = match send(request, "read session").await? {
            Ok(response) => response,
            Err(rejection) => {
                if !rejection.status.is_server_error() {
                    self.client.forget_token(access_token);
                }
                return Err(Self::rejected("read session", rejection));
            }
        };

        let user: User = response
            .json::<AuthUser>()
            .await
            .map_err(|e| DashboardError::auth(format!("Unexpected user response: {}", e)))?
            .into();

        self.client.remember_token(&user.id, access_token);
        Ok(user)
    }
}
