//! Shared HTTP plumbing for the hosted backend
//!
//! Holds the project URL, the public API key and the access tokens of the
//! users signed in through this process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashboard_core::{DashboardError, DashboardResult};
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::types::ApiError;

#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public (anon) API key
    pub anon_key: String,
    pub timeout: Duration,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Sessions remembered per user; the oldest is forgotten beyond this
const MAX_TOKENS_PER_USER: usize = 8;

/// Hosted backend client shared by the auth service and the stores
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: Url,
    anon_key: String,
    /// user_id -> access tokens of that user's live sessions, most recently
    /// confirmed last
    tokens: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> DashboardResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DashboardError::internal(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.url)
            .map_err(|e| DashboardError::config(format!("Invalid backend URL {}: {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DashboardError::config(format!("Invalid backend URL: {}", config.url)));
        }
        if config.anon_key.trim().is_empty() {
            return Err(DashboardError::config("Backend API key must not be empty"));
        }

        Ok(Self {
            http,
            base_url,
            anon_key: config.anon_key,
            tokens: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Use `access_token` for row access on behalf of `user_id`
    pub fn remember_token(&self, user_id: &str, access_token: &str) {
        let mut tokens = self.tokens.write();
        let held = tokens.entry(user_id.to_string()).or_default();
        held.retain(|token| token != access_token);
        held.push(access_token.to_string());
        if held.len() > MAX_TOKENS_PER_USER {
            held.remove(0);
        }
    }

    /// Stop using one session's token; the user's other sessions are kept
    pub fn forget_token(&self, access_token: &str) {
        let mut tokens = self.tokens.write();
        tokens.retain(|_, held| {
            held.retain(|token| token != access_token);
            !held.is_empty()
        });
    }

    /// Bearer used for `user_id`'s rows: the most recently confirmed session,
    /// the API key when the user has none
    pub fn bearer_for(&self, user_id: &str) -> String {
        self.tokens
            .read()
            .get(user_id)
            .and_then(|held| held.last().cloned())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    pub(crate) fn url(&self, segments: &[&str], params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    /// WebSocket endpoint of the realtime service
    pub(crate) fn realtime_url(&self) -> DashboardResult<Url> {
        let mut url = self.url(
            &["realtime", "v1", "websocket"],
            &[("apikey", self.anon_key.as_str()), ("vsn", "1.0.0")],
        );
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| DashboardError::config(format!("Cannot derive realtime URL from {}", self.base_url)))?;
        Ok(url)
    }

    /// Request carrying the API key and `bearer` as authorization
    pub(crate) fn request(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        debug!("{} {}", method, url.path());
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url.as_str())
            .field("signed_in_users", &self.tokens.read().len())
            .finish()
    }
}

/// Non-2xx answer from the backend
pub(crate) struct Rejection {
    pub status: StatusCode,
    pub message: String,
}

/// Send `request`; transport failures are store errors, rejections are
/// returned for the caller to classify
pub(crate) async fn send(request: RequestBuilder, what: &str) -> DashboardResult<Result<Response, Rejection>> {
    let response = request
        .send()
        .await
        .map_err(|e| DashboardError::store(format!("Failed to {}: {}", what, e)))?;

    let status = response.status();
    if status.is_success() {
        return Ok(Ok(response));
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .ok()
        .and_then(|e| e.describe().map(str::to_string))
        .unwrap_or(body);
    Ok(Err(Rejection { status, message }))
}

/// Table call: every failure is a store error
pub(crate) async fn rest_call(request: RequestBuilder, what: &str) -> DashboardResult<Response> {
    send(request, what).await?.map_err(|rejection| {
        DashboardError::store(format!(
            "Failed to {} ({}): {}",
            what, rejection.status, rejection.message
        ))
    })
}

pub(crate) async fn rest_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> DashboardResult<T> {
    rest_call(request, what)
        .await?
        .json()
        .await
        .map_err(|e| DashboardError::store(format!("Failed to parse {} response: {}", what, e)))
}
