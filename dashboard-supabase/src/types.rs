//! Hosted backend wire types
//!
//! Auth responses, PostgREST request bodies and Phoenix channel frames.

use chrono::{DateTime, Duration, Utc};
use dashboard_core::{AssetType, Session, User};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<AuthUser> for User {
    fn from(user: AuthUser) -> Self {
        User {
            id: user.id,
            email: user.email,
        }
    }
}

/// Token grant returned by sign-in (and by sign-up when confirmation is off)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,

    /// Expiry as a Unix timestamp in seconds
    #[serde(default)]
    pub expires_at: Option<i64>,

    pub user: AuthUser,
}

impl AuthResponse {
    pub fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

/// Sign-up answers with a session, or with the bare user while the email
/// address awaits confirmation
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(AuthResponse),
    User(AuthUser),
}

impl SignUpResponse {
    pub fn into_user(self) -> User {
        match self {
            SignUpResponse::Session(grant) => grant.user.into(),
            SignUpResponse::User(user) => user.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Error body from either the auth service or the table API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ApiError {
    /// Most specific human-readable message in the body
    pub fn describe(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
    }
}

// ============================================================================
// Tables
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct NewWatchlistRow<'a> {
    pub user_id: &'a str,
    pub symbol: &'a str,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
}

// ============================================================================
// Realtime (Phoenix channels, vsn 1.0.0)
// ============================================================================

/// Topic used for socket-level heartbeats
pub const PHOENIX_TOPIC: &str = "phoenix";

pub mod events {
    pub const JOIN: &str = "phx_join";
    pub const LEAVE: &str = "phx_leave";
    pub const REPLY: &str = "phx_reply";
    pub const ERROR: &str = "phx_error";
    pub const CLOSE: &str = "phx_close";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const POSTGRES_CHANGES: &str = "postgres_changes";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    pub fn new(topic: impl Into<String>, event: &str, payload: Value, reference: u64) -> Self {
        Self {
            topic: topic.into(),
            event: event.to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }

    /// `status` of a `phx_reply` payload
    pub fn reply_status(&self) -> Option<&str> {
        if self.event != events::REPLY {
            return None;
        }
        self.payload.get("status").and_then(Value::as_str)
    }
}

/// Row-change filter attached to a channel join
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostgresChangesFilter {
    pub event: String,
    pub schema: String,
    pub table: String,
    pub filter: String,
}

impl PostgresChangesFilter {
    /// Every change to `table` rows owned by `user_id`
    pub fn owned_rows(table: &str, user_id: &str) -> Self {
        Self {
            event: "*".to_string(),
            schema: "public".to_string(),
            table: table.to_string(),
            filter: format!("user_id=eq.{}", user_id),
        }
    }
}
