//! Sign-up, sign-in and sign-out endpoints
//!
//! Successful sign-ins set the session cookie so page routes and the live
//! view socket recognise the browser without an `Authorization` header.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use dashboard_core::{DashboardError, Session, User};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{access_token, MaybeSession, SESSION_COOKIE};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(alias = "confirmPassword")]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: Option<User>,
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
        .route("/auth/session", get(current_session))
}

async fn sign_up(State(state): State<AppState>, Json(body): Json<SignUpRequest>) -> ApiResult<Response> {
    let outcome = state
        .sessions
        .sign_up(&body.email, &body.password, &body.confirm_password)
        .await?;
    info!("Registered user {}", outcome.user.id);

    let cookie = outcome.session.as_ref().map(session_cookie);
    let mut response = (StatusCode::CREATED, Json(outcome)).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

async fn sign_in(State(state): State<AppState>, Json(body): Json<SignInRequest>) -> ApiResult<Response> {
    let session = state.sessions.sign_in(&body.email, &body.password).await?;
    let cookie = session_cookie(&session);

    let mut response = Json(session).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let token = access_token(&headers).ok_or_else(|| DashboardError::auth("Missing access token"))?;
    state.sessions.sign_out(&token).await?;

    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_static("sb-access-token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    Ok(response)
}

async fn current_session(MaybeSession(session): MaybeSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: session.is_some(),
        user: session.map(|s| s.user),
    })
}

fn session_cookie(session: &Session) -> HeaderValue {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session.access_token
    );
    if let Some(expires_at) = session.expires_at {
        let max_age = (expires_at - Utc::now()).num_seconds().max(0);
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    // Tokens are opaque ASCII; anything else leaves the cookie unset
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("sb-access-token=; Path=/; Max-Age=0"))
}
