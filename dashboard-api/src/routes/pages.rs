//! Page routes behind the route guard
//!
//! Dashboard pages answer with the first rendered snapshot of their view;
//! live updates for the same page come over `/ws`.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use dashboard_core::{DashboardError, Session, ViewKind};
use dashboard_services::{GuardDecision, ViewHandle, ViewSnapshot};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::auth::MaybeSession;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardPage {
    pub page: &'static str,
    pub view: ViewKind,
    pub snapshot: ViewSnapshot,
}

/// Create page routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public_page))
        .route("/signin", get(public_page))
        .route("/signup", get(public_page))
        .route("/dashboard", get(overview_page))
        .route("/dashboard/{view}", get(dashboard_page))
        .route("/settings", get(settings_page))
}

/// Apply the guard; `Err` carries the redirect
fn guarded(state: &AppState, uri: &Uri, session: Option<Session>) -> Result<Option<Session>, Response> {
    match state.guard.check(uri.path(), session.is_some()) {
        GuardDecision::Allow => Ok(session),
        GuardDecision::Redirect(location) => {
            debug!("Redirecting {} to {}", uri.path(), location);
            Err((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
    }
}

async fn public_page(State(state): State<AppState>, uri: Uri, MaybeSession(session): MaybeSession) -> Response {
    let session = match guarded(&state, &uri, session) {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    let page = match uri.path() {
        "/signin" => "signin",
        "/signup" => "signup",
        _ => "home",
    };
    Json(json!({
        "page": page,
        "authenticated": session.is_some(),
    }))
    .into_response()
}

async fn overview_page(State(state): State<AppState>, uri: Uri, session: MaybeSession) -> Response {
    render_dashboard(&state, &uri, session, ViewKind::Overview).await
}

async fn dashboard_page(
    State(state): State<AppState>,
    uri: Uri,
    Path(view): Path<String>,
    session: MaybeSession,
) -> Response {
    // "/dashboard/dashboard" is not a page
    match ViewKind::from_str(&view).filter(|k| *k != ViewKind::Overview) {
        Some(kind) => render_dashboard(&state, &uri, session, kind).await,
        None => {
            // Visitors get the sign-in redirect before learning the page is missing
            if let Err(redirect) = guarded(&state, &uri, session.0) {
                return redirect;
            }
            ApiError(DashboardError::not_found(format!("No dashboard page {}", view))).into_response()
        }
    }
}

async fn render_dashboard(state: &AppState, uri: &Uri, MaybeSession(session): MaybeSession, kind: ViewKind) -> Response {
    let session = match guarded(state, uri, session) {
        Ok(Some(session)) => session,
        Ok(None) => return ApiError(DashboardError::auth("Missing access token")).into_response(),
        Err(redirect) => return redirect,
    };

    // Mounted for one render; dropping it stops its tasks
    let view = ViewHandle::mount(state.view_context(), kind, session.user_id()).await;
    Json(DashboardPage {
        page: "dashboard",
        view: kind,
        snapshot: view.snapshot(),
    })
    .into_response()
}

async fn settings_page(State(state): State<AppState>, uri: Uri, MaybeSession(session): MaybeSession) -> ApiResult<Response> {
    let session = match guarded(&state, &uri, session) {
        Ok(Some(session)) => session,
        Ok(None) => return Err(DashboardError::auth("Missing access token").into()),
        Err(redirect) => return Ok(redirect),
    };

    let preferences = state
        .preferences_service
        .get_or_default(session.user_id())
        .await?;
    Ok(Json(json!({
        "page": "settings",
        "user": session.user,
        "preferences": preferences,
    }))
    .into_response())
}
