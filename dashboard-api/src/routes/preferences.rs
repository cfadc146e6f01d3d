//! Preference endpoints (session required)

use axum::{extract::State, routing::get, Json, Router};
use dashboard_core::UserPreferences;
use dashboard_services::PreferencesUpdate;

use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::AppState;

/// Create preference routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/preferences", get(get_preferences).put(update_preferences))
}

/// Stored preferences, or the defaults when the user has none yet
async fn get_preferences(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> ApiResult<Json<UserPreferences>> {
    let preferences = state
        .preferences_service
        .get_or_default(session.user_id())
        .await?;
    Ok(Json(preferences))
}

async fn update_preferences(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(update): Json<PreferencesUpdate>,
) -> ApiResult<Json<UserPreferences>> {
    let preferences = state
        .preferences_service
        .update(session.user_id(), update)
        .await?;
    Ok(Json(preferences))
}
