//! HTTP mapping of dashboard errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dashboard_core::{DashboardError, ErrorCode};
use serde::Serialize;
use tracing::{error, warn};

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error carrying a [`DashboardError`]
#[derive(Debug)]
pub struct ApiError(pub DashboardError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        ApiError(err)
    }
}

pub fn status_for(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
        DashboardError::Auth(_) => StatusCode::UNAUTHORIZED,
        DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
        DashboardError::Provider { .. } => StatusCode::BAD_GATEWAY,
        DashboardError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        DashboardError::Config(_) | DashboardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Code sent to a live view for a failed client message
pub fn ws_code_for(err: &DashboardError) -> ErrorCode {
    match err {
        DashboardError::Validation(_) | DashboardError::NotFound(_) => ErrorCode::InvalidMessage,
        DashboardError::Provider { .. } => ErrorCode::ProviderError,
        DashboardError::Store(_) => ErrorCode::StoreError,
        DashboardError::Auth(_) => ErrorCode::Unauthorized,
        DashboardError::Config(_) | DashboardError::Internal(_) => ErrorCode::InternalError,
    }
}

/// Text shown to the client; the variant prefix stays in the logs
pub(crate) fn client_message(err: &DashboardError) -> String {
    match err {
        DashboardError::Provider { message, .. } => message.clone(),
        DashboardError::Store(m)
        | DashboardError::Auth(m)
        | DashboardError::Validation(m)
        | DashboardError::NotFound(m)
        | DashboardError::Config(m)
        | DashboardError::Internal(m) => m.clone(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        (
            status,
            Json(ErrorResponse {
                error: client_message(&self.0),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::Provider;

    #[test]
    fn test_status_per_variant() {
        assert_eq!(status_for(&DashboardError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&DashboardError::auth("x")), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&DashboardError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&DashboardError::provider(Provider::CoinGecko, "x")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_for(&DashboardError::store("x")), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(&DashboardError::config("x")), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_body_carries_bare_message() {
        assert_eq!(
            client_message(&DashboardError::validation("Passwords do not match")),
            "Passwords do not match"
        );
        assert_eq!(
            client_message(&DashboardError::provider(Provider::Polygon, "No data for AAPL")),
            "No data for AAPL"
        );
    }
}
