use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::sessions::MAX_ACTIVE_SESSIONS;

/// Error taxonomy shared by every handler. Variants carrying an
/// `anyhow::Error` are logged server-side and masked with a fixed
/// message in the response body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Session expired. Please log in again.")]
    TokenExpired,

    #[error("{0}")]
    Gone(String),

    #[error(
        "You already have {} active sessions. Log out from another device to continue.",
        MAX_ACTIVE_SESSIONS
    )]
    SessionCap,

    #[error("{0}")]
    Conflict(String),

    #[error("Database is temporarily unavailable.")]
    Store(anyhow::Error),

    #[error("Upstream service request failed.")]
    Upstream(anyhow::Error),

    #[error("Upstream service timed out.")]
    UpstreamTimeout(anyhow::Error),

    #[error("Something went wrong. Please try again later.")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::SessionCap | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            // third-party failures surface as 500, timeouts as 504
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn store(err: impl Into<anyhow::Error>) -> Self {
        ApiError::Store(err.into())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Store(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(e) | ApiError::Upstream(e) | ApiError::UpstreamTimeout(e) => {
                error!(error = %e, "request failed");
            }
            ApiError::Internal(e) => {
                error!(error = %e, "unhandled error");
            }
            _ => {}
        }
        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cap_message_names_the_limit() {
        let msg = ApiError::SessionCap.to_string();
        assert!(msg.contains("5 active sessions"));
        assert_eq!(ApiError::SessionCap.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn expired_token_is_distinct_from_generic_unauthorized() {
        let expired = ApiError::TokenExpired;
        let generic = ApiError::Unauthorized("Invalid session.".into());
        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(generic.status(), StatusCode::UNAUTHORIZED);
        assert_ne!(expired.to_string(), generic.to_string());
    }

    #[test]
    fn upstream_failures_map_to_500_and_timeouts_to_504() {
        let failed = ApiError::Upstream(anyhow::anyhow!("connect error (api.example.com)"));
        let timed_out = ApiError::UpstreamTimeout(anyhow::anyhow!("deadline elapsed"));
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(timed_out.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(!failed.to_string().contains("api.example.com"));
    }

    #[test]
    fn store_errors_mask_the_underlying_cause() {
        let err = ApiError::store(anyhow::anyhow!("connection refused (10.0.0.3:5432)"));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.to_string().contains("10.0.0.3"));
    }
}
