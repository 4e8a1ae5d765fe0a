//! API error taxonomy and its mapping to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

use crate::store::StoreError;

/// Errors surfaced to API callers.
///
/// Every variant maps to one HTTP status. Token-verification failures are
/// collapsed into `Unauthenticated` before they reach this type so the
/// response never reveals which validation step failed.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Missing, malformed, or invalid credential
    Unauthenticated,
    /// Login failed; unknown email and wrong password are indistinguishable
    InvalidCredentials,
    /// Valid identity, but not the owner of the target resource
    Forbidden(String),
    /// Target resource does not exist
    NotFound(String),
    /// Write conflicts with existing state (duplicate email)
    Conflict(String),
    /// Malformed input (e.g. weak password)
    Invalid(String),
    /// Storage or other internal fault; details are logged, not returned
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Not authenticated"),
            Self::InvalidCredentials => write!(f, "Invalid email or password"),
            Self::Forbidden(msg) => write!(f, "{}", msg),
            Self::NotFound(msg) => write!(f, "{}", msg),
            Self::Conflict(msg) => write!(f, "{}", msg),
            Self::Invalid(msg) => write!(f, "{}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match &self {
            // Never echo internal details to the caller.
            Self::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}
