//! Identity extraction middleware for authenticated routes.
//!
//! Runs once per inbound request on routes that require authentication.
//! The progression is strictly linear: header present → bearer-shaped →
//! signature and expiry valid → identity bound to the request. Any failure
//! is terminal for that request and surfaces as a generic 401.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::api::AppState;
use crate::auth::AuthIdentity;
use crate::error::ApiError;

/// Pull the bearer credential out of a raw `Authorization` header value.
fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Middleware applied to every route that mutates state.
///
/// On success the verified [`AuthIdentity`] is inserted into the request's
/// extensions for handlers to read. Ownership checks (403) happen later,
/// inside handlers, and only for requests that pass this gate.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = bearer_token(header).ok_or(ApiError::Unauthenticated)?;

    let identity_id = state.tokens.verify(token).map_err(|e| {
        debug!("token rejected: {}", e);
        ApiError::Unauthenticated
    })?;

    debug!(identity = %identity_id, "request authenticated");
    req.extensions_mut().insert(AuthIdentity::new(identity_id));
    Ok(next.run(req).await)
}
