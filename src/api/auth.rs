//! Signup and login endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::AppState;
use crate::auth::password;
use crate::error::ApiError;
use crate::store::NewIdentity;
use crate::types::{EmailAddress, IdentityId};

/// Passwords shorter than this are rejected at signup.
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued on successful signup or login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
}

/// `POST /auth/signup`
///
/// Creates an identity and issues a token in one step. Duplicate email is a
/// 409; the pre-check keeps the common case friendly, and the storage-level
/// unique index closes the race.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Invalid(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let email = EmailAddress::normalized(&req.email);
    if state.store.find_identity_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "An account with that email already exists".to_string(),
        ));
    }

    let hash = password::hash(&req.password)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?;

    let record = state
        .store
        .insert_identity(NewIdentity::new(req.name, email, hash))
        .await?;

    let identity_id = IdentityId::new(record.id.clone());
    let token = state
        .tokens
        .issue(&identity_id, &record.email)
        .map_err(|e| ApiError::Internal(format!("token issuance failed: {}", e)))?;

    info!(identity = %identity_id, "identity created");

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token: token,
            token_type: "bearer".to_string(),
            user_id: record.id,
            name: record.name,
            email: record.email,
        }),
    ))
}

/// `POST /auth/login`
///
/// Unknown email and wrong password produce the identical 401 so callers
/// cannot probe which addresses are registered.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = EmailAddress::normalized(&req.email);
    let record = state
        .store
        .find_identity_by_email(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !password::verify(&req.password, &record.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let identity_id = IdentityId::new(record.id.clone());
    let token = state
        .tokens
        .issue(&identity_id, &record.email)
        .map_err(|e| ApiError::Internal(format!("token issuance failed: {}", e)))?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user_id: record.id,
        name: record.name,
        email: record.email,
    }))
}
