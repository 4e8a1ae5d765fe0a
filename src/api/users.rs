//! User-account endpoints: public profile reads, self-service writes.

use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::api::AppState;
use crate::auth::AuthIdentity;
use crate::error::ApiError;
use crate::ownership::require_owner;
use crate::store::{IdentityRecord, IdentityUpdate};
use crate::types::{EmailAddress, IdentityId};

/// Public view of an identity. The password hash never appears here.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<IdentityRecord> for UserResponse {
    fn from(record: IdentityRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            profile_picture_url: record.profile_picture_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// `GET /users/count`
pub async fn count(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let count = state.store.count_identities().await?;
    Ok(Json(json!({ "count": count })))
}

/// `GET /users/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let record = state
        .store
        .find_identity_by_id(&IdentityId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(record.into()))
}

/// `PUT /users/{id}` — self-service only; covers name, email, and picture.
/// The password never changes through this route.
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthIdentity>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let target = IdentityId::new(id);
    require_owner(
        auth.identity_id(),
        &target,
        "You can only update your own profile",
    )?;

    let update = IdentityUpdate {
        name: req.name,
        email: req.email.as_deref().map(EmailAddress::normalized),
        profile_picture_url: req.profile_picture_url,
    };

    let record = state
        .store
        .update_identity(&target, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(record.into()))
}

/// `DELETE /users/{id}` — self-service only. Existing posts keep their
/// owner id; they become orphaned rather than cascade-deleted.
pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthIdentity>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let target = IdentityId::new(id);
    require_owner(
        auth.identity_id(),
        &target,
        "You can only delete your own account",
    )?;

    let removed = state.store.delete_identity(&target).await?;
    if !removed {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(identity = %target, "identity deleted");
    Ok(Json(json!({ "detail": "Account deleted" })))
}
