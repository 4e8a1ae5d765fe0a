//! Post endpoints: public reads, owner-guarded writes.

use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::api::AppState;
use crate::auth::AuthIdentity;
use crate::error::ApiError;
use crate::ownership::require_owner;
use crate::store::{NewPost, PostQuery, PostRecord, PostUpdate};
use crate::types::{IdentityId, PostId};

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 1000;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub user_id: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    /// Declared owner; must equal the verified caller.
    pub user_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
}

/// `GET /posts` — newest first, skip/limit pagination, optional owner and
/// tag filters.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PostRecord>>, ApiError> {
    let query = PostQuery {
        // Clamp into i64 range: both backends take the offset as a signed
        // integer, and a skip past the end is just an empty page.
        skip: params.skip.unwrap_or(0).min(i64::MAX as u64),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        user_id: params.user_id,
        tag: params.tag,
    };
    let posts = state.store.list_posts(query).await?;
    Ok(Json(posts))
}

/// `GET /posts/count`
pub async fn count(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let count = state.store.count_posts().await?;
    Ok(Json(json!({ "count": count })))
}

/// `GET /posts/{id}` — a malformed id behaves exactly like an absent one.
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostRecord>, ApiError> {
    let post = state
        .store
        .find_post_by_id(&PostId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    Ok(Json(post))
}

/// `POST /posts` — the body's declared owner must be the verified caller.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthIdentity>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostRecord>), ApiError> {
    let declared = IdentityId::new(req.user_id);
    require_owner(auth.identity_id(), &declared, "user_id mismatch")?;

    let post = state
        .store
        .insert_post(NewPost::new(
            req.title,
            req.content,
            declared,
            req.tags,
            req.image_url,
        ))
        .await?;

    info!(post = %post.id, owner = %post.user_id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// `PUT /posts/{id}` — 404 before 403: the existence check runs first, the
/// ownership check only on a post that exists. The owner field itself is
/// never writable.
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthIdentity>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostRecord>, ApiError> {
    let post_id = PostId::new(id);
    let existing = state
        .store
        .find_post_by_id(&post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    require_owner(
        auth.identity_id(),
        &IdentityId::new(existing.user_id),
        "Not your post",
    )?;

    let update = PostUpdate {
        title: req.title,
        content: req.content,
        tags: req.tags,
        image_url: req.image_url,
    };

    let updated = state
        .store
        .update_post(&post_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    Ok(Json(updated))
}

/// `DELETE /posts/{id}`
pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthIdentity>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let post_id = PostId::new(id);
    let existing = state
        .store
        .find_post_by_id(&post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    require_owner(
        auth.identity_id(),
        &IdentityId::new(existing.user_id),
        "Not your post",
    )?;

    state.store.delete_post(&post_id).await?;
    info!(post = %post_id, "post deleted");
    Ok(Json(json!({ "detail": "Post deleted" })))
}
