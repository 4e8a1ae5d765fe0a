//! Storage capability interface shared by both backend adapters.
//!
//! The document-store ([`document::DocumentStore`]) and relational-store
//! ([`relational::RelationalStore`]) adapters implement [`Store`] with
//! backend-native queries but identical external semantics: duplicate email
//! at insert is a typed [`StoreError::Conflict`], absent rows are `None`
//! (never an error), and listings are newest-first with skip/limit
//! pagination. One adapter is constructed at startup and shared behind
//! `Arc<dyn Store>`; nothing branches on the backend per request.

pub mod document;
pub mod relational;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::{EmailAddress, IdentityId, PostId};

pub use document::DocumentStore;
pub use relational::RelationalStore;

/// Errors surfaced by storage adapters.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// A write conflicts with existing state (duplicate email)
    Conflict(String),
    /// Backend-level failure (connection, query, serialization)
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict(msg) => write!(f, "conflict: {}", msg),
            Self::Backend(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Mint a new opaque record id.
///
/// Hyphen-free hex so the same id format is valid in both backends and in
/// URL paths.
fn new_record_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Persisted representation of an identity (user account).
///
/// `password_hash` never leaves the storage/auth layers; API responses are
/// built from separate response types.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IdentityRecord {
    /// Opaque identifier, identical format on both backends.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Case-normalized email, unique across all identities.
    pub email: String,
    /// Argon2id hash of the password.
    pub password_hash: String,
    /// Optional profile-picture reference.
    pub profile_picture_url: Option<String>,
    /// When the identity was created.
    pub created_at: DateTime<Utc>,
    /// When the identity was last updated, if ever.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for inserting a new identity.
#[derive(Debug, Clone, Serialize)]
pub struct NewIdentity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl NewIdentity {
    /// Build an insert payload, minting the id and creation timestamp here
    /// so both adapters persist exactly the same values.
    pub fn new(name: String, email: EmailAddress, password_hash: String) -> Self {
        Self {
            id: new_record_id(),
            name,
            email: email.into_inner(),
            password_hash,
            created_at: Utc::now(),
        }
    }

    /// The record this payload will produce once persisted.
    pub fn into_record(self) -> IdentityRecord {
        IdentityRecord {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            profile_picture_url: None,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

/// Partial update of an identity's public profile.
///
/// Name, email, and picture only; the password never changes via this path.
#[derive(Debug, Clone, Default)]
pub struct IdentityUpdate {
    pub name: Option<String>,
    pub email: Option<EmailAddress>,
    pub profile_picture_url: Option<String>,
}

/// Persisted representation of a post.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostRecord {
    /// Opaque identifier, identical format on both backends.
    pub id: String,
    /// Title of the post.
    pub title: String,
    /// Body content.
    pub content: String,
    /// Owning identity id. Immutable once set: no operation changes it.
    pub user_id: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Optional image reference.
    pub image_url: Option<String>,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated, if ever.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for inserting a new post.
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub user_id: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewPost {
    /// Build an insert payload with a minted id and creation timestamp.
    pub fn new(
        title: String,
        content: String,
        owner: IdentityId,
        tags: Vec<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: new_record_id(),
            title,
            content,
            user_id: owner.into_inner(),
            tags,
            image_url,
            created_at: Utc::now(),
        }
    }

    /// The record this payload will produce once persisted.
    pub fn into_record(self) -> PostRecord {
        PostRecord {
            id: self.id,
            title: self.title,
            content: self.content,
            user_id: self.user_id,
            tags: self.tags,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

/// Partial update of a post's content fields. The owner is never touched.
/// An update with no fields set still refreshes `updated_at`.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
}

/// Listing parameters for posts: newest first, skip/limit pagination,
/// optional owner and tag filters.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub skip: u64,
    pub limit: u64,
    pub user_id: Option<String>,
    pub tag: Option<String>,
}

/// The persistence contract shared by both backend adapters.
#[async_trait]
pub trait Store: Send + Sync {
    // Identities

    async fn find_identity_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<IdentityRecord>, StoreError>;

    async fn find_identity_by_id(
        &self,
        id: &IdentityId,
    ) -> Result<Option<IdentityRecord>, StoreError>;

    /// Insert a new identity. Duplicate email surfaces as
    /// [`StoreError::Conflict`].
    async fn insert_identity(&self, new: NewIdentity) -> Result<IdentityRecord, StoreError>;

    /// Apply a partial profile update. Returns the updated record, or `None`
    /// when the identity does not exist. A duplicate email is a `Conflict`.
    async fn update_identity(
        &self,
        id: &IdentityId,
        update: IdentityUpdate,
    ) -> Result<Option<IdentityRecord>, StoreError>;

    /// Delete an identity. Returns whether a record was removed.
    async fn delete_identity(&self, id: &IdentityId) -> Result<bool, StoreError>;

    async fn count_identities(&self) -> Result<u64, StoreError>;

    // Posts

    async fn find_post_by_id(&self, id: &PostId) -> Result<Option<PostRecord>, StoreError>;

    /// List posts newest-first with skip/limit and optional filters.
    async fn list_posts(&self, query: PostQuery) -> Result<Vec<PostRecord>, StoreError>;

    async fn insert_post(&self, new: NewPost) -> Result<PostRecord, StoreError>;

    /// Apply a partial content update. Returns the updated record, or `None`
    /// when the post does not exist.
    async fn update_post(
        &self,
        id: &PostId,
        update: PostUpdate,
    ) -> Result<Option<PostRecord>, StoreError>;

    /// Delete a post. Returns whether a record was removed.
    async fn delete_post(&self, id: &PostId) -> Result<bool, StoreError>;

    async fn count_posts(&self) -> Result<u64, StoreError>;
}
