//! Relational-store adapter backed by PostgreSQL via sqlx.
//!
//! Uses a bounded connection pool created at startup. The schema mirrors
//! the document adapter's shape field for field; deliberately no foreign
//! key from posts to identities, so deleting an identity behaves the same
//! on both backends (existing posts keep their owner id, as the document
//! store does).

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::RelationalConfig;
use crate::store::{
    IdentityRecord, IdentityUpdate, NewIdentity, NewPost, PostQuery, PostRecord, PostUpdate,
    Store, StoreError,
};
use crate::types::{EmailAddress, IdentityId, PostId};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS identities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    profile_picture_url TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ
);
CREATE UNIQUE INDEX IF NOT EXISTS identity_email ON identities (email);

CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    user_id TEXT NOT NULL,
    tags TEXT[] NOT NULL DEFAULT '{}',
    image_url TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ
);
CREATE INDEX IF NOT EXISTS post_owner ON posts (user_id);
CREATE INDEX IF NOT EXISTS post_created_at ON posts (created_at DESC);
"#;

const IDENTITY_COLUMNS: &str =
    "id, name, email, password_hash, profile_picture_url, created_at, updated_at";
const POST_COLUMNS: &str =
    "id, title, content, user_id, tags, image_url, created_at, updated_at";

fn backend_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Map a write error, turning unique violations (email index) into `Conflict`.
fn write_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict("An account with that email already exists".to_string());
        }
    }
    StoreError::Backend(e.to_string())
}

/// PostgreSQL-backed implementation of the storage contract.
#[derive(Clone)]
pub struct RelationalStore {
    pool: PgPool,
}

impl RelationalStore {
    /// Connect with a bounded pool and bootstrap the schema.
    pub async fn connect(config: RelationalConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!("relational store ready");
        Ok(store)
    }

    /// Create tables and indexes. Idempotent.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for RelationalStore {
    async fn find_identity_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        let sql = format!("SELECT {} FROM identities WHERE email = $1", IDENTITY_COLUMNS);
        sqlx::query_as::<_, IdentityRecord>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)
    }

    async fn find_identity_by_id(
        &self,
        id: &IdentityId,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        let sql = format!("SELECT {} FROM identities WHERE id = $1", IDENTITY_COLUMNS);
        sqlx::query_as::<_, IdentityRecord>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)
    }

    async fn insert_identity(&self, new: NewIdentity) -> Result<IdentityRecord, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO identities (id, name, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&new.id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(new.into_record())
    }

    async fn update_identity(
        &self,
        id: &IdentityId,
        update: IdentityUpdate,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        // Dynamic SET clause over the fields that are present; $1 is always
        // updated_at, the id is always the last parameter.
        let mut sets = vec!["updated_at = $1".to_string()];
        let mut next_param = 2;
        for field in ["name", "email", "profile_picture_url"] {
            let present = match field {
                "name" => update.name.is_some(),
                "email" => update.email.is_some(),
                _ => update.profile_picture_url.is_some(),
            };
            if present {
                sets.push(format!("{} = ${}", field, next_param));
                next_param += 1;
            }
        }

        let sql = format!(
            "UPDATE identities SET {} WHERE id = ${} RETURNING {}",
            sets.join(", "),
            next_param,
            IDENTITY_COLUMNS
        );

        let mut query = sqlx::query_as::<_, IdentityRecord>(&sql).bind(Utc::now());
        if let Some(name) = &update.name {
            query = query.bind(name);
        }
        if let Some(email) = &update.email {
            query = query.bind(email.as_str());
        }
        if let Some(picture) = &update.profile_picture_url {
            query = query.bind(picture);
        }

        query
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(write_err)
    }

    async fn delete_identity(&self, id: &IdentityId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_identities(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM identities")
            .fetch_one(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(count as u64)
    }

    async fn find_post_by_id(&self, id: &PostId) -> Result<Option<PostRecord>, StoreError> {
        let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);
        sqlx::query_as::<_, PostRecord>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)
    }

    async fn list_posts(&self, query: PostQuery) -> Result<Vec<PostRecord>, StoreError> {
        let mut conditions = Vec::new();
        let mut next_param = 1;
        if query.user_id.is_some() {
            conditions.push(format!("user_id = ${}", next_param));
            next_param += 1;
        }
        if query.tag.is_some() {
            conditions.push(format!("${} = ANY(tags)", next_param));
            next_param += 1;
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM posts {}ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            POST_COLUMNS,
            where_clause,
            next_param,
            next_param + 1
        );

        let mut q = sqlx::query_as::<_, PostRecord>(&sql);
        if let Some(user_id) = &query.user_id {
            q = q.bind(user_id);
        }
        if let Some(tag) = &query.tag {
            q = q.bind(tag);
        }

        // Saturate: a skip/limit beyond i64::MAX must stay a valid (empty)
        // page, not wrap into a negative OFFSET that Postgres rejects.
        q.bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(query.skip).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)
    }

    async fn insert_post(&self, new: NewPost) -> Result<PostRecord, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, title, content, user_id, tags, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&new.id)
        .bind(&new.title)
        .bind(&new.content)
        .bind(&new.user_id)
        .bind(&new.tags)
        .bind(&new.image_url)
        .bind(new.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(new.into_record())
    }

    async fn update_post(
        &self,
        id: &PostId,
        update: PostUpdate,
    ) -> Result<Option<PostRecord>, StoreError> {
        let mut sets = vec!["updated_at = $1".to_string()];
        let mut next_param = 2;
        if update.title.is_some() {
            sets.push(format!("title = ${}", next_param));
            next_param += 1;
        }
        if update.content.is_some() {
            sets.push(format!("content = ${}", next_param));
            next_param += 1;
        }
        if update.tags.is_some() {
            sets.push(format!("tags = ${}", next_param));
            next_param += 1;
        }
        if update.image_url.is_some() {
            sets.push(format!("image_url = ${}", next_param));
            next_param += 1;
        }

        let sql = format!(
            "UPDATE posts SET {} WHERE id = ${} RETURNING {}",
            sets.join(", "),
            next_param,
            POST_COLUMNS
        );

        let mut query = sqlx::query_as::<_, PostRecord>(&sql).bind(Utc::now());
        if let Some(title) = &update.title {
            query = query.bind(title);
        }
        if let Some(content) = &update.content {
            query = query.bind(content);
        }
        if let Some(tags) = &update.tags {
            query = query.bind(tags);
        }
        if let Some(image_url) = &update.image_url {
            query = query.bind(image_url);
        }

        query
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)
    }

    async fn delete_post(&self, id: &PostId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_posts(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(count as u64)
    }
}

// These run against a live PostgreSQL at DATABASE_URL (`cargo test --
// --ignored`). Every test mints its own emails and owner ids, so they are
// safe to run in parallel against a shared database.
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    async fn setup_test_store() -> RelationalStore {
        RelationalStore::connect(RelationalConfig::default())
            .await
            .unwrap()
    }

    fn unique_email() -> EmailAddress {
        EmailAddress::normalized(&format!("{}@rel.test", Uuid::new_v4().simple()))
    }

    fn identity(name: &str, email: &EmailAddress) -> NewIdentity {
        NewIdentity::new(name.to_string(), email.clone(), "hash-a".to_string())
    }

    fn post(owner: &str, title: &str, tags: Vec<&str>, age_minutes: i64) -> NewPost {
        let mut new = NewPost::new(
            title.to_string(),
            "content".to_string(),
            IdentityId::new(owner),
            tags.into_iter().map(String::from).collect(),
            None,
        );
        new.created_at = Utc::now() - Duration::minutes(age_minutes);
        new
    }

    #[tokio::test]
    #[ignore = "needs a running PostgreSQL at DATABASE_URL"]
    async fn test_insert_and_find_identity() {
        let store = setup_test_store().await;
        let email = unique_email();
        let created = store.insert_identity(identity("Alice", &email)).await.unwrap();

        let by_id = store
            .find_identity_by_id(&IdentityId::new(created.id.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.name, "Alice");
        assert_eq!(by_id.email, email.as_str());
        assert!(by_id.updated_at.is_none());

        let by_email = store.find_identity_by_email(&email).await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        let missing = store
            .find_identity_by_id(&IdentityId::new("doesnotexist"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    #[ignore = "needs a running PostgreSQL at DATABASE_URL"]
    async fn test_duplicate_email_is_conflict() {
        let store = setup_test_store().await;
        let email = unique_email();
        store.insert_identity(identity("Alice", &email)).await.unwrap();

        let err = store
            .insert_identity(identity("Alice Again", &email))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Still exactly one row behind that address.
        let found = store.find_identity_by_email(&email).await.unwrap().unwrap();
        assert_eq!(found.name, "Alice");
    }

    #[tokio::test]
    #[ignore = "needs a running PostgreSQL at DATABASE_URL"]
    async fn test_update_identity() {
        let store = setup_test_store().await;
        let created = store
            .insert_identity(identity("Alice", &unique_email()))
            .await
            .unwrap();
        let id = IdentityId::new(created.id);

        let updated = store
            .update_identity(
                &id,
                IdentityUpdate {
                    name: Some("Alice B".to_string()),
                    profile_picture_url: Some("http://img/a.png".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Alice B");
        assert_eq!(
            updated.profile_picture_url.as_deref(),
            Some("http://img/a.png")
        );
        assert!(updated.updated_at.is_some());

        let missing = store
            .update_identity(
                &IdentityId::new("doesnotexist"),
                IdentityUpdate {
                    name: Some("Ghost".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    #[ignore = "needs a running PostgreSQL at DATABASE_URL"]
    async fn test_update_to_taken_email_is_conflict() {
        let store = setup_test_store().await;
        let email_a = unique_email();
        store.insert_identity(identity("Alice", &email_a)).await.unwrap();
        let bob = store
            .insert_identity(identity("Bob", &unique_email()))
            .await
            .unwrap();

        let err = store
            .update_identity(
                &IdentityId::new(bob.id),
                IdentityUpdate {
                    email: Some(email_a),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore = "needs a running PostgreSQL at DATABASE_URL"]
    async fn test_delete_identity() {
        let store = setup_test_store().await;
        let created = store
            .insert_identity(identity("Alice", &unique_email()))
            .await
            .unwrap();
        let id = IdentityId::new(created.id);

        assert!(store.delete_identity(&id).await.unwrap());
        assert!(store.find_identity_by_id(&id).await.unwrap().is_none());
        assert!(!store.delete_identity(&id).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "needs a running PostgreSQL at DATABASE_URL"]
    async fn test_post_crud() {
        let store = setup_test_store().await;
        let owner = Uuid::new_v4().simple().to_string();
        let created = store
            .insert_post(post(&owner, "First", vec!["rust"], 0))
            .await
            .unwrap();
        let id = PostId::new(created.id);

        let found = store.find_post_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.title, "First");
        assert_eq!(found.user_id, owner);
        assert_eq!(found.tags, vec!["rust"]);
        assert!(found.updated_at.is_none());

        let updated = store
            .update_post(
                &id,
                PostUpdate {
                    title: Some("First, revised".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "First, revised");
        assert_eq!(updated.content, "content");
        // Owner is immutable across updates.
        assert_eq!(updated.user_id, owner);
        assert!(updated.updated_at.is_some());

        assert!(store.delete_post(&id).await.unwrap());
        assert!(store.find_post_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "needs a running PostgreSQL at DATABASE_URL"]
    async fn test_list_posts_newest_first_with_pagination_and_filters() {
        let store = setup_test_store().await;
        let owner = Uuid::new_v4().simple().to_string();
        store
            .insert_post(post(&owner, "oldest", vec!["rust", "web"], 30))
            .await
            .unwrap();
        store
            .insert_post(post(&owner, "middle", vec!["web"], 20))
            .await
            .unwrap();
        store
            .insert_post(post(&owner, "newest", vec!["rust"], 10))
            .await
            .unwrap();

        let all = store
            .list_posts(PostQuery {
                skip: 0,
                limit: 20,
                user_id: Some(owner.clone()),
                tag: None,
            })
            .await
            .unwrap();
        let titles: Vec<&str> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "middle", "oldest"]);

        let page = store
            .list_posts(PostQuery {
                skip: 1,
                limit: 1,
                user_id: Some(owner.clone()),
                tag: None,
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "middle");

        let tagged = store
            .list_posts(PostQuery {
                skip: 0,
                limit: 20,
                user_id: Some(owner),
                tag: Some("rust".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(tagged.len(), 2);
    }

    #[tokio::test]
    #[ignore = "needs a running PostgreSQL at DATABASE_URL"]
    async fn test_list_posts_with_huge_skip_is_empty_page() {
        let store = setup_test_store().await;
        let owner = Uuid::new_v4().simple().to_string();
        store
            .insert_post(post(&owner, "only", vec![], 0))
            .await
            .unwrap();

        // u64::MAX must saturate, not wrap into a negative OFFSET.
        let rows = store
            .list_posts(PostQuery {
                skip: u64::MAX,
                limit: 20,
                user_id: Some(owner),
                tag: None,
            })
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
