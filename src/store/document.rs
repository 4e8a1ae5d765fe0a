//! Document-store adapter backed by SurrealDB.
//!
//! One multiplexed client handle, created at startup. Record ids are the
//! app-minted hex strings used as SurrealDB record keys; queries project
//! `record::id(id)` so the rest of the crate only ever sees the plain
//! string form. Timestamps are stored as fixed-precision RFC 3339 strings
//! so `ORDER BY created_at DESC` is a correct lexicographic sort.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::config::DocumentConfig;
use crate::store::{
    IdentityRecord, IdentityUpdate, NewIdentity, NewPost, PostQuery, PostRecord, PostUpdate,
    Store, StoreError,
};
use crate::types::{EmailAddress, IdentityId, PostId};

/// Name of the unique email index; surfaced in SurrealDB error messages on
/// duplicate inserts.
const EMAIL_INDEX: &str = "identity_email";

/// Fixed-precision RFC 3339 so stored strings sort chronologically.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn backend_err(e: surrealdb::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Map a write error, turning unique-email index violations into `Conflict`.
fn write_err(e: surrealdb::Error) -> StoreError {
    let msg = e.to_string();
    if msg.contains(EMAIL_INDEX) {
        StoreError::Conflict("An account with that email already exists".to_string())
    } else {
        StoreError::Backend(msg)
    }
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

/// SurrealDB-backed implementation of the storage contract.
#[derive(Clone)]
pub struct DocumentStore {
    db: Surreal<Any>,
}

impl DocumentStore {
    /// Connect to SurrealDB and select the configured namespace/database.
    pub async fn connect(config: DocumentConfig) -> Result<Self> {
        let db = surrealdb::engine::any::connect(config.url).await?;

        // Sign in if credentials are provided
        if let (Some(username), Some(password)) = (config.username, config.password) {
            db.signin(Root {
                username: &username,
                password: &password,
            })
            .await?;
        }

        db.use_ns(config.namespace).use_db(config.database).await?;

        let store = Self { db };
        store.ensure_schema().await?;
        info!("document store ready");
        Ok(store)
    }

    /// Define tables and indexes. Idempotent.
    pub async fn ensure_schema(&self) -> Result<()> {
        let schema_queries = vec![
            "DEFINE TABLE IF NOT EXISTS identity SCHEMALESS;
             DEFINE INDEX IF NOT EXISTS identity_email ON TABLE identity COLUMNS email UNIQUE;",
            "DEFINE TABLE IF NOT EXISTS post SCHEMALESS;
             DEFINE INDEX IF NOT EXISTS post_owner ON TABLE post COLUMNS user_id;
             DEFINE INDEX IF NOT EXISTS post_created_at ON TABLE post COLUMNS created_at;",
        ];

        for query in schema_queries {
            self.db.query(query).await?.check()?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for DocumentStore {
    async fn find_identity_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        let mut res = self
            .db
            .query(
                r#"
                SELECT *, record::id(id) AS id FROM identity
                WHERE email = $email
                LIMIT 1
                "#,
            )
            .bind(("email", email.as_str().to_string()))
            .await
            .map_err(backend_err)?;

        let rows: Vec<IdentityRecord> = res.take(0).map_err(backend_err)?;
        Ok(rows.into_iter().next())
    }

    async fn find_identity_by_id(
        &self,
        id: &IdentityId,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        let mut res = self
            .db
            .query(
                r#"
                SELECT *, record::id(id) AS id FROM identity
                WHERE id = type::thing('identity', $id)
                LIMIT 1
                "#,
            )
            .bind(("id", id.as_str().to_string()))
            .await
            .map_err(backend_err)?;

        let rows: Vec<IdentityRecord> = res.take(0).map_err(backend_err)?;
        Ok(rows.into_iter().next())
    }

    async fn insert_identity(&self, new: NewIdentity) -> Result<IdentityRecord, StoreError> {
        self.db
            .query(
                r#"
                CREATE type::thing('identity', $id) CONTENT {
                    name: $name,
                    email: $email,
                    password_hash: $password_hash,
                    profile_picture_url: NONE,
                    created_at: $created_at,
                    updated_at: NONE
                } RETURN NONE
                "#,
            )
            .bind(("id", new.id.clone()))
            .bind(("name", new.name.clone()))
            .bind(("email", new.email.clone()))
            .bind(("password_hash", new.password_hash.clone()))
            .bind(("created_at", ts(&new.created_at)))
            .await
            .map_err(write_err)?
            .check()
            .map_err(write_err)?;

        Ok(new.into_record())
    }

    async fn update_identity(
        &self,
        id: &IdentityId,
        update: IdentityUpdate,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        if self.find_identity_by_id(id).await?.is_none() {
            return Ok(None);
        }

        // Build the SET clause from the fields that are present.
        let mut sets = vec!["updated_at = $updated_at"];
        if update.name.is_some() {
            sets.push("name = $name");
        }
        if update.email.is_some() {
            sets.push("email = $email");
        }
        if update.profile_picture_url.is_some() {
            sets.push("profile_picture_url = $picture");
        }

        let sql = format!(
            "UPDATE type::thing('identity', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut query = self
            .db
            .query(sql)
            .bind(("id", id.as_str().to_string()))
            .bind(("updated_at", ts(&Utc::now())));
        if let Some(name) = update.name {
            query = query.bind(("name", name));
        }
        if let Some(email) = update.email {
            query = query.bind(("email", email.into_inner()));
        }
        if let Some(picture) = update.profile_picture_url {
            query = query.bind(("picture", picture));
        }

        query.await.map_err(write_err)?.check().map_err(write_err)?;

        self.find_identity_by_id(id).await
    }

    async fn delete_identity(&self, id: &IdentityId) -> Result<bool, StoreError> {
        if self.find_identity_by_id(id).await?.is_none() {
            return Ok(false);
        }

        self.db
            .query("DELETE type::thing('identity', $id) RETURN NONE")
            .bind(("id", id.as_str().to_string()))
            .await
            .map_err(backend_err)?
            .check()
            .map_err(backend_err)?;

        Ok(true)
    }

    async fn count_identities(&self) -> Result<u64, StoreError> {
        let mut res = self
            .db
            .query("SELECT count() AS count FROM identity GROUP ALL")
            .await
            .map_err(backend_err)?;

        let rows: Vec<CountRow> = res.take(0).map_err(backend_err)?;
        Ok(rows.into_iter().next().map(|r| r.count).unwrap_or(0))
    }

    async fn find_post_by_id(&self, id: &PostId) -> Result<Option<PostRecord>, StoreError> {
        let mut res = self
            .db
            .query(
                r#"
                SELECT *, record::id(id) AS id FROM post
                WHERE id = type::thing('post', $id)
                LIMIT 1
                "#,
            )
            .bind(("id", id.as_str().to_string()))
            .await
            .map_err(backend_err)?;

        let rows: Vec<PostRecord> = res.take(0).map_err(backend_err)?;
        Ok(rows.into_iter().next())
    }

    async fn list_posts(&self, query: PostQuery) -> Result<Vec<PostRecord>, StoreError> {
        let mut conditions = Vec::new();
        if query.user_id.is_some() {
            conditions.push("user_id = $user_id");
        }
        if query.tag.is_some() {
            conditions.push("$tag IN tags");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT *, record::id(id) AS id FROM post {}ORDER BY created_at DESC LIMIT $limit START $skip",
            where_clause
        );

        let mut q = self
            .db
            .query(sql)
            .bind(("limit", query.limit))
            .bind(("skip", query.skip));
        if let Some(user_id) = query.user_id {
            q = q.bind(("user_id", user_id));
        }
        if let Some(tag) = query.tag {
            q = q.bind(("tag", tag));
        }

        let mut res = q.await.map_err(backend_err)?;
        let rows: Vec<PostRecord> = res.take(0).map_err(backend_err)?;
        Ok(rows)
    }

    async fn insert_post(&self, new: NewPost) -> Result<PostRecord, StoreError> {
        self.db
            .query(
                r#"
                CREATE type::thing('post', $id) CONTENT {
                    title: $title,
                    content: $content,
                    user_id: $user_id,
                    tags: $tags,
                    image_url: $image_url,
                    created_at: $created_at,
                    updated_at: NONE
                } RETURN NONE
                "#,
            )
            .bind(("id", new.id.clone()))
            .bind(("title", new.title.clone()))
            .bind(("content", new.content.clone()))
            .bind(("user_id", new.user_id.clone()))
            .bind(("tags", new.tags.clone()))
            .bind(("image_url", new.image_url.clone()))
            .bind(("created_at", ts(&new.created_at)))
            .await
            .map_err(backend_err)?
            .check()
            .map_err(backend_err)?;

        Ok(new.into_record())
    }

    async fn update_post(
        &self,
        id: &PostId,
        update: PostUpdate,
    ) -> Result<Option<PostRecord>, StoreError> {
        if self.find_post_by_id(id).await?.is_none() {
            return Ok(None);
        }

        let mut sets = vec!["updated_at = $updated_at"];
        if update.title.is_some() {
            sets.push("title = $title");
        }
        if update.content.is_some() {
            sets.push("content = $content");
        }
        if update.tags.is_some() {
            sets.push("tags = $tags");
        }
        if update.image_url.is_some() {
            sets.push("image_url = $image_url");
        }

        let sql = format!(
            "UPDATE type::thing('post', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut query = self
            .db
            .query(sql)
            .bind(("id", id.as_str().to_string()))
            .bind(("updated_at", ts(&Utc::now())));
        if let Some(title) = update.title {
            query = query.bind(("title", title));
        }
        if let Some(content) = update.content {
            query = query.bind(("content", content));
        }
        if let Some(tags) = update.tags {
            query = query.bind(("tags", tags));
        }
        if let Some(image_url) = update.image_url {
            query = query.bind(("image_url", image_url));
        }

        query
            .await
            .map_err(backend_err)?
            .check()
            .map_err(backend_err)?;

        self.find_post_by_id(id).await
    }

    async fn delete_post(&self, id: &PostId) -> Result<bool, StoreError> {
        if self.find_post_by_id(id).await?.is_none() {
            return Ok(false);
        }

        self.db
            .query("DELETE type::thing('post', $id) RETURN NONE")
            .bind(("id", id.as_str().to_string()))
            .await
            .map_err(backend_err)?
            .check()
            .map_err(backend_err)?;

        Ok(true)
    }

    async fn count_posts(&self) -> Result<u64, StoreError> {
        let mut res = self
            .db
            .query("SELECT count() AS count FROM post GROUP ALL")
            .await
            .map_err(backend_err)?;

        let rows: Vec<CountRow> = res.take(0).map_err(backend_err)?;
        Ok(rows.into_iter().next().map(|r| r.count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn setup_test_store() -> DocumentStore {
        let config = DocumentConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        DocumentStore::connect(config).await.unwrap()
    }

    fn alice() -> NewIdentity {
        NewIdentity::new(
            "Alice".to_string(),
            EmailAddress::normalized("a@x.com"),
            "hash-a".to_string(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_find_identity() {
        let store = setup_test_store().await;
        let created = store.insert_identity(alice()).await.unwrap();

        let by_id = store
            .find_identity_by_id(&IdentityId::new(created.id.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.name, "Alice");
        assert_eq!(by_id.email, "a@x.com");
        assert_eq!(by_id.password_hash, "hash-a");

        let by_email = store
            .find_identity_by_email(&EmailAddress::normalized("a@x.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn test_missing_identity_is_none() {
        let store = setup_test_store().await;
        let missing = store
            .find_identity_by_id(&IdentityId::new("doesnotexist"))
            .await
            .unwrap();
        assert!(missing.is_none());

        // Ids that could never be record keys still come back as None,
        // never as an error.
        let malformed = store
            .find_identity_by_id(&IdentityId::new("not a:valid/key"))
            .await
            .unwrap();
        assert!(malformed.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let store = setup_test_store().await;
        store.insert_identity(alice()).await.unwrap();

        let dup = NewIdentity::new(
            "Alice Again".to_string(),
            EmailAddress::normalized("a@x.com"),
            "hash-b".to_string(),
        );
        let err = store.insert_identity(dup).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        assert_eq!(store.count_identities().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_identity() {
        let store = setup_test_store().await;
        let created = store.insert_identity(alice()).await.unwrap();
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
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(
            updated.profile_picture_url.as_deref(),
            Some("http://img/a.png")
        );
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_identity_is_none() {
        let store = setup_test_store().await;
        let res = store
            .update_identity(
                &IdentityId::new("doesnotexist"),
                IdentityUpdate {
                    name: Some("Ghost".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn test_update_to_taken_email_is_conflict() {
        let store = setup_test_store().await;
        store.insert_identity(alice()).await.unwrap();
        let bob = store
            .insert_identity(NewIdentity::new(
                "Bob".to_string(),
                EmailAddress::normalized("b@x.com"),
                "hash-b".to_string(),
            ))
            .await
            .unwrap();

        let err = store
            .update_identity(
                &IdentityId::new(bob.id),
                IdentityUpdate {
                    email: Some(EmailAddress::normalized("a@x.com")),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_identity() {
        let store = setup_test_store().await;
        let created = store.insert_identity(alice()).await.unwrap();
        let id = IdentityId::new(created.id);

        assert!(store.delete_identity(&id).await.unwrap());
        assert!(store.find_identity_by_id(&id).await.unwrap().is_none());
        assert!(!store.delete_identity(&id).await.unwrap());
        assert_eq!(store.count_identities().await.unwrap(), 0);
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
    async fn test_post_crud() {
        let store = setup_test_store().await;
        let created = store
            .insert_post(post("owner1", "First", vec!["rust"], 0))
            .await
            .unwrap();
        let id = PostId::new(created.id);

        let found = store.find_post_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.title, "First");
        assert_eq!(found.user_id, "owner1");
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
        assert_eq!(updated.user_id, "owner1");
        assert!(updated.updated_at.is_some());

        assert!(store.delete_post(&id).await.unwrap());
        assert!(store.find_post_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_posts_newest_first_with_pagination() {
        let store = setup_test_store().await;
        store
            .insert_post(post("owner1", "oldest", vec![], 30))
            .await
            .unwrap();
        store
            .insert_post(post("owner1", "middle", vec![], 20))
            .await
            .unwrap();
        store
            .insert_post(post("owner2", "newest", vec![], 10))
            .await
            .unwrap();

        let all = store
            .list_posts(PostQuery {
                skip: 0,
                limit: 20,
                ..Default::default()
            })
            .await
            .unwrap();
        let titles: Vec<&str> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "middle", "oldest"]);

        let page = store
            .list_posts(PostQuery {
                skip: 1,
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "middle");

        assert_eq!(store.count_posts().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_posts_filters() {
        let store = setup_test_store().await;
        store
            .insert_post(post("owner1", "a", vec!["rust", "web"], 30))
            .await
            .unwrap();
        store
            .insert_post(post("owner1", "b", vec!["web"], 20))
            .await
            .unwrap();
        store
            .insert_post(post("owner2", "c", vec!["rust"], 10))
            .await
            .unwrap();

        let by_owner = store
            .list_posts(PostQuery {
                skip: 0,
                limit: 20,
                user_id: Some("owner1".to_string()),
                tag: None,
            })
            .await
            .unwrap();
        assert_eq!(by_owner.len(), 2);

        let by_tag = store
            .list_posts(PostQuery {
                skip: 0,
                limit: 20,
                user_id: None,
                tag: Some("rust".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_tag.len(), 2);

        let both = store
            .list_posts(PostQuery {
                skip: 0,
                limit: 20,
                user_id: Some("owner1".to_string()),
                tag: Some("rust".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].title, "a");
    }
}
