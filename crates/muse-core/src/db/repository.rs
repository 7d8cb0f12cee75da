//! Creation repository implementation

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::models::{Creation, CreationId, NewCreation};
use libsql::{params, Connection, Row};

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, prompt, content, type, publish, likes, created_at FROM creations";

/// Result of a server-side like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}

impl LikeToggle {
    pub const fn message(self) -> &'static str {
        match self {
            Self::Liked => "Creation liked",
            Self::Unliked => "Creation unliked",
        }
    }
}

/// Trait for creation storage operations
#[allow(async_fn_in_trait)]
pub trait CreationRepository {
    /// Persist a new creation
    async fn create(&self, input: NewCreation) -> Result<Creation>;

    /// Get a creation by ID
    async fn get(&self, id: &CreationId) -> Result<Option<Creation>>;

    /// List one owner's creations, newest first
    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Creation>>;

    /// List published creations, newest first
    async fn list_published(&self) -> Result<Vec<Creation>>;

    /// Flip `user_id`'s membership in the liker set
    async fn toggle_like(&self, id: &CreationId, user_id: &str) -> Result<LikeToggle>;

    /// Change visibility; only the owner may do this
    async fn set_publish(&self, id: &CreationId, user_id: &str, publish: bool) -> Result<()>;
}

/// libSQL implementation of `CreationRepository`
pub struct LibSqlCreationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlCreationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_creation(row: &Row) -> Result<Creation> {
        let id: String = row.get(0)?;
        let kind: String = row.get(4)?;
        let likes: String = row.get(6)?;
        Ok(Creation {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("invalid creation id `{id}`")))?,
            user_id: row.get(1)?,
            prompt: row.get(2)?,
            content: row.get(3)?,
            kind: kind.parse().map_err(Error::Database)?,
            publish: row.get::<i32>(5)? != 0,
            likes: serde_json::from_str::<BTreeSet<String>>(&likes)?,
            created_at: row.get(7)?,
        })
    }

    async fn query_many(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Creation>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut creations = Vec::new();
        while let Some(row) = rows.next().await? {
            creations.push(Self::parse_creation(&row)?);
        }
        Ok(creations)
    }
}

impl CreationRepository for LibSqlCreationRepository<'_> {
    async fn create(&self, input: NewCreation) -> Result<Creation> {
        if input.user_id.trim().is_empty() {
            return Err(Error::InvalidInput("creation owner cannot be empty".into()));
        }
        let creation = input.into_creation();

        self.conn
            .execute(
                "INSERT INTO creations (id, user_id, prompt, content, type, publish, likes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    creation.id.as_str(),
                    creation.user_id.clone(),
                    creation.prompt.clone(),
                    creation.content.clone(),
                    creation.kind.as_str(),
                    i32::from(creation.publish),
                    serde_json::to_string(&creation.likes)?,
                    creation.created_at
                ],
            )
            .await?;

        Ok(creation)
    }

    async fn get(&self, id: &CreationId) -> Result<Option<Creation>> {
        let mut rows = self
            .conn
            .query(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id.as_str()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_creation(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_by_owner(&self, user_id: &str) -> Result<Vec<Creation>> {
        self.query_many(
            &format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC"),
            params![user_id],
        )
        .await
    }

    async fn list_published(&self) -> Result<Vec<Creation>> {
        self.query_many(
            &format!("{SELECT_COLUMNS} WHERE publish = 1 ORDER BY created_at DESC"),
            (),
        )
        .await
    }

    async fn toggle_like(&self, id: &CreationId, user_id: &str) -> Result<LikeToggle> {
        // Read-modify-write without a transaction: two sessions racing on the
        // same row can lose an update.
        let mut creation = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let outcome = if creation.is_liked_by(user_id) {
            creation.set_liked(user_id, false);
            LikeToggle::Unliked
        } else {
            creation.set_liked(user_id, true);
            LikeToggle::Liked
        };

        self.conn
            .execute(
                "UPDATE creations SET likes = ?1 WHERE id = ?2",
                params![serde_json::to_string(&creation.likes)?, id.as_str()],
            )
            .await?;

        Ok(outcome)
    }

    async fn set_publish(&self, id: &CreationId, user_id: &str, publish: bool) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE creations SET publish = ?1 WHERE id = ?2 AND user_id = ?3",
                params![i32::from(publish), id.as_str(), user_id],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::CreationKind;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn image(owner: &str, publish: bool) -> NewCreation {
        NewCreation::new(owner, "neon city", "https://img/neon.png", CreationKind::Image)
            .published(publish)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_get() {
        let db = setup().await;
        let repo = LibSqlCreationRepository::new(db.connection());

        let creation = repo.create(image("owner", true)).await.unwrap();
        let fetched = repo.get(&creation.id).await.unwrap().unwrap();
        assert_eq!(fetched, creation);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_rejects_empty_owner() {
        let db = setup().await;
        let repo = LibSqlCreationRepository::new(db.connection());

        let err = repo.create(image("  ", false)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_published_excludes_private_newest_first() {
        let db = setup().await;
        let repo = LibSqlCreationRepository::new(db.connection());

        let first = repo.create(image("a", true)).await.unwrap();
        repo.create(image("b", false)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let third = repo.create(image("c", true)).await.unwrap();

        let published = repo.list_published().await.unwrap();
        let ids: Vec<_> = published.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![third.id, first.id]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_owner() {
        let db = setup().await;
        let repo = LibSqlCreationRepository::new(db.connection());

        repo.create(image("a", false)).await.unwrap();
        repo.create(
            NewCreation::new("a", "titles", "1. One\n2. Two", CreationKind::BlogTitle),
        )
        .await
        .unwrap();
        repo.create(image("b", true)).await.unwrap();

        let mine = repo.list_by_owner("a").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|c| c.user_id == "a"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_toggle_like_flips_membership() {
        let db = setup().await;
        let repo = LibSqlCreationRepository::new(db.connection());
        let creation = repo.create(image("owner", true)).await.unwrap();

        assert_eq!(
            repo.toggle_like(&creation.id, "u1").await.unwrap(),
            LikeToggle::Liked
        );
        assert_eq!(
            repo.toggle_like(&creation.id, "u2").await.unwrap(),
            LikeToggle::Liked
        );
        let fetched = repo.get(&creation.id).await.unwrap().unwrap();
        assert_eq!(fetched.like_count(), 2);

        assert_eq!(
            repo.toggle_like(&creation.id, "u1").await.unwrap(),
            LikeToggle::Unliked
        );
        let fetched = repo.get(&creation.id).await.unwrap().unwrap();
        assert_eq!(
            fetched.likes.into_iter().collect::<Vec<_>>(),
            vec!["u2".to_string()]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_toggle_like_unknown_creation() {
        let db = setup().await;
        let repo = LibSqlCreationRepository::new(db.connection());

        let err = repo.toggle_like(&CreationId::new(), "u1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_publish_owner_only() {
        let db = setup().await;
        let repo = LibSqlCreationRepository::new(db.connection());
        let creation = repo.create(image("owner", false)).await.unwrap();

        let err = repo
            .set_publish(&creation.id, "intruder", true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        repo.set_publish(&creation.id, "owner", true).await.unwrap();
        assert_eq!(repo.list_published().await.unwrap().len(), 1);
    }
}
