//! Shared database service wrapper used by the API server.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{CreationRepository, Database, LibSqlCreationRepository, LikeToggle, ReplicaConfig};
use crate::models::{Creation, CreationId, NewCreation};
use crate::Result;

/// Thread-safe service for DB and repository operations.
#[derive(Clone)]
pub struct CreationService {
    db: Arc<Mutex<Database>>,
}

impl CreationService {
    /// Open a service at the given filesystem path, optionally as a remote replica.
    pub async fn open_path(
        db_path: impl Into<PathBuf>,
        replica: Option<ReplicaConfig>,
    ) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = match replica {
            Some(config) if config.is_configured() => {
                tracing::info!(
                    "Opening replica of {}",
                    config.url.as_deref().unwrap_or("unknown")
                );
                Database::open_replica(&db_path, config).await?
            }
            _ => {
                tracing::info!("Running in local-only mode at {}", db_path.display());
                Database::open(&db_path).await?
            }
        };

        Ok(Self::from_database(db))
    }

    /// Open an in-memory service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory().await?))
    }

    fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Pull remote changes when running as a replica.
    pub async fn sync(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.sync().await
    }

    pub async fn create_creation(&self, input: NewCreation) -> Result<Creation> {
        let db = self.db.lock().await;
        LibSqlCreationRepository::new(db.connection())
            .create(input)
            .await
    }

    pub async fn get_creation(&self, id: &CreationId) -> Result<Option<Creation>> {
        let db = self.db.lock().await;
        LibSqlCreationRepository::new(db.connection()).get(id).await
    }

    /// Creations owned by `user_id`, newest first.
    pub async fn list_user_creations(&self, user_id: &str) -> Result<Vec<Creation>> {
        let db = self.db.lock().await;
        LibSqlCreationRepository::new(db.connection())
            .list_by_owner(user_id)
            .await
    }

    /// Published creations from everyone, newest first.
    pub async fn list_published_creations(&self) -> Result<Vec<Creation>> {
        let db = self.db.lock().await;
        LibSqlCreationRepository::new(db.connection())
            .list_published()
            .await
    }

    pub async fn toggle_like(&self, id: &CreationId, user_id: &str) -> Result<LikeToggle> {
        let db = self.db.lock().await;
        LibSqlCreationRepository::new(db.connection())
            .toggle_like(id, user_id)
            .await
    }

    pub async fn set_publish(&self, id: &CreationId, user_id: &str, publish: bool) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlCreationRepository::new(db.connection())
            .set_publish(id, user_id, publish)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreationKind;

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_create_like_and_list() {
        let service = CreationService::open_in_memory().await.unwrap();

        let creation = service
            .create_creation(
                NewCreation::new("owner", "sunset", "https://img/s.png", CreationKind::Image)
                    .published(true),
            )
            .await
            .unwrap();
        service.toggle_like(&creation.id, "u1").await.unwrap();

        let feed = service.list_published_creations().await.unwrap();
        assert_eq!(feed.len(), 1);
        assert!(feed[0].is_liked_by("u1"));
        assert_eq!(service.list_user_creations("owner").await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("muse.db");

        let service = CreationService::open_path(&path, None).await.unwrap();
        service.sync().await.unwrap();
        assert!(path.parent().unwrap().exists());
    }
}
