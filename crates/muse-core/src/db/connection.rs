//! Database connection management

use crate::error::{Error, Result};
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;
use std::time::Duration;

use super::migrations;

/// Remote replica settings for a Turso-hosted database
#[derive(Clone, Default)]
pub struct ReplicaConfig {
    /// Remote database URL (e.g., `libsql://muse.turso.io`)
    pub url: Option<String>,
    /// Authentication token for remote database
    pub auth_token: Option<String>,
    /// Automatic sync interval
    pub sync_interval: Option<Duration>,
}

impl std::fmt::Debug for ReplicaConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ReplicaConfig")
            .field("url", &self.url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("sync_interval", &self.sync_interval)
            .finish()
    }
}

impl ReplicaConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            auth_token: Some(auth_token.into()),
            sync_interval: Some(Duration::from_secs(60)),
        }
    }

    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    pub const fn is_configured(&self) -> bool {
        self.url.is_some() && self.auth_token.is_some()
    }
}

/// Database wrapper for libSQL connections
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    replica: bool,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::finish(db, false).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::finish(db, false).await
    }

    /// Open a local replica that syncs with a remote Turso database
    pub async fn open_replica(local_path: impl AsRef<Path>, config: ReplicaConfig) -> Result<Self> {
        let path_str = local_path.as_ref().to_string_lossy().to_string();
        let url = config
            .url
            .clone()
            .ok_or_else(|| Error::InvalidInput("Replica URL is required".into()))?;
        let token = config
            .auth_token
            .clone()
            .ok_or_else(|| Error::InvalidInput("Replica auth token is required".into()))?;

        let mut builder = Builder::new_remote_replica(&path_str, url, token);
        if let Some(interval) = config.sync_interval {
            builder = builder.sync_interval(interval);
            tracing::debug!("Replica sync interval set to {:?}", interval);
        }

        let db = builder.build().await?;
        // Pull the remote schema before migrating
        db.sync().await?;
        Self::finish(db, true).await
    }

    async fn finish(db: LibSqlDatabase, replica: bool) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self { db, conn, replica };
        database.configure().await?;
        migrations::run(&database.conn).await?;
        Ok(database)
    }

    async fn configure(&self) -> Result<()> {
        // Pragmas are best effort; remote replicas reject some of them
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        Ok(())
    }

    /// Pull changes from the remote database (no-op for local databases)
    pub async fn sync(&self) -> Result<()> {
        if self.replica {
            self.db.sync().await?;
            tracing::debug!("Database synced with remote");
        }
        Ok(())
    }

    pub const fn is_replica(&self) -> bool {
        self.replica
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(!db.is_replica());
        db.sync().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_on_disk_creates_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("muse.db");
        let db = Database::open(&path).await.unwrap();

        let mut rows = db.connection().query("SELECT 1", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 1);
        assert!(path.exists());
    }

    #[test]
    fn test_replica_config() {
        let config = ReplicaConfig::new("libsql://muse.turso.io", "token");
        assert!(config.is_configured());
        assert!(!ReplicaConfig::default().is_configured());
        let config = config.with_sync_interval(Duration::from_secs(5));
        assert_eq!(config.sync_interval, Some(Duration::from_secs(5)));
    }
}
