//! Database handle

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::info;

use crate::Result;
use crate::migrations::Migrator;

/// Settings used to open a [`Storage`]
#[derive(Debug, Clone)]
pub struct StorageOptions {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    /// Permit migrations that drop existing data.
    pub allow_destructive: bool,
}

impl StorageOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
            allow_destructive: false,
        }
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn allow_destructive(mut self, allow: bool) -> Self {
        self.allow_destructive = allow;
        self
    }
}

/// Main storage interface
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Storage {
    pool: SqlitePool,
    path: PathBuf,
}

impl Storage {
    /// Open the database at `db_path`, or at the platform data directory
    /// when `None`, and bring its schema up to date.
    pub async fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_path);
        Self::open(StorageOptions::new(path)).await
    }

    pub async fn open(options: StorageOptions) -> Result<Self> {
        Self::open_with(options, &Migrator::builtin()).await
    }

    /// Open with an explicit migration set.
    pub async fn open_with(options: StorageOptions, migrator: &Migrator) -> Result<Self> {
        if let Some(parent) = options.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let connect = SqliteConnectOptions::new()
            .filename(&options.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect)
            .await?;

        info!(path = %options.path.display(), "Opened release database");

        let storage = Self {
            pool,
            path: options.path,
        };
        let report = migrator.run(&storage, options.allow_destructive).await?;
        if report.applied() {
            info!(
                from = report.from,
                to = report.to,
                "Release database schema upgraded"
            );
        }

        Ok(storage)
    }

    /// `<data_dir>/airship.db` for the current platform.
    pub fn default_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "airship", "airship-beta") {
            dirs.data_dir().join("airship.db")
        } else {
            PathBuf::from("airship.db")
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a read snapshot.
    pub async fn begin_read(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Start a write transaction holding the database write lock from the
    /// first statement, so check-then-write sequences cannot interleave with
    /// writers in other processes.
    pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Current schema version (`PRAGMA user_version`).
    pub async fn schema_version(&self) -> Result<i64> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!(path = %self.path.display(), "Release database closed");
    }
}
