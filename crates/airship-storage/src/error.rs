//! Error types for airship-storage

use airship_core::ReleaseId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Blob {key} is corrupted: content hash mismatch")]
    BlobCorrupted { key: String },

    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: i64, reason: String },

    #[error(
        "Schema migration {version} drops existing data; reopen with destructive migrations allowed"
    )]
    DestructiveMigration { version: i64 },

    #[error("Database schema version {found} is newer than this build supports ({supported})")]
    SchemaTooNew { found: i64, supported: i64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Outcome of a failed repository operation
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("A release titled {0:?} already exists")]
    DuplicateTitle(String),

    #[error("A release with slug {0:?} already exists")]
    DuplicateSlug(String),

    #[error("Release not found: {0}")]
    NotFound(ReleaseId),

    #[error(transparent)]
    Invalid(#[from] airship_core::Error),

    #[error("Storage fault: {0}")]
    StorageFault(#[from] StorageError),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::StorageFault(StorageError::Database(err))
    }
}

impl RepositoryError {
    /// True for uniqueness, lookup and validation outcomes the caller can
    /// act on; false for storage faults.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RepositoryError::StorageFault(_))
    }
}
