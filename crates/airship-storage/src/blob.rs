//! Blob storage for screenshot payloads
//!
//! Blobs live in the `blobs` table of the release database so that a
//! release and the screenshots it references commit in one transaction.

use airship_core::BlobKey;
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use tracing::debug;

use crate::{Result, StorageError};

/// A blob read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: BlobKey,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(sqlx::FromRow)]
struct BlobRow {
    content_type: String,
    data: Vec<u8>,
    content_hash: String,
}

/// Keyed binary storage bound to one connection or transaction
pub struct BlobStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> BlobStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Store `data` under `key` and return its BLAKE3 hash.
    pub async fn put(&mut self, key: &BlobKey, content_type: &str, data: &[u8]) -> Result<String> {
        let hash = blake3::hash(data).to_hex().to_string();

        sqlx::query(
            "INSERT INTO blobs (key, content_type, data, size_bytes, content_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(key.as_str())
        .bind(content_type)
        .bind(data)
        .bind(data.len() as i64)
        .bind(&hash)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *self.conn)
        .await?;

        debug!(key = %key, bytes = data.len(), "Stored blob");
        Ok(hash)
    }

    /// Fetch a blob, verifying its content hash.
    pub async fn get(&mut self, key: &BlobKey) -> Result<Option<StoredBlob>> {
        let row: Option<BlobRow> =
            sqlx::query_as("SELECT content_type, data, content_hash FROM blobs WHERE key = ?")
                .bind(key.as_str())
                .fetch_optional(&mut *self.conn)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if blake3::hash(&row.data).to_hex().as_str() != row.content_hash {
            return Err(StorageError::BlobCorrupted {
                key: key.to_string(),
            });
        }

        Ok(Some(StoredBlob {
            key: key.clone(),
            content_type: row.content_type,
            data: row.data,
        }))
    }

    pub async fn exists(&mut self, key: &BlobKey) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM blobs WHERE key = ?")
            .bind(key.as_str())
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(found.is_some())
    }

    /// Delete a blob. Returns false when nothing was stored under `key`.
    pub async fn delete(&mut self, key: &BlobKey) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blobs WHERE key = ?")
            .bind(key.as_str())
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
