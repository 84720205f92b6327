//! Release record storage

use airship_core::{Release, ReleaseId, ReleaseStatus, Screenshot, ScreenshotSource};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use time::{Date, OffsetDateTime};

use crate::{Result, StorageError};

const SELECT_RELEASE: &str = "SELECT id, title, slug, date, description, status, documentation, \
     screenshots, created_at, updated_at FROM releases";

/// Persisted fields of a release, without its id
#[derive(Debug, Clone, Copy)]
pub struct ReleaseRecord<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub date: Date,
    pub description: &'a str,
    pub documentation: &'a str,
    pub status: ReleaseStatus,
    pub screenshots: &'a [Screenshot],
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

impl<'a> From<&'a Release> for ReleaseRecord<'a> {
    fn from(release: &'a Release) -> Self {
        Self {
            title: &release.title,
            slug: &release.slug,
            date: release.date,
            description: &release.description,
            documentation: &release.documentation,
            status: release.status,
            screenshots: &release.screenshots,
            created_at: release.created_at,
            updated_at: release.updated_at,
        }
    }
}

/// Stored shape of a screenshot: the `url` is either external or a
/// `blob:/<key>` reference.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedScreenshot {
    url: String,
    caption: String,
}

fn encode_screenshots(screenshots: &[Screenshot]) -> Result<String> {
    let persisted = screenshots
        .iter()
        .map(|s| -> Result<PersistedScreenshot> {
            let url = s.source.url().ok_or_else(|| {
                StorageError::Other(anyhow::anyhow!(
                    "pending screenshot upload reached the record store"
                ))
            })?;
            Ok(PersistedScreenshot {
                url,
                caption: s.caption.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_string(&persisted)?)
}

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    id: i64,
    title: String,
    slug: String,
    date: Date,
    description: String,
    status: String,
    documentation: String,
    screenshots: String,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
}

impl TryFrom<ReleaseRow> for Release {
    type Error = StorageError;

    fn try_from(row: ReleaseRow) -> Result<Self> {
        let id = row.id;
        let invalid = move |reason: String| StorageError::InvalidRecord { id, reason };

        let status = row.status.parse::<ReleaseStatus>().map_err(invalid)?;
        let persisted: Vec<PersistedScreenshot> = serde_json::from_str(&row.screenshots)?;
        let screenshots = persisted
            .into_iter()
            .map(|p| -> Result<Screenshot> {
                let source = ScreenshotSource::from_url(&p.url)
                    .map_err(|e| invalid(e.to_string()))?;
                Ok(Screenshot {
                    caption: p.caption,
                    source,
                    image: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Release {
            id: ReleaseId(row.id),
            title: row.title,
            slug: row.slug,
            date: row.date,
            description: row.description,
            documentation: row.documentation,
            status,
            screenshots,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Keyed release records bound to one connection or transaction
///
/// Performs no validation; the repository owns every invariant.
pub struct RecordStore<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> RecordStore<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert a record and return its newly assigned id.
    pub async fn insert(&mut self, record: &ReleaseRecord<'_>) -> Result<ReleaseId> {
        let screenshots = encode_screenshots(record.screenshots)?;

        let result = sqlx::query(
            "INSERT INTO releases
                (title, slug, date, description, status, documentation, screenshots, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.title)
        .bind(record.slug)
        .bind(record.date)
        .bind(record.description)
        .bind(record.status.as_str())
        .bind(record.documentation)
        .bind(screenshots)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(ReleaseId(result.last_insert_rowid()))
    }

    /// Insert or replace the record stored under `id`.
    pub async fn put(&mut self, id: ReleaseId, record: &ReleaseRecord<'_>) -> Result<()> {
        let screenshots = encode_screenshots(record.screenshots)?;

        sqlx::query(
            "INSERT INTO releases
                (id, title, slug, date, description, status, documentation, screenshots, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                slug = excluded.slug,
                date = excluded.date,
                description = excluded.description,
                status = excluded.status,
                documentation = excluded.documentation,
                screenshots = excluded.screenshots,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
        )
        .bind(id.0)
        .bind(record.title)
        .bind(record.slug)
        .bind(record.date)
        .bind(record.description)
        .bind(record.status.as_str())
        .bind(record.documentation)
        .bind(screenshots)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    pub async fn get(&mut self, id: ReleaseId) -> Result<Option<Release>> {
        let sql = format!("{SELECT_RELEASE} WHERE id = ?");
        let row: Option<ReleaseRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&mut *self.conn)
            .await?;
        row.map(Release::try_from).transpose()
    }

    pub async fn get_by_title(&mut self, title: &str) -> Result<Option<Release>> {
        let sql = format!("{SELECT_RELEASE} WHERE title = ?");
        let row: Option<ReleaseRow> = sqlx::query_as(&sql)
            .bind(title)
            .fetch_optional(&mut *self.conn)
            .await?;
        row.map(Release::try_from).transpose()
    }

    pub async fn get_by_slug(&mut self, slug: &str) -> Result<Option<Release>> {
        let sql = format!("{SELECT_RELEASE} WHERE slug = ?");
        let row: Option<ReleaseRow> = sqlx::query_as(&sql)
            .bind(slug)
            .fetch_optional(&mut *self.conn)
            .await?;
        row.map(Release::try_from).transpose()
    }

    /// All records, newest `date` first; equal dates keep insertion order.
    pub async fn scan(&mut self) -> Result<Vec<Release>> {
        let sql = format!("{SELECT_RELEASE} ORDER BY date DESC, id ASC");
        let rows: Vec<ReleaseRow> = sqlx::query_as(&sql).fetch_all(&mut *self.conn).await?;
        rows.into_iter().map(Release::try_from).collect()
    }

    /// Delete a record. Returns false when no record had this id.
    pub async fn delete(&mut self, id: ReleaseId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM releases WHERE id = ?")
            .bind(id.0)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&mut self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM releases")
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }
}
