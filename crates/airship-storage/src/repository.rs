//! Release repository
//!
//! The only gateway between callers and persisted release data. Composes
//! the record and blob stores inside single transactions and enforces what
//! the stores do not: unique titles and slugs, slug derivation, and that
//! every stored screenshot reference points at a blob owned by its release.

use std::collections::HashSet;

use airship_core::{
    BlobKey, ImageHandle, NewRelease, Release, ReleaseId, Screenshot, ScreenshotSource, slugify,
    sniff_image_type,
};
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::blob::BlobStore;
use crate::db::Storage;
use crate::error::{RepositoryError, StorageError};
use crate::records::{RecordStore, ReleaseRecord};

type RepoResult<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, Clone)]
pub struct ReleaseRepository {
    storage: Storage,
}

impl ReleaseRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// All releases, newest first, with stored screenshots resolved.
    ///
    /// Storage faults are logged and yield an empty list.
    pub async fn list(&self) -> Vec<Release> {
        match self.try_list().await {
            Ok(releases) => releases,
            Err(e) => {
                error!(error = %e, "Failed to list releases");
                Vec::new()
            }
        }
    }

    async fn try_list(&self) -> crate::Result<Vec<Release>> {
        let mut tx = self.storage.begin_read().await?;
        let mut releases = RecordStore::new(&mut *tx).scan().await?;
        for release in &mut releases {
            resolve_images(&mut *tx, release).await?;
        }
        tx.commit().await?;
        Ok(releases)
    }

    /// Release by id; storage faults are logged and yield `None`.
    pub async fn get_by_id(&self, id: ReleaseId) -> Option<Release> {
        self.fetch_resolved(Lookup::Id(id)).await
    }

    /// Release by slug; storage faults are logged and yield `None`.
    pub async fn get_by_slug(&self, slug: &str) -> Option<Release> {
        self.fetch_resolved(Lookup::Slug(slug)).await
    }

    /// Release by id when `id_or_slug` is numeric and such an id exists,
    /// otherwise by slug.
    pub async fn get(&self, id_or_slug: &str) -> Option<Release> {
        if let Ok(id) = id_or_slug.parse::<ReleaseId>()
            && let Some(release) = self.get_by_id(id).await
        {
            return Some(release);
        }
        self.get_by_slug(id_or_slug).await
    }

    async fn fetch_resolved(&self, lookup: Lookup<'_>) -> Option<Release> {
        match self.try_fetch(lookup).await {
            Ok(release) => release,
            Err(e) => {
                error!(error = %e, lookup = ?lookup, "Failed to fetch release");
                None
            }
        }
    }

    async fn try_fetch(&self, lookup: Lookup<'_>) -> crate::Result<Option<Release>> {
        let mut tx = self.storage.begin_read().await?;
        let found = {
            let mut records = RecordStore::new(&mut *tx);
            match lookup {
                Lookup::Id(id) => records.get(id).await?,
                Lookup::Slug(slug) => records.get_by_slug(slug).await?,
            }
        };
        let Some(mut release) = found else {
            return Ok(None);
        };
        resolve_images(&mut *tx, &mut release).await?;
        tx.commit().await?;
        Ok(Some(release))
    }

    /// Create a release and return its id.
    ///
    /// Pending screenshot uploads are written to the blob store in the same
    /// transaction as the record.
    pub async fn create(&self, new: NewRelease) -> RepoResult<ReleaseId> {
        let slug = derive_slug(&new.title)?;
        let mut tx = self.storage.begin_write().await?;

        {
            let mut records = RecordStore::new(&mut *tx);
            if records.get_by_title(&new.title).await?.is_some() {
                return Err(RepositoryError::DuplicateTitle(new.title));
            }
            if records.get_by_slug(&slug).await?.is_some() {
                return Err(RepositoryError::DuplicateSlug(slug));
            }
        }

        let screenshots = store_uploads(&mut *tx, new.screenshots, &HashSet::new()).await?;

        let record = ReleaseRecord {
            title: &new.title,
            slug: &slug,
            date: new.date,
            description: &new.description,
            documentation: &new.documentation,
            status: new.status,
            screenshots: &screenshots,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        let id = RecordStore::new(&mut *tx)
            .insert(&record)
            .await
            .map_err(|e| unique_violation(e, &new.title, &slug))?;

        tx.commit().await?;

        info!(%id, %slug, "Created release");
        Ok(id)
    }

    /// Replace the mutable fields of an existing release.
    ///
    /// The slug follows the title: it is re-derived only when the title
    /// changes. `created_at` is kept from the stored version and any slug
    /// supplied by the caller is ignored.
    pub async fn update(&self, release: Release) -> RepoResult<ReleaseId> {
        let id = release.id;
        let mut tx = self.storage.begin_write().await?;

        let prior = RecordStore::new(&mut *tx)
            .get(id)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;

        let slug = if release.title != prior.title {
            let slug = derive_slug(&release.title)?;
            let mut records = RecordStore::new(&mut *tx);
            if let Some(other) = records.get_by_title(&release.title).await?
                && other.id != id
            {
                return Err(RepositoryError::DuplicateTitle(release.title));
            }
            if let Some(other) = records.get_by_slug(&slug).await?
                && other.id != id
            {
                return Err(RepositoryError::DuplicateSlug(slug));
            }
            slug
        } else {
            prior.slug.clone()
        };

        let owned: HashSet<BlobKey> = prior.blob_keys().into_iter().collect();
        let screenshots = store_uploads(&mut *tx, release.screenshots, &owned).await?;

        let kept: HashSet<&BlobKey> = screenshots
            .iter()
            .filter_map(|s| s.source.blob_key())
            .collect();
        {
            let mut blobs = BlobStore::new(&mut *tx);
            for key in owned.iter().filter(|k| !kept.contains(k)) {
                blobs.delete(key).await?;
                debug!(%id, %key, "Dropped screenshot blob no longer referenced");
            }
        }

        let record = ReleaseRecord {
            title: &release.title,
            slug: &slug,
            date: release.date,
            description: &release.description,
            documentation: &release.documentation,
            status: release.status,
            screenshots: &screenshots,
            created_at: prior.created_at,
            updated_at: Some(OffsetDateTime::now_utc()),
        };
        RecordStore::new(&mut *tx)
            .put(id, &record)
            .await
            .map_err(|e| unique_violation(e, &release.title, &slug))?;

        tx.commit().await?;

        info!(%id, %slug, "Updated release");
        Ok(id)
    }

    /// Delete a release and the blobs its screenshots reference.
    ///
    /// A blob that cannot be deleted is logged and skipped; the record is
    /// deleted regardless.
    pub async fn delete(&self, id: ReleaseId) -> RepoResult<()> {
        let mut tx = self.storage.begin_write().await?;

        let release = RecordStore::new(&mut *tx)
            .get(id)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;

        {
            let mut blobs = BlobStore::new(&mut *tx);
            for key in release.blob_keys() {
                match blobs.delete(&key).await {
                    Ok(true) => debug!(%id, %key, "Deleted screenshot blob"),
                    Ok(false) => warn!(%id, %key, "Screenshot blob was already missing"),
                    Err(e) => warn!(%id, %key, error = %e, "Failed to delete screenshot blob"),
                }
            }
        }

        RecordStore::new(&mut *tx).delete(id).await?;
        tx.commit().await?;

        info!(%id, slug = %release.slug, "Deleted release");
        Ok(())
    }

    /// Number of stored releases.
    pub async fn count(&self) -> RepoResult<i64> {
        let mut conn = self.storage.pool().acquire().await?;
        Ok(RecordStore::new(&mut *conn).count().await?)
    }

    /// Raw image stored under `key`, if any.
    pub async fn blob(&self, key: &BlobKey) -> RepoResult<Option<ImageHandle>> {
        let mut conn = self.storage.pool().acquire().await?;
        let blob = BlobStore::new(&mut *conn).get(key).await?;
        Ok(blob.map(|b| ImageHandle {
            content_type: b.content_type,
            data: b.data,
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum Lookup<'a> {
    Id(ReleaseId),
    Slug(&'a str),
}

fn derive_slug(title: &str) -> RepoResult<String> {
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(airship_core::Error::InvalidTitle(title.to_string()).into());
    }
    Ok(slug)
}

/// Write every pending upload to the blob store and swap in its reference.
///
/// A recognizable image signature overrides the declared content type.
/// Stored references must name a blob in `owned` (the blobs of the release
/// being updated) that is still present; blobs are never shared between
/// releases.
async fn store_uploads(
    conn: &mut SqliteConnection,
    screenshots: Vec<Screenshot>,
    owned: &HashSet<BlobKey>,
) -> RepoResult<Vec<Screenshot>> {
    let mut blobs = BlobStore::new(conn);
    let mut stored = Vec::with_capacity(screenshots.len());

    for screenshot in screenshots {
        let source = match screenshot.source {
            ScreenshotSource::Pending { data, content_type } => {
                let content_type = match sniff_image_type(&data) {
                    Some(sniffed) => sniffed.to_string(),
                    None => content_type,
                };
                let key = BlobKey::generate();
                blobs.put(&key, &content_type, &data).await?;
                ScreenshotSource::Stored { key }
            }
            ScreenshotSource::Stored { key } => {
                if !owned.contains(&key) || !blobs.exists(&key).await? {
                    return Err(airship_core::Error::InvalidBlobReference(key.reference()).into());
                }
                ScreenshotSource::Stored { key }
            }
            external @ ScreenshotSource::External { .. } => external,
        };
        stored.push(Screenshot {
            caption: screenshot.caption,
            source,
            image: None,
        });
    }

    Ok(stored)
}

/// Attach the blob payload to every stored screenshot of `release`.
///
/// A missing or corrupted blob leaves that screenshot without an image
/// rather than failing the read.
async fn resolve_images(conn: &mut SqliteConnection, release: &mut Release) -> crate::Result<()> {
    let mut blobs = BlobStore::new(conn);
    for screenshot in &mut release.screenshots {
        let Some(key) = screenshot.source.blob_key() else {
            continue;
        };
        screenshot.image = match blobs.get(key).await {
            Ok(Some(blob)) => Some(ImageHandle {
                content_type: blob.content_type,
                data: blob.data,
            }),
            Ok(None) => {
                warn!(id = %release.id, %key, "Screenshot blob is missing");
                None
            }
            Err(StorageError::BlobCorrupted { key }) => {
                warn!(id = %release.id, %key, "Screenshot blob is corrupted");
                None
            }
            Err(e) => return Err(e),
        };
    }
    Ok(())
}

/// Map a UNIQUE constraint failure raised by the schema to the matching
/// duplicate outcome.
fn unique_violation(err: StorageError, title: &str, slug: &str) -> RepositoryError {
    if let StorageError::Database(sqlx::Error::Database(db)) = &err
        && db.is_unique_violation()
    {
        let message = db.message();
        if message.contains("releases.title") {
            return RepositoryError::DuplicateTitle(title.to_string());
        }
        if message.contains("releases.slug") {
            return RepositoryError::DuplicateSlug(slug.to_string());
        }
    }
    RepositoryError::StorageFault(err)
}
