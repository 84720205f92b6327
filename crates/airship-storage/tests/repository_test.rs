use airship_core::{
    BlobKey, NewRelease, ReleaseId, ReleaseStatus, Screenshot, ScreenshotSource,
};
use airship_storage::{RepositoryError, ReleaseRepository, Storage, StorageError};
use tempfile::TempDir;
use time::macros::date;

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3, 4];

async fn open_repo() -> (TempDir, ReleaseRepository) {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(Some(temp_dir.path().join("test.db")))
        .await
        .unwrap();
    (temp_dir, ReleaseRepository::new(storage))
}

fn beta_x() -> NewRelease {
    NewRelease::new("Beta X", date!(2025 - 01 - 01))
        .with_description("d")
        .with_documentation("# doc")
}

async fn blob_rows(repo: &ReleaseRepository) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM blobs")
        .fetch_one(repo.storage().pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_then_get_by_id() {
    let (_dir, repo) = open_repo().await;

    let id = repo.create(beta_x()).await.unwrap();
    let release = repo.get_by_id(id).await.unwrap();

    assert_eq!(release.id, id);
    assert_eq!(release.title, "Beta X");
    assert_eq!(release.slug, "beta-x");
    assert_eq!(release.date, date!(2025 - 01 - 01));
    assert_eq!(release.description, "d");
    assert_eq!(release.documentation, "# doc");
    assert_eq!(release.status, ReleaseStatus::Beta);
    assert!(release.screenshots.is_empty());
    assert!(release.updated_at.is_none());
    assert!(release.created_at <= time::OffsetDateTime::now_utc());
}

#[tokio::test]
async fn test_duplicate_title_leaves_store_unchanged() {
    let (_dir, repo) = open_repo().await;
    repo.create(beta_x()).await.unwrap();

    let err = repo.create(beta_x()).await.unwrap_err();

    assert!(matches!(err, RepositoryError::DuplicateTitle(ref t) if t == "Beta X"));
    assert!(err.is_recoverable());
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_slug_rejected() {
    let (_dir, repo) = open_repo().await;
    repo.create(beta_x()).await.unwrap();

    let err = repo
        .create(NewRelease::new("beta x!", date!(2025 - 02 - 01)))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::DuplicateSlug(ref s) if s == "beta-x"));
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_title_without_alphanumerics_rejected() {
    let (_dir, repo) = open_repo().await;

    let err = repo
        .create(NewRelease::new("?!", date!(2025 - 02 - 01)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RepositoryError::Invalid(airship_core::Error::InvalidTitle(_))
    ));
}

#[tokio::test]
async fn test_list_is_newest_first_and_stable() {
    let (_dir, repo) = open_repo().await;
    let older = repo
        .create(NewRelease::new("Older", date!(2024 - 12 - 01)))
        .await
        .unwrap();
    let tie_a = repo
        .create(NewRelease::new("Tie A", date!(2025 - 01 - 10)))
        .await
        .unwrap();
    let newest = repo
        .create(NewRelease::new("Newest", date!(2025 - 03 - 01)))
        .await
        .unwrap();
    let tie_b = repo
        .create(NewRelease::new("Tie B", date!(2025 - 01 - 10)))
        .await
        .unwrap();

    let first: Vec<ReleaseId> = repo.list().await.into_iter().map(|r| r.id).collect();
    let second: Vec<ReleaseId> = repo.list().await.into_iter().map(|r| r.id).collect();

    assert_eq!(first, vec![newest, tie_a, tie_b, older]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_uploads_are_stored_and_resolved() {
    let (_dir, repo) = open_repo().await;

    let id = repo
        .create(
            beta_x()
                .with_screenshot(Screenshot::upload(PNG_BYTES.to_vec(), "image/png", "Upload"))
                .with_screenshot(Screenshot::external("https://example.com/b.png", "External")),
        )
        .await
        .unwrap();

    let release = repo.get_by_id(id).await.unwrap();
    assert_eq!(release.screenshots.len(), 2);

    let uploaded = &release.screenshots[0];
    assert_eq!(uploaded.caption, "Upload");
    let key = uploaded.source.blob_key().cloned().unwrap();
    assert!(uploaded.source.url().unwrap().starts_with("blob:/"));
    let image = uploaded.image.as_ref().unwrap();
    assert_eq!(image.data, PNG_BYTES);
    assert_eq!(image.content_type, "image/png");
    assert_eq!(image.extension(), "png");

    let external = &release.screenshots[1];
    assert_eq!(
        external.source,
        ScreenshotSource::External {
            url: "https://example.com/b.png".to_string()
        }
    );
    assert!(external.image.is_none());

    assert!(repo.blob(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_list_resolves_images() {
    let (_dir, repo) = open_repo().await;
    repo.create(
        beta_x().with_screenshot(Screenshot::upload(PNG_BYTES.to_vec(), "image/png", "Upload")),
    )
    .await
    .unwrap();

    let releases = repo.list().await;
    assert_eq!(releases.len(), 1);
    let image = releases[0].screenshots[0].image.as_ref().unwrap();
    assert_eq!(image.data, PNG_BYTES);
}

#[tokio::test]
async fn test_delete_removes_release_and_blobs() {
    let (_dir, repo) = open_repo().await;
    let id = repo
        .create(
            beta_x()
                .with_screenshot(Screenshot::upload(PNG_BYTES.to_vec(), "image/png", "one"))
                .with_screenshot(Screenshot::upload(vec![9, 9, 9], "image/gif", "two")),
        )
        .await
        .unwrap();
    let keys = repo.get_by_id(id).await.unwrap().blob_keys();
    assert_eq!(keys.len(), 2);

    repo.delete(id).await.unwrap();

    assert!(repo.get_by_id(id).await.is_none());
    for key in &keys {
        assert!(repo.blob(key).await.unwrap().is_none());
    }
    assert_eq!(blob_rows(&repo).await, 0);
    assert!(matches!(
        repo.delete(id).await,
        Err(RepositoryError::NotFound(missing)) if missing == id
    ));
}

#[tokio::test]
async fn test_update_title_regenerates_slug() {
    let (_dir, repo) = open_repo().await;
    let id = repo.create(beta_x()).await.unwrap();
    let created = repo.get_by_id(id).await.unwrap();

    let mut release = created.clone();
    release.title = "Beta X Reloaded".to_string();
    release.slug = "ignored".to_string();
    repo.update(release).await.unwrap();

    let updated = repo.get_by_id(id).await.unwrap();
    assert_eq!(updated.slug, "beta-x-reloaded");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at.is_some());
    assert!(repo.get_by_slug("beta-x").await.is_none());
    assert_eq!(repo.get_by_slug("beta-x-reloaded").await.unwrap().id, id);
}

#[tokio::test]
async fn test_update_without_title_change_keeps_slug() {
    let (_dir, repo) = open_repo().await;
    let id = repo.create(beta_x()).await.unwrap();

    let mut release = repo.get_by_id(id).await.unwrap();
    release.description = "new description".to_string();
    release.slug = "something-else".to_string();
    repo.update(release).await.unwrap();

    let updated = repo.get_by_id(id).await.unwrap();
    assert_eq!(updated.slug, "beta-x");
    assert_eq!(updated.description, "new description");
}

#[tokio::test]
async fn test_update_rejects_slug_of_another_release() {
    let (_dir, repo) = open_repo().await;
    repo.create(beta_x()).await.unwrap();
    let other = repo
        .create(NewRelease::new("Gamma", date!(2025 - 02 - 01)))
        .await
        .unwrap();

    let mut release = repo.get_by_id(other).await.unwrap();
    release.title = "Beta-X".to_string();
    let err = repo.update(release).await.unwrap_err();
    assert!(matches!(err, RepositoryError::DuplicateSlug(ref s) if s == "beta-x"));

    let mut release = repo.get_by_id(other).await.unwrap();
    release.title = "Beta X".to_string();
    let err = repo.update(release).await.unwrap_err();
    assert!(matches!(err, RepositoryError::DuplicateTitle(_)));

    assert_eq!(repo.get_by_id(other).await.unwrap().slug, "gamma");
}

#[tokio::test]
async fn test_update_missing_release() {
    let (_dir, repo) = open_repo().await;
    let id = repo.create(beta_x()).await.unwrap();
    let mut release = repo.get_by_id(id).await.unwrap();
    release.id = ReleaseId(id.0 + 100);

    let err = repo.update(release).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn test_update_replaces_screenshots_and_drops_stale_blobs() {
    let (_dir, repo) = open_repo().await;
    let id = repo
        .create(
            beta_x()
                .with_screenshot(Screenshot::upload(PNG_BYTES.to_vec(), "image/png", "keep"))
                .with_screenshot(Screenshot::upload(vec![1, 1], "image/png", "drop")),
        )
        .await
        .unwrap();
    let mut release = repo.get_by_id(id).await.unwrap();
    let kept_key = release.screenshots[0].source.blob_key().cloned().unwrap();
    let dropped_key = release.screenshots[1].source.blob_key().cloned().unwrap();

    release.screenshots.truncate(1);
    release
        .screenshots
        .push(Screenshot::upload(vec![2, 2, 2], "image/webp", "added"));
    repo.update(release).await.unwrap();

    let updated = repo.get_by_id(id).await.unwrap();
    let captions: Vec<&str> = updated.screenshots.iter().map(|s| s.caption.as_str()).collect();
    assert_eq!(captions, vec!["keep", "added"]);
    assert_eq!(updated.screenshots[0].source.blob_key(), Some(&kept_key));
    assert_eq!(updated.screenshots[1].image.as_ref().unwrap().data, vec![2, 2, 2]);
    assert!(repo.blob(&dropped_key).await.unwrap().is_none());
    assert_eq!(blob_rows(&repo).await, 2);
}

#[tokio::test]
async fn test_update_rejects_foreign_blob_reference() {
    let (_dir, repo) = open_repo().await;
    let owner = repo
        .create(
            beta_x().with_screenshot(Screenshot::upload(PNG_BYTES.to_vec(), "image/png", "a")),
        )
        .await
        .unwrap();
    let other = repo
        .create(NewRelease::new("Gamma", date!(2025 - 02 - 01)))
        .await
        .unwrap();
    let foreign = repo.get_by_id(owner).await.unwrap().screenshots[0].clone();

    let mut release = repo.get_by_id(other).await.unwrap();
    release.screenshots.push(foreign);
    let err = repo.update(release).await.unwrap_err();

    assert!(matches!(
        err,
        RepositoryError::Invalid(airship_core::Error::InvalidBlobReference(_))
    ));
}

#[tokio::test]
async fn test_failed_create_leaves_no_orphan_blobs() {
    let (_dir, repo) = open_repo().await;

    let err = repo
        .create(
            beta_x()
                .with_screenshot(Screenshot::upload(PNG_BYTES.to_vec(), "image/png", "ok"))
                .with_screenshot(Screenshot {
                    caption: "bogus".to_string(),
                    source: ScreenshotSource::Stored {
                        key: BlobKey::new("not-uploaded"),
                    },
                    image: None,
                }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Invalid(_)));
    assert_eq!(repo.count().await.unwrap(), 0);
    assert_eq!(blob_rows(&repo).await, 0);
}

#[tokio::test]
async fn test_get_accepts_id_or_slug() {
    let (_dir, repo) = open_repo().await;
    let id = repo.create(beta_x()).await.unwrap();

    assert_eq!(repo.get(&id.to_string()).await.unwrap().id, id);
    assert_eq!(repo.get("beta-x").await.unwrap().id, id);
    assert!(repo.get("missing").await.is_none());
    assert!(repo.get("999").await.is_none());
}

#[tokio::test]
async fn test_reads_degrade_after_storage_fault() {
    let (_dir, repo) = open_repo().await;
    let id = repo.create(beta_x()).await.unwrap();

    repo.storage().close().await;

    assert!(repo.list().await.is_empty());
    assert!(repo.get_by_id(id).await.is_none());
    assert!(repo.get_by_slug("beta-x").await.is_none());

    let err = repo
        .create(NewRelease::new("After close", date!(2025 - 02 - 01)))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::StorageFault(_)));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_two_sessions_share_uniqueness() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("shared.db");
    let first = ReleaseRepository::new(Storage::new(Some(path.clone())).await.unwrap());
    let second = ReleaseRepository::new(Storage::new(Some(path)).await.unwrap());

    let id = first.create(beta_x()).await.unwrap();

    assert_eq!(second.get_by_slug("beta-x").await.unwrap().id, id);
    assert!(matches!(
        second.create(beta_x()).await,
        Err(RepositoryError::DuplicateTitle(_))
    ));
}

#[tokio::test]
async fn test_repository_usable_after_failure() {
    let (_dir, repo) = open_repo().await;
    repo.create(beta_x()).await.unwrap();
    assert!(repo.create(beta_x()).await.is_err());

    let id = repo
        .create(NewRelease::new("Beta Y", date!(2025 - 01 - 02)))
        .await
        .unwrap();
    assert_eq!(repo.get_by_id(id).await.unwrap().slug, "beta-y");
}

#[tokio::test]
async fn test_missing_blob_degrades_reads_and_delete_still_succeeds() {
    let (_dir, repo) = open_repo().await;
    let id = repo
        .create(
            beta_x().with_screenshot(Screenshot::upload(PNG_BYTES.to_vec(), "image/png", "lost")),
        )
        .await
        .unwrap();
    sqlx::query("DELETE FROM blobs")
        .execute(repo.storage().pool())
        .await
        .unwrap();

    let release = repo.get_by_id(id).await.unwrap();
    assert_eq!(release.screenshots.len(), 1);
    assert_eq!(release.screenshots[0].caption, "lost");
    assert!(release.screenshots[0].source.blob_key().is_some());
    assert!(release.screenshots[0].image.is_none());

    repo.delete(id).await.unwrap();
    assert!(repo.get_by_id(id).await.is_none());
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_corrupted_blob_does_not_hide_release() {
    let (_dir, repo) = open_repo().await;
    let id = repo
        .create(
            beta_x().with_screenshot(Screenshot::upload(PNG_BYTES.to_vec(), "image/png", "bad")),
        )
        .await
        .unwrap();
    let key = repo.get_by_id(id).await.unwrap().blob_keys()[0].clone();
    sqlx::query("UPDATE blobs SET data = ? WHERE key = ?")
        .bind(&b"tampered"[..])
        .bind(key.as_str())
        .execute(repo.storage().pool())
        .await
        .unwrap();

    let releases = repo.list().await;
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].id, id);
    assert!(releases[0].screenshots[0].image.is_none());

    assert!(matches!(
        repo.blob(&key).await,
        Err(RepositoryError::StorageFault(StorageError::BlobCorrupted { .. }))
    ));
}

#[tokio::test]
async fn test_upload_content_type_follows_signature() {
    let (_dir, repo) = open_repo().await;
    let jpeg = vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];
    let id = repo
        .create(
            beta_x()
                .with_screenshot(Screenshot::upload(jpeg.clone(), "image/png", "mislabeled"))
                .with_screenshot(Screenshot::upload(vec![7, 7], "image/webp", "unknown")),
        )
        .await
        .unwrap();

    let release = repo.get_by_id(id).await.unwrap();
    let sniffed = release.screenshots[0].image.as_ref().unwrap();
    assert_eq!(sniffed.content_type, "image/jpeg");
    assert_eq!(sniffed.extension(), "jpg");
    assert_eq!(sniffed.data, jpeg);

    let declared = release.screenshots[1].image.as_ref().unwrap();
    assert_eq!(declared.content_type, "image/webp");
}

#[tokio::test]
async fn test_update_rejects_reference_to_vanished_blob() {
    let (_dir, repo) = open_repo().await;
    let id = repo
        .create(
            beta_x().with_screenshot(Screenshot::upload(PNG_BYTES.to_vec(), "image/png", "gone")),
        )
        .await
        .unwrap();
    sqlx::query("DELETE FROM blobs")
        .execute(repo.storage().pool())
        .await
        .unwrap();

    let mut release = repo.get_by_id(id).await.unwrap();
    release.description = "edited".to_string();
    let err = repo.update(release).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Invalid(airship_core::Error::InvalidBlobReference(_))
    ));
    assert_eq!(repo.get_by_id(id).await.unwrap().description, "d");
}
