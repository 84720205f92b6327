//! Versioned schema migrations
//!
//! The schema version lives in SQLite's `PRAGMA user_version`. Pending
//! migrations are applied in one `BEGIN IMMEDIATE` transaction together with
//! the version bump, so a second process opening the same file waits for the
//! upgrade to commit and then sees the finished schema.

use std::collections::HashSet;

use airship_core::slugify;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::db::Storage;
use crate::{Result, StorageError};

/// One unit of work inside a migration
#[derive(Debug, Clone)]
pub enum Step {
    /// A single SQL statement.
    Sql(&'static str),
    /// Derive a slug for every release that has none.
    BackfillSlugs,
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    /// Drops existing data. Only applied when explicitly allowed.
    pub destructive: bool,
    pub steps: Vec<Step>,
}

impl Migration {
    pub fn additive(version: i64, description: &'static str, steps: Vec<Step>) -> Self {
        Self {
            version,
            description,
            destructive: false,
            steps,
        }
    }

    pub fn destructive(version: i64, description: &'static str, steps: Vec<Step>) -> Self {
        Self {
            version,
            description,
            destructive: true,
            steps,
        }
    }
}

/// Versions before and after a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub from: i64,
    pub to: i64,
}

impl MigrationReport {
    pub fn applied(&self) -> bool {
        self.to > self.from
    }
}

#[derive(Debug, Clone)]
pub struct Migrator {
    migrations: Vec<Migration>,
}

impl Migrator {
    pub fn new(mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by_key(|m| m.version);
        Self { migrations }
    }

    /// The release schema as shipped.
    pub fn builtin() -> Self {
        Self::new(vec![
            Migration::additive(
                1,
                "create releases",
                vec![
                    Step::Sql(
                        "CREATE TABLE IF NOT EXISTS releases (
                            id INTEGER PRIMARY KEY AUTOINCREMENT,
                            title TEXT NOT NULL UNIQUE,
                            date TEXT NOT NULL,
                            description TEXT NOT NULL DEFAULT '',
                            status TEXT NOT NULL DEFAULT 'Beta',
                            documentation TEXT NOT NULL DEFAULT '',
                            created_at TEXT NOT NULL,
                            updated_at TEXT
                        )",
                    ),
                    Step::Sql("CREATE INDEX IF NOT EXISTS idx_releases_date ON releases (date)"),
                ],
            ),
            Migration::additive(
                2,
                "add screenshots and blob store",
                vec![
                    Step::Sql(
                        "ALTER TABLE releases ADD COLUMN screenshots TEXT NOT NULL DEFAULT '[]'",
                    ),
                    Step::Sql(
                        "CREATE TABLE IF NOT EXISTS blobs (
                            key TEXT PRIMARY KEY NOT NULL,
                            content_type TEXT NOT NULL,
                            data BLOB NOT NULL,
                            size_bytes INTEGER NOT NULL,
                            content_hash TEXT NOT NULL,
                            created_at TEXT NOT NULL
                        )",
                    ),
                ],
            ),
            Migration::additive(
                3,
                "add unique slugs",
                vec![
                    Step::Sql("ALTER TABLE releases ADD COLUMN slug TEXT"),
                    Step::BackfillSlugs,
                    Step::Sql(
                        "CREATE UNIQUE INDEX IF NOT EXISTS idx_releases_slug ON releases (slug)",
                    ),
                ],
            ),
        ])
    }

    /// Append a migration, keeping version order.
    pub fn with(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self.migrations.sort_by_key(|m| m.version);
        self
    }

    /// Only the migrations up to and including `version`.
    pub fn up_to(&self, version: i64) -> Self {
        Self {
            migrations: self
                .migrations
                .iter()
                .filter(|m| m.version <= version)
                .cloned()
                .collect(),
        }
    }

    pub fn latest_version(&self) -> i64 {
        self.migrations.last().map(|m| m.version).unwrap_or(0)
    }

    /// Apply every migration newer than the stored schema version.
    pub async fn run(&self, storage: &Storage, allow_destructive: bool) -> Result<MigrationReport> {
        let mut tx = storage.begin_write().await?;

        let from: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&mut *tx)
            .await?;
        let latest = self.latest_version();
        if from > latest {
            return Err(StorageError::SchemaTooNew {
                found: from,
                supported: latest,
            });
        }

        let pending: Vec<&Migration> = self
            .migrations
            .iter()
            .filter(|m| m.version > from)
            .collect();

        if !allow_destructive
            && let Some(m) = pending.iter().find(|m| m.destructive)
        {
            return Err(StorageError::DestructiveMigration { version: m.version });
        }

        for migration in &pending {
            info!(
                version = migration.version,
                description = migration.description,
                destructive = migration.destructive,
                "Applying schema migration"
            );
            for step in &migration.steps {
                apply_step(&mut *tx, step).await?;
            }
            // PRAGMA does not take bound parameters
            let bump = format!("PRAGMA user_version = {}", migration.version);
            sqlx::query(&bump).execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(MigrationReport {
            from,
            to: pending.last().map(|m| m.version).unwrap_or(from),
        })
    }
}

async fn apply_step(conn: &mut SqliteConnection, step: &Step) -> Result<()> {
    match step {
        Step::Sql(sql) => {
            sqlx::query(*sql).execute(&mut *conn).await?;
        }
        Step::BackfillSlugs => {
            let filled = backfill_slugs(conn).await?;
            debug!(filled, "Backfilled release slugs");
        }
    }
    Ok(())
}

/// Give every slug-less release the slug of its title. Collisions among
/// derived slugs get a numeric suffix (`-2`, `-3`, ...) in id order.
async fn backfill_slugs(conn: &mut SqliteConnection) -> Result<usize> {
    let mut taken: HashSet<String> = sqlx::query_scalar::<_, String>(
        "SELECT slug FROM releases WHERE slug IS NOT NULL AND slug <> ''",
    )
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .collect();

    let missing: Vec<(i64, String)> = sqlx::query_as(
        "SELECT id, title FROM releases WHERE slug IS NULL OR slug = '' ORDER BY id",
    )
    .fetch_all(&mut *conn)
    .await?;

    for (id, title) in &missing {
        let mut base = slugify(title);
        if base.is_empty() {
            base = format!("release-{id}");
        }

        let mut slug = base.clone();
        let mut n = 2;
        while taken.contains(&slug) {
            slug = format!("{base}-{n}");
            n += 1;
        }

        sqlx::query("UPDATE releases SET slug = ? WHERE id = ?")
            .bind(&slug)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        taken.insert(slug);
    }

    Ok(missing.len())
}
