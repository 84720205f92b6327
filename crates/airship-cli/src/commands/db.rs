use airship_storage::{Migrator, ReleaseRepository};
use anyhow::Result;

use crate::cli::DbCommands;

pub async fn handle(cmd: DbCommands, repo: &ReleaseRepository) -> Result<()> {
    match cmd {
        DbCommands::Status => status(repo).await,
    }
}

async fn status(repo: &ReleaseRepository) -> Result<()> {
    let storage = repo.storage();
    let version = storage.schema_version().await?;
    let latest = Migrator::builtin().latest_version();
    let count = repo.count().await?;

    println!("Database: {}", storage.path().display());
    println!("  Schema version: {} (latest {})", version, latest);
    println!("  Releases: {}", count);

    Ok(())
}
