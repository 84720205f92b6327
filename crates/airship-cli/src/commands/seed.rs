use airship_storage::{ReleaseRepository, seed};
use anyhow::Result;

pub async fn handle(repo: &ReleaseRepository) -> Result<()> {
    let inserted = seed(repo).await?;

    if inserted == 0 {
        println!("Database already has releases, nothing seeded.");
    } else {
        println!("✓ Seeded {} sample release(s)", inserted);
    }

    Ok(())
}
