mod cli;
mod commands;

use airship_config::Config;
use airship_storage::{ReleaseRepository, Storage, StorageOptions, seed};
use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = cli
        .db
        .clone()
        .or_else(|| config.database.path.clone())
        .unwrap_or_else(Storage::default_path);
    let options = StorageOptions::new(path)
        .max_connections(config.database.max_connections)
        .busy_timeout(config.database.busy_timeout())
        .allow_destructive(config.database.allow_destructive_migrations);

    debug!(path = %options.path.display(), "Opening release database");
    // Opens the pool and brings the schema up to date
    let storage = Storage::open(options).await?;
    let repo = ReleaseRepository::new(storage);

    if config.seed_on_start && !matches!(cli.command, cli::Commands::Seed) {
        let inserted = seed(&repo).await?;
        if inserted > 0 {
            info!(inserted, "Seeded sample releases on start");
        }
    }

    let result = match cli.command {
        cli::Commands::Release(cmd) => commands::release::handle(cmd, &repo).await,
        cli::Commands::Seed => commands::seed::handle(&repo).await,
        cli::Commands::Db(cmd) => commands::db::handle(cmd, &repo).await,
    };

    repo.storage().close().await;
    result
}
