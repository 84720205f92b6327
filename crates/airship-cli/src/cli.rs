use std::path::PathBuf;

use airship_core::parse_release_date;
use clap::{Parser, Subcommand};
use time::Date;

#[derive(Parser)]
#[command(name = "airship")]
#[command(about = "Manage Airship Beta release announcements", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database file (overrides the configured path)
    #[arg(long, global = true, env = "AIRSHIP_DB")]
    pub db: Option<PathBuf>,

    /// Config file (default: platform config directory)
    #[arg(long, global = true, env = "AIRSHIP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage releases
    #[command(subcommand)]
    Release(ReleaseCommands),

    /// Insert the sample releases into an empty database
    Seed,

    /// Inspect the release database
    #[command(subcommand)]
    Db(DbCommands),
}

#[derive(Subcommand)]
pub enum ReleaseCommands {
    /// List releases, newest first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one release
    Show {
        /// Release ID or slug
        release: String,

        /// Write stored screenshots into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a release
    Create {
        #[arg(long)]
        title: String,

        /// Release date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Date,

        #[arg(long, default_value = "")]
        description: String,

        /// Markdown documentation
        #[arg(long, conflicts_with = "documentation_file")]
        documentation: Option<String>,

        /// Read markdown documentation from a file
        #[arg(long)]
        documentation_file: Option<PathBuf>,

        /// Upload an image file: PATH[::CAPTION]
        #[arg(long = "screenshot")]
        screenshots: Vec<String>,

        /// Reference a hosted image: URL[::CAPTION]
        #[arg(long = "screenshot-url")]
        screenshot_urls: Vec<String>,
    },

    /// Update a release
    Update {
        /// Release ID
        id: i64,

        #[arg(long)]
        title: Option<String>,

        /// Release date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,

        #[arg(long)]
        description: Option<String>,

        /// Markdown documentation
        #[arg(long, conflicts_with = "documentation_file")]
        documentation: Option<String>,

        /// Read markdown documentation from a file
        #[arg(long)]
        documentation_file: Option<PathBuf>,

        /// Remove the screenshot at this position (1-based, as listed by `show`)
        #[arg(long = "remove-screenshot")]
        remove_screenshots: Vec<usize>,

        /// Upload an image file: PATH[::CAPTION]
        #[arg(long = "add-screenshot")]
        add_screenshots: Vec<String>,

        /// Reference a hosted image: URL[::CAPTION]
        #[arg(long = "add-screenshot-url")]
        add_screenshot_urls: Vec<String>,
    },

    /// Delete a release and its stored screenshots
    Delete {
        /// Release ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Show database location, schema version and release count
    Status,
}

fn parse_date(input: &str) -> Result<Date, String> {
    parse_release_date(input).map_err(|e| e.to_string())
}
