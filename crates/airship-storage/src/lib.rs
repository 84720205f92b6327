//! Storage layer for Airship Beta
//!
//! This crate provides:
//! - SQLite database handle and schema migrations
//! - Blob storage for uploaded screenshots
//! - Release record storage with unique title/slug indexes
//! - The release repository that enforces the invariants across both
//! - Sample data seeding

pub mod blob;
pub mod db;
pub mod error;
pub mod migrations;
pub mod records;
pub mod repository;
pub mod seed;

pub use blob::{BlobStore, StoredBlob};
pub use db::{Storage, StorageOptions};
pub use error::{RepositoryError, Result, StorageError};
pub use migrations::{Migration, MigrationReport, Migrator, Step};
pub use records::{RecordStore, ReleaseRecord};
pub use repository::ReleaseRepository;
pub use seed::{sample_releases, seed};
