//! Core domain models for Airship Beta
//!
//! This crate contains:
//! - Domain models (Release, Screenshot)
//! - Slug derivation
//! - Blob references used by screenshots
//! - Image type detection for uploads

pub mod error;
pub mod release;
pub mod screenshot;
pub mod slug;

pub use error::{Error, Result};
pub use release::{NewRelease, Release, ReleaseId, ReleaseStatus, parse_release_date};
pub use screenshot::{
    BLOB_REFERENCE_PREFIX, BlobKey, ImageHandle, Screenshot, ScreenshotSource, sniff_image_type,
};
pub use slug::slugify;
