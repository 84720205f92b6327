//! Release domain model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::screenshot::{BlobKey, Screenshot};
use crate::{Error, Result};

time::serde::format_description!(release_date, Date, "[year]-[month]-[day]");

/// Store-assigned identifier of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(pub i64);

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReleaseId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Publication status of a release. Only betas are announced today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReleaseStatus {
    #[default]
    Beta,
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Beta => "Beta",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Beta" => Ok(ReleaseStatus::Beta),
            other => Err(format!("unknown release status: {other}")),
        }
    }
}

/// Parse a `YYYY-MM-DD` release date.
pub fn parse_release_date(input: &str) -> Result<Date> {
    Date::parse(input.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::InvalidDate(input.to_string()))
}

/// An announced feature release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub title: String,
    pub slug: String,
    #[serde(with = "release_date")]
    pub date: Date,
    pub description: String,
    pub documentation: String,
    pub status: ReleaseStatus,
    pub screenshots: Vec<Screenshot>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub updated_at: Option<OffsetDateTime>,
}

impl Release {
    /// Blob keys referenced by this release's screenshots, in display order.
    pub fn blob_keys(&self) -> Vec<BlobKey> {
        self.screenshots
            .iter()
            .filter_map(|s| s.source.blob_key().cloned())
            .collect()
    }
}

/// Fields supplied by the caller when creating a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRelease {
    pub title: String,
    #[serde(with = "release_date")]
    pub date: Date,
    pub description: String,
    pub documentation: String,
    #[serde(default)]
    pub status: ReleaseStatus,
    #[serde(default)]
    pub screenshots: Vec<Screenshot>,
}

impl NewRelease {
    pub fn new(title: impl Into<String>, date: Date) -> Self {
        Self {
            title: title.into(),
            date,
            description: String::new(),
            documentation: String::new(),
            status: ReleaseStatus::Beta,
            screenshots: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }

    pub fn with_screenshot(mut self, screenshot: Screenshot) -> Self {
        self.screenshots.push(screenshot);
        self
    }
}
