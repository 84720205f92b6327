//! Screenshot value objects and blob references

use std::fmt;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Textual prefix of a screenshot URL that points into the blob store.
pub const BLOB_REFERENCE_PREFIX: &str = "blob:/";

/// Key of a screenshot payload in the blob store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobKey(String);

impl BlobKey {
    /// Fresh random key for a new upload.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `blob:/<key>` form used wherever a screenshot URL is expected.
    pub fn reference(&self) -> String {
        format!("{}{}", BLOB_REFERENCE_PREFIX, self.0)
    }

    /// Parse a `blob:/<key>` reference.
    pub fn from_reference(reference: &str) -> Result<Self> {
        match reference.strip_prefix(BLOB_REFERENCE_PREFIX) {
            Some(key) if !key.is_empty() && !key.contains('/') => Ok(Self(key.to_string())),
            _ => Err(Error::InvalidBlobReference(reference.to_string())),
        }
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the image of a screenshot comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScreenshotSource {
    /// Freshly uploaded file. Replaced by `Stored` before the release is
    /// persisted and never written as-is.
    #[serde(skip)]
    Pending { data: Vec<u8>, content_type: String },

    /// Payload kept in the local blob store.
    Stored { key: BlobKey },

    /// Image hosted elsewhere.
    External { url: String },
}

impl ScreenshotSource {
    /// Interpret a screenshot URL: `blob:/<key>` is a stored blob, anything
    /// else is an external image.
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with(BLOB_REFERENCE_PREFIX) {
            Ok(Self::Stored {
                key: BlobKey::from_reference(url)?,
            })
        } else {
            Ok(Self::External {
                url: url.to_string(),
            })
        }
    }

    /// URL form of a persisted source; `None` while the upload is pending.
    pub fn url(&self) -> Option<String> {
        match self {
            Self::Pending { .. } => None,
            Self::Stored { key } => Some(key.reference()),
            Self::External { url } => Some(url.clone()),
        }
    }

    pub fn blob_key(&self) -> Option<&BlobKey> {
        match self {
            Self::Stored { key } => Some(key),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Displayable image resolved from the blob store on read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageHandle {
    /// File extension matching the content type, used when exporting.
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
    }
}

/// Content type of a PNG, JPEG, GIF or WebP payload, judged by its leading
/// bytes. `None` for anything else.
pub fn sniff_image_type(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP) => {
            Some(format.to_mime_type())
        }
        _ => None,
    }
}

/// A captioned screenshot embedded in a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub caption: String,
    pub source: ScreenshotSource,
    /// Populated on read for stored screenshots; never persisted.
    #[serde(skip)]
    pub image: Option<ImageHandle>,
}

impl Screenshot {
    pub fn external(url: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            source: ScreenshotSource::External { url: url.into() },
            image: None,
        }
    }

    pub fn upload(
        data: Vec<u8>,
        content_type: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            caption: caption.into(),
            source: ScreenshotSource::Pending {
                data,
                content_type: content_type.into(),
            },
            image: None,
        }
    }
}
