mod fs;

pub use fs::FsPhotoLibrary;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Local};

/// A latitude/longitude pair.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Coords2D {
    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,
}

impl Coords2D {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coords2D {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Wire name used in the `mediaType` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Content type declared when uploading media of this kind. Images are
    /// always re-encoded as JPEG and videos exported as MP4 before upload.
    pub fn content_type(self) -> &'static str {
        match self {
            MediaKind::Image => "image/jpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "heic" => Some(MediaKind::Image),
            "mp4" | "mov" | "m4v" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// One media item in the local library.
#[derive(Debug, Clone)]
pub struct Asset {
    identifier: String,
    pub media_kind: MediaKind,
    pub is_favorite: bool,
    pub creation_time: Option<DateTime<Local>>,
    pub location: Option<Coords2D>,

    /// Session-scoped upload state. Set only after a confirmed upload or a
    /// tracker refresh that reports this asset; never persisted.
    pub is_uploaded: bool,
}

impl Asset {
    pub fn new(identifier: impl Into<String>, media_kind: MediaKind) -> Self {
        Asset {
            identifier: identifier.into(),
            media_kind,
            is_favorite: false,
            creation_time: None,
            location: None,
            is_uploaded: false,
        }
    }

    /// Stable identifier, unique across the library and the remote store.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Access to the device photo library. The admin task only ever talks to
/// the library through this interface; the directory-backed
/// [`FsPhotoLibrary`] is the production implementation.
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// Whether the library can be read at all.
    async fn is_authorized(&self) -> bool;

    /// Enumerates every asset currently in the library.
    async fn assets(&self) -> anyhow::Result<Vec<Asset>>;

    /// Raw source bytes for an image asset, or `None` when the asset has
    /// no retrievable data.
    async fn image_data(&self, identifier: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Filesystem source for a video asset, suitable for handing to the
    /// transcoder.
    async fn video_source(&self, identifier: &str) -> anyhow::Result<Option<PathBuf>>;

    async fn set_favorite(&self, identifier: &str, favorite: bool) -> anyhow::Result<()>;

    async fn delete(&self, identifier: &str) -> anyhow::Result<()>;
}
