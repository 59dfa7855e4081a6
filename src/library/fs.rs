use std::{
    collections::HashSet,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use exif::{In, Tag, Value};

use super::{Asset, Coords2D, MediaKind, PhotoLibrary};

/// Directory-backed photo library. Every media file directly inside the
/// root is one asset; the file name is the asset identifier. Creation time
/// and GPS coordinates come from EXIF when the image carries them.
pub struct FsPhotoLibrary {
    root: PathBuf,
    // the platform keeps favorites for us on a device; here the flag only
    // lives for the session
    favorites: Mutex<HashSet<String>>,
}

impl FsPhotoLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsPhotoLibrary {
            root: root.into(),
            favorites: Mutex::new(HashSet::new()),
        }
    }

    fn path_for(&self, identifier: &str) -> PathBuf {
        self.root.join(identifier)
    }

    fn read_exif(path: &Path) -> Option<exif::Exif> {
        let file = std::fs::File::open(path).ok()?;

        exif::Reader::new()
            .read_from_container(&mut BufReader::new(file))
            .ok()
    }

    fn exif_creation_time(exif: &exif::Exif) -> Option<DateTime<Local>> {
        let field = exif
            .get_field(Tag::DateTimeOriginal, In::PRIMARY)
            .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))?;

        let ascii = match &field.value {
            Value::Ascii(parts) => parts.first()?,
            _ => return None,
        };

        let dt = exif::DateTime::from_ascii(ascii).ok()?;
        let naive = NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?
            .and_hms_opt(dt.hour.into(), dt.minute.into(), dt.second.into())?;

        Local.from_local_datetime(&naive).single()
    }

    fn exif_coordinate(exif: &exif::Exif, tag: Tag, ref_tag: Tag) -> Option<f64> {
        let field = exif.get_field(tag, In::PRIMARY)?;

        let degrees = match &field.value {
            Value::Rational(parts) if parts.len() >= 3 => {
                parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0
            }
            _ => return None,
        };

        let reference = exif.get_field(ref_tag, In::PRIMARY)?;
        let sign = match &reference.value {
            Value::Ascii(parts) => match parts.first().and_then(|s| s.first()) {
                Some(b'S') | Some(b'W') => -1.0,
                _ => 1.0,
            },
            _ => 1.0,
        };

        Some(sign * degrees)
    }

    fn exif_location(exif: &exif::Exif) -> Option<Coords2D> {
        let latitude = Self::exif_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef)?;
        let longitude = Self::exif_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef)?;

        Some(Coords2D::new(latitude, longitude))
    }

    fn asset_for(&self, path: &Path, identifier: String, kind: MediaKind) -> Asset {
        let is_favorite = self
            .favorites
            .lock()
            .map(|favorites| favorites.contains(&identifier))
            .unwrap_or(false);

        let mut asset = Asset::new(identifier, kind);
        asset.is_favorite = is_favorite;

        if kind == MediaKind::Image {
            if let Some(exif) = Self::read_exif(path) {
                asset.creation_time = Self::exif_creation_time(&exif);
                asset.location = Self::exif_location(&exif);
            }
        }

        if asset.creation_time.is_none() {
            asset.creation_time = std::fs::metadata(path)
                .and_then(|metadata| metadata.modified())
                .ok()
                .map(DateTime::<Local>::from);
        }

        asset
    }
}

#[async_trait]
impl PhotoLibrary for FsPhotoLibrary {
    async fn is_authorized(&self) -> bool {
        tokio::fs::read_dir(&self.root).await.is_ok()
    }

    async fn assets(&self) -> anyhow::Result<Vec<Asset>> {
        let mut entries = tokio::fs::read_dir(&self.root).await.with_context(|| {
            format!("could not read media directory {}", self.root.display())
        })?;

        let mut assets = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let path = entry.path();

            let kind = match path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(MediaKind::from_extension)
            {
                Some(kind) => kind,
                None => continue,
            };

            let identifier = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_owned(),
                None => continue,
            };

            assets.push(self.asset_for(&path, identifier, kind));
        }

        assets.sort_by(|a, b| a.identifier().cmp(b.identifier()));

        Ok(assets)
    }

    async fn image_data(&self, identifier: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(identifier)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("could not read image data for {}", identifier))
            }
        }
    }

    async fn video_source(&self, identifier: &str) -> anyhow::Result<Option<PathBuf>> {
        let path = self.path_for(identifier);

        Ok(tokio::fs::try_exists(&path).await?.then_some(path))
    }

    async fn set_favorite(&self, identifier: &str, favorite: bool) -> anyhow::Result<()> {
        let mut favorites = self
            .favorites
            .lock()
            .map_err(|_| anyhow::anyhow!("favorite set lock poisoned"))?;

        if favorite {
            favorites.insert(identifier.to_owned());
        } else {
            favorites.remove(identifier);
        }

        Ok(())
    }

    async fn delete(&self, identifier: &str) -> anyhow::Result<()> {
        tokio::fs::remove_file(self.path_for(identifier))
            .await
            .with_context(|| format!("could not delete asset {}", identifier))
    }
}
