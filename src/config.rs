use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LibraryConfig {
    /// Directory that backs the photo library.
    pub media_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct UploadConfig {
    /// Base endpoint that uploads are POSTed to and that the uploaded
    /// listing is fetched from.
    #[serde(default = "default_upload_address")]
    pub address: String,

    /// Prefix the server prepends to storage keys in its listing.
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            address: default_upload_address(),
            storage_prefix: default_storage_prefix(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GeocodeConfig {
    /// Base address of the reverse geocoding service.
    #[serde(default = "default_geocode_address")]
    pub address: String,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        GeocodeConfig {
            address: default_geocode_address(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EncoderConfig {
    /// Path to the ffmpeg binary used for video export.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Where video exports are staged; defaults to the system temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            ffmpeg_path: default_ffmpeg_path(),
            temp_dir: None,
        }
    }
}

fn default_upload_address() -> String {
    "https://insta.baos.haus/instabao/images".to_owned()
}

fn default_storage_prefix() -> String {
    "baostagram/".to_owned()
}

fn default_geocode_address() -> String {
    "https://nominatim.openstreetmap.org".to_owned()
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

#[derive(Debug, Deserialize)]
pub struct InstabaoConfig {
    pub library: LibraryConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub geocode: GeocodeConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,
}

impl InstabaoConfig {
    pub fn read() -> Result<Self, ConfigError> {
        let mut c = Config::new();

        c.merge(File::with_name("instabao-admin"))?;
        c.merge(Environment::with_prefix("INSTABAO"))?;

        c.try_into()
    }

    pub fn read_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let mut c = Config::new();

        c.merge(File::from(path))?;
        c.merge(Environment::with_prefix("INSTABAO"))?;

        c.try_into()
    }
}
