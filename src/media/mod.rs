use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{config::EncoderConfig, library::MediaKind};

/// Encoded payload ready to ship to the upload endpoint.
#[derive(Debug, Clone)]
pub struct EncodedMedia {
    pub bytes: Vec<u8>,
    pub kind: MediaKind,
}

impl EncodedMedia {
    pub fn content_type(&self) -> &'static str {
        self.kind.content_type()
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("media source is empty or unavailable")]
    MissingSource,

    #[error("could not decode source image")]
    Image(#[from] image::ImageError),

    #[error("i/o failure while exporting media")]
    Io(#[from] std::io::Error),

    #[error("video export did not complete: {detail}")]
    ExportFailed { detail: String },
}

/// Turns library assets into deliverable payloads. Image sources are
/// re-encoded as maximum-quality JPEG; video sources go through an external
/// transcoder into an MP4 staged in a uniquely named temporary file, which
/// is removed on every exit path.
pub struct MediaEncoder {
    ffmpeg_path: PathBuf,
    temp_dir: PathBuf,
}

impl MediaEncoder {
    pub fn new(config: &EncoderConfig) -> Self {
        MediaEncoder {
            ffmpeg_path: config.ffmpeg_path.clone(),
            temp_dir: config.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Decodes `source` and re-encodes it as JPEG at maximum quality.
    pub fn encode_image(&self, source: &[u8]) -> Result<EncodedMedia, EncodeError> {
        if source.is_empty() {
            return Err(EncodeError::MissingSource);
        }

        let decoded = image::load_from_memory(source)?;

        let mut bytes = Vec::new();
        decoded.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, 100))?;

        Ok(EncodedMedia {
            bytes,
            kind: MediaKind::Image,
        })
    }

    /// Transcodes the video at `source` into a single MP4 optimized for
    /// network delivery and returns its bytes.
    pub async fn encode_video(&self, source: &Path) -> Result<EncodedMedia, EncodeError> {
        // unique staging path per call, so concurrent exports never share a
        // file; dropping the guard removes it no matter how we exit
        let staging = tempfile::Builder::new()
            .prefix("instabao-export-")
            .suffix(".mp4")
            .tempfile_in(&self.temp_dir)?;

        debug!(
            source = %source.display(),
            staging = %staging.path().display(),
            "starting video export"
        );

        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(source)
            .args(["-c:v", "libx264", "-preset", "slow", "-crf", "18"])
            .args(["-c:a", "aac"])
            .args(["-movflags", "+faststart", "-f", "mp4"])
            .arg(staging.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .last()
                .unwrap_or("transcoder exited with failure")
                .to_owned();

            warn!(status = ?output.status, "video export failed");

            return Err(EncodeError::ExportFailed { detail });
        }

        let bytes = tokio::fs::read(staging.path()).await?;

        if bytes.is_empty() {
            return Err(EncodeError::ExportFailed {
                detail: "transcoder produced no output".to_owned(),
            });
        }

        Ok(EncodedMedia {
            bytes,
            kind: MediaKind::Video,
        })
    }
}
