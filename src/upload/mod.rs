mod client;
mod metadata;
mod request;

pub use client::UploadClient;
pub use metadata::UploadMetadata;
pub use request::build_upload_request;

use std::str::FromStr;

use anyhow::Context;
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    geocode::{GeocodeError, Geocoder},
    library::{Asset, MediaKind, PhotoLibrary},
    media::{EncodeError, MediaEncoder},
};

/// Everything that can go wrong during one upload attempt. The taxonomy is
/// kept through the whole pipeline and collapsed to a boolean only at the
/// user-facing boundary.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not resolve a placemark for the asset")]
    Geocode(#[from] GeocodeError),

    #[error("could not encode the asset for upload")]
    Encode(#[from] EncodeError),

    #[error("could not build a valid upload request")]
    InvalidUrl(#[source] reqwest::Error),

    #[error("could not deliver the upload request")]
    Transport(#[source] reqwest::Error),

    #[error("server rejected the upload with status {status}")]
    Server { status: reqwest::StatusCode },
}

/// Runs the full upload flow for single assets: resolve metadata, encode
/// media, build the request, send it. The steps for one asset are strictly
/// sequential and nothing is retried; distinct assets may be uploaded by
/// separate pipelines concurrently.
pub struct UploadPipeline {
    http: reqwest::Client,
    base_url: Url,
    client: UploadClient,
    geocoder: Geocoder,
    encoder: MediaEncoder,
}

impl UploadPipeline {
    pub fn new(
        http: reqwest::Client,
        address: &str,
        geocoder: Geocoder,
        encoder: MediaEncoder,
    ) -> anyhow::Result<Self> {
        Ok(UploadPipeline {
            base_url: Url::from_str(address).context("invalid upload endpoint url")?,
            client: UploadClient::new(http.clone()),
            http,
            geocoder,
            encoder,
        })
    }

    /// One upload attempt for one asset.
    pub async fn upload(
        &self,
        library: &dyn PhotoLibrary,
        asset: &Asset,
        description: &str,
    ) -> Result<(), UploadError> {
        debug!(id = asset.identifier(), "resolving upload metadata");
        let metadata = metadata::resolve(asset, description, &self.geocoder).await?;

        debug!(id = asset.identifier(), "encoding media");
        let media = match asset.media_kind {
            MediaKind::Image => {
                let source = library
                    .image_data(asset.identifier())
                    .await
                    .unwrap_or_else(|err| {
                        warn!("could not fetch image data: {err:#}");
                        None
                    })
                    .ok_or(EncodeError::MissingSource)?;

                self.encoder.encode_image(&source)?
            }
            MediaKind::Video => {
                let source = library
                    .video_source(asset.identifier())
                    .await
                    .unwrap_or_else(|err| {
                        warn!("could not locate video source: {err:#}");
                        None
                    })
                    .ok_or(EncodeError::MissingSource)?;

                self.encoder.encode_video(&source).await?
            }
        };

        debug!(id = asset.identifier(), "sending upload request");
        let request = request::build_upload_request(
            &self.http,
            &self.base_url,
            asset.identifier(),
            &metadata,
            media,
        )?;

        self.client.send(request).await
    }
}
