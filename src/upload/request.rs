use reqwest::{header::CONTENT_TYPE, Client, Request, Url};

use super::{UploadError, UploadMetadata};
use crate::media::EncodedMedia;

/// Builds the outbound upload request: POST to the base endpoint with the
/// full query string and the raw media bytes as the body. Every parameter
/// is present on every request, even when empty or defaulted.
pub fn build_upload_request(
    http: &Client,
    base_url: &Url,
    asset_id: &str,
    metadata: &UploadMetadata,
    media: EncodedMedia,
) -> Result<Request, UploadError> {
    let mut url = base_url.clone();

    url.query_pairs_mut()
        .append_pair("id", asset_id)
        .append_pair("description", &metadata.description)
        .append_pair("latitude", &metadata.latitude.to_string())
        .append_pair("longitude", &metadata.longitude.to_string())
        .append_pair("creationDate", &metadata.creation_date)
        .append_pair("city", &metadata.city)
        .append_pair("state", &metadata.state)
        .append_pair("mediaType", media.kind.as_str());

    let content_type = media.content_type();

    http.post(url)
        .header(CONTENT_TYPE, content_type)
        .body(media.bytes)
        .build()
        .map_err(UploadError::InvalidUrl)
}
