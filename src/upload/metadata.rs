use chrono::Local;

use crate::{
    geocode::{GeocodeError, Geocoder, Placemark},
    library::Asset,
    util::ISO_8601_FORMAT,
};

/// Query-string metadata for one upload attempt. Built fresh every attempt
/// and never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadMetadata {
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub creation_date: String,
    pub city: String,
    pub state: String,
}

/// Resolves the metadata for one attempt. A missing location falls back to
/// (0, 0) and a missing creation time to the current wall clock; a failed
/// reverse geocode aborts the attempt.
pub(crate) async fn resolve(
    asset: &Asset,
    description: &str,
    geocoder: &Geocoder,
) -> Result<UploadMetadata, GeocodeError> {
    let (latitude, longitude) = match asset.location {
        Some(coords) => (coords.latitude, coords.longitude),
        None => (0.0, 0.0),
    };

    let creation_date = asset
        .creation_time
        .unwrap_or_else(Local::now)
        .format(ISO_8601_FORMAT)
        .to_string();

    let Placemark { city, state } = geocoder.reverse(latitude, longitude).await?;

    Ok(UploadMetadata {
        description: description.to_owned(),
        latitude,
        longitude,
        creation_date,
        city,
        state,
    })
}
