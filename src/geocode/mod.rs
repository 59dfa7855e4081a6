use std::str::FromStr;

use anyhow::Context;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Human-readable location for a coordinate pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placemark {
    pub city: String,
    pub state: String,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("reverse geocoding request failed")]
    Transport(#[from] reqwest::Error),

    #[error("geocoding service returned no placemark")]
    NoPlacemark,
}

/// Client for a Nominatim-style reverse geocoding service.
pub struct Geocoder {
    http: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<ReverseAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
}

impl Geocoder {
    pub fn new(http: reqwest::Client, address: &str) -> anyhow::Result<Self> {
        let endpoint = Url::from_str(address)
            .and_then(|url| url.join("/reverse"))
            .context("invalid geocoding service url")?;

        Ok(Geocoder { http, endpoint })
    }

    /// Resolves a coordinate pair to (city, state). The first placemark the
    /// service reports wins; a response without one is an error, which the
    /// upload flow treats as fatal for the attempt.
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Placemark, GeocodeError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("format", "jsonv2")
            .append_pair("lat", &latitude.to_string())
            .append_pair("lon", &longitude.to_string());

        let response = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<ReverseResponse>()
            .await?;

        let address = response.address.ok_or(GeocodeError::NoPlacemark)?;

        let placemark = Placemark {
            city: address
                .city
                .or(address.town)
                .or(address.village)
                .unwrap_or_default(),
            state: address.state.unwrap_or_default(),
        };

        debug!(?placemark, "reverse geocoded ({latitude}, {longitude})");

        Ok(placemark)
    }
}
