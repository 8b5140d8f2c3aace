use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{error::AppError, geo::Coordinates};

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Coordinates, AppError>;
}

pub async fn distance_between<G>(geocoder: &G, start: &str, end: &str) -> Result<f64, AppError>
where
    G: Geocoder + ?Sized,
{
    let from = geocoder.resolve(start).await?;
    let to = geocoder.resolve(end).await?;
    Ok(from.distance_to(&to))
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

pub struct GoogleGeocoder {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl GoogleGeocoder {
    pub fn new(client: reqwest::Client, base_url: Url, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn request_url(&self, address: &str, api_key: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", api_key);
        url
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coordinates, AppError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("GOOGLE_MAPS_API_KEY is not set".into()))?;

        let response = self
            .client
            .get(self.request_url(address, api_key))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "geocoding API returned {}",
                response.status()
            )));
        }

        let body: GeocodingResponse = response.json().await?;
        let coordinates = first_location(body, address)?;
        debug!(address, lat = coordinates.lat, lng = coordinates.lng, "geocoded address");
        Ok(coordinates)
    }
}

fn first_location(body: GeocodingResponse, address: &str) -> Result<Coordinates, AppError> {
    match body.status.as_deref() {
        None | Some("OK") | Some("ZERO_RESULTS") => {}
        Some(other) => {
            return Err(AppError::Upstream(format!(
                "geocoding API answered with status {other}"
            )))
        }
    }

    body.results
        .into_iter()
        .next()
        .map(|result| Coordinates::new(result.geometry.location.lat, result.geometry.location.lng))
        .ok_or_else(|| AppError::NotFound(format!("no results found for address: {address}")))
}
