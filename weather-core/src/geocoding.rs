//! Forward geocoding: fill in coordinates for a city/country pair.
//! Uses the geocode.maps.co search endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use crate::{
    error::WeatherError,
    http::{endpoint, get_json},
    model::{Coordinates, Location},
};

pub const DEFAULT_BASE_URL: &str = "https://geocode.maps.co";

const NAME: &str = "geocoding";

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Return `location` with coordinates filled in.
    ///
    /// Fails with [`WeatherError::NotFound`] when no candidate is a city or an
    /// administrative boundary.
    async fn resolve(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Location, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct MapsCoGeocoder {
    api_key: String,
    base_url: String,
    http: Client,
}

impl MapsCoGeocoder {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self { api_key, base_url: base_url.into(), http: Client::new() }
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    lat: String,
    lon: String,
    #[serde(default)]
    class: String,
    #[serde(rename = "type", default)]
    kind: String,
}

impl Candidate {
    fn is_settlement(&self) -> bool {
        matches!(
            (self.class.as_str(), self.kind.as_str()),
            ("place", "city") | ("boundary", "administrative")
        )
    }
}

fn best_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().find(|c| c.is_settlement())
}

#[async_trait]
impl Geocoder for MapsCoGeocoder {
    async fn resolve(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Location, WeatherError> {
        let url = endpoint(&self.base_url, "search");
        let query = [
            ("api_key", self.api_key.clone()),
            ("q", format!("{},{}", location.country, location.city)),
        ];

        let candidates: Vec<Candidate> = get_json(&self.http, NAME, &url, &query, cancel).await?;
        let found = best_candidate(&candidates).ok_or(WeatherError::NotFound)?;

        tracing::debug!(
            lat = %found.lat,
            lon = %found.lon,
            "geocoded {}, {}",
            location.city,
            location.country
        );

        let mut resolved = location.clone();
        resolved.coordinates = Some(Coordinates {
            latitude: found.lat.clone(),
            longitude: found.lon.clone(),
        });
        Ok(resolved)
    }
}
