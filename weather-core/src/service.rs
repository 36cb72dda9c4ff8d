use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    error::WeatherError,
    geocoding::{Geocoder, MapsCoGeocoder},
    model::{Location, Reading},
    provider::{WeatherProvider, provider_from_config},
    race::race,
};

/// Entry point: optional geocoding, then a race across every registered provider.
#[derive(Debug, Default, Clone)]
pub struct WeatherService {
    providers: Vec<Arc<dyn WeatherProvider>>,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl WeatherService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every provider that has an API key, plus the geocoder when configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut service = Self::new();

        for id in config.configured_providers() {
            service.register(provider_from_config(id, config)?);
        }

        if let Some(geo) = &config.geocoding {
            let geocoder = match &geo.base_url {
                Some(url) => MapsCoGeocoder::with_base_url(geo.api_key.clone(), url.as_str()),
                None => MapsCoGeocoder::new(geo.api_key.clone()),
            };
            service.set_geocoder(Arc::new(geocoder));
        }

        Ok(service)
    }

    pub fn register(&mut self, provider: Arc<dyn WeatherProvider>) {
        self.providers.push(provider);
    }

    pub fn set_geocoder(&mut self, geocoder: Arc<dyn Geocoder>) {
        self.geocoder = Some(geocoder);
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name())
    }

    /// Fetch one day of readings for `location`.
    pub async fn get(
        &self,
        location: Location,
        cancel: &CancellationToken,
    ) -> Result<Reading, WeatherError> {
        if self.providers.is_empty() {
            return Err(WeatherError::Configuration(
                "no weather providers registered; run `weather configure <provider>` first".into(),
            ));
        }

        let location = self.enrich(location, cancel).await?;
        race(&self.providers, &location, cancel).await
    }

    async fn enrich(
        &self,
        location: Location,
        cancel: &CancellationToken,
    ) -> Result<Location, WeatherError> {
        let Some(geocoder) = &self.geocoder else {
            return Ok(location);
        };
        if location.coordinates.is_some() {
            return Ok(location);
        }

        match geocoder.resolve(&location, cancel).await {
            Ok(resolved) => Ok(resolved),
            Err(err) if err.is_not_found() => {
                tracing::warn!(
                    city = %location.city,
                    country = %location.country,
                    "location not geocoded, querying by name"
                );
                Ok(location)
            }
            Err(err) => Err(err),
        }
    }
}
