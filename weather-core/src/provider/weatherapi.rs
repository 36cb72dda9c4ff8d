use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{
    error::WeatherError,
    http::{endpoint, get_json},
    model::{Location, Place, Reading, TemperaturePoint},
    provider::{ProviderId, SubFetch, fetch_window},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// WeatherAPI.com adapter: `forecast.json` for the upcoming hours, `history.json`
/// for the part of the day already gone.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self { api_key, base_url: base_url.into(), http: Client::new() }
    }

    fn query(&self, location: &Location) -> Vec<(&'static str, String)> {
        let selector = match &location.coordinates {
            Some(c) => format!("{},{}", c.latitude, c.longitude),
            None => format!("{},{}", location.city, location.country),
        };
        vec![("key", self.api_key.clone()), ("q", selector)]
    }

    async fn fetch_forecast(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<SubFetch, WeatherError> {
        let url = endpoint(&self.base_url, "forecast.json");
        let mut query = self.query(location);
        query.push(("days", "2".to_string()));

        let parsed: WaResponse = get_json(&self.http, self.name(), &url, &query, cancel).await?;
        Ok(parsed.into())
    }

    async fn fetch_history(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<SubFetch, WeatherError> {
        let url = endpoint(&self.base_url, "history.json");
        let day = location.day();
        let mut query = self.query(location);
        query.push(("dt", fmt_day(day)));
        query.push(("end_dt", fmt_day(day.checked_add_days(Days::new(1)).unwrap_or(day))));

        let parsed: WaResponse = get_json(&self.http, self.name(), &url, &query, cancel).await?;
        Ok(parsed.into())
    }
}

fn fmt_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    #[serde(default)]
    region: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct WaHour {
    time_epoch: i64,
    temp_c: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    hour: Vec<WaHour>,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    forecast: WaForecast,
}

impl From<WaResponse> for SubFetch {
    fn from(res: WaResponse) -> Self {
        let points = res
            .forecast
            .forecastday
            .into_iter()
            .flat_map(|day| day.hour)
            .map(|h| TemperaturePoint {
                timestamp: h.time_epoch,
                temp_c: h.temp_c,
                humidity_pct: h.humidity,
            })
            .collect();

        SubFetch {
            points,
            place: Some(Place {
                city: res.location.name,
                region: res.location.region,
                country: res.location.country,
            }),
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn name(&self) -> &str {
        ProviderId::WeatherApi.as_str()
    }

    async fn fetch(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Reading, WeatherError> {
        let forecast = {
            let (this, location, cancel) = (self.clone(), location.clone(), cancel.clone());
            async move { this.fetch_forecast(&location, &cancel).await }
        };
        let history = {
            let (this, location, cancel) = (self.clone(), location.clone(), cancel.clone());
            async move { this.fetch_history(&location, &cancel).await }
        };

        let (temperatures, place) = fetch_window(location.day(), cancel, forecast, history).await?;

        Ok(Reading {
            provider: self.name().to_string(),
            location: place.map(|p| location.resolved_as(&p)).unwrap_or_else(|| location.clone()),
            temperatures,
        })
    }
}
