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

pub const DEFAULT_BASE_URL: &str = "https://api.weatherbit.io/v2.0";

const FORECAST_HOURS: &str = "24";

#[derive(Debug, Clone)]
pub struct WeatherbitProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherbitProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self { api_key, base_url: base_url.into(), http: Client::new() }
    }

    fn query(&self, location: &Location) -> Vec<(&'static str, String)> {
        let mut query = vec![("key", self.api_key.clone())];
        match &location.coordinates {
            Some(c) => {
                query.push(("lat", c.latitude.clone()));
                query.push(("lon", c.longitude.clone()));
            }
            None => {
                query.push(("city", location.city.clone()));
                query.push(("country", location.country.clone()));
            }
        }
        query
    }

    async fn fetch_forecast(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<SubFetch, WeatherError> {
        let url = endpoint(&self.base_url, "forecast/hourly");
        let mut query = self.query(location);
        query.push(("hours", FORECAST_HOURS.to_string()));

        let parsed: WbResponse = get_json(&self.http, self.name(), &url, &query, cancel).await?;
        Ok(parsed.into_sub_fetch(location))
    }

    async fn fetch_history(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<SubFetch, WeatherError> {
        let url = endpoint(&self.base_url, "history/hourly");
        let day = location.day();
        let mut query = self.query(location);
        query.push(("start_date", fmt_hour_zero(day)));
        query.push(("end_date", fmt_hour_zero(day.checked_add_days(Days::new(1)).unwrap_or(day))));

        let parsed: WbResponse = get_json(&self.http, self.name(), &url, &query, cancel).await?;
        Ok(parsed.into_sub_fetch(location))
    }
}

fn fmt_hour_zero(day: NaiveDate) -> String {
    day.format("%Y-%m-%d:00").to_string()
}

#[derive(Debug, Deserialize)]
struct WbEntry {
    ts: i64,
    temp: f64,
    rh: f64,
}

#[derive(Debug, Deserialize)]
struct WbResponse {
    #[serde(default)]
    city_name: String,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    data: Vec<WbEntry>,
}

impl WbResponse {
    /// Weatherbit echoes only the city name; country falls back to the request.
    fn into_sub_fetch(self, location: &Location) -> SubFetch {
        let points = self
            .data
            .into_iter()
            .map(|e| TemperaturePoint { timestamp: e.ts, temp_c: e.temp, humidity_pct: e.rh })
            .collect();

        SubFetch {
            points,
            place: Some(Place {
                city: self.city_name,
                region: String::new(),
                country: self.country_code.unwrap_or_else(|| location.country.clone()),
            }),
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherbitProvider {
    fn name(&self) -> &str {
        ProviderId::Weatherbit.as_str()
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // 2024-07-15T00:00:00Z
    const DAY_START: i64 = 1_721_001_600;

    fn location() -> Location {
        let when = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 7, 15, 9, 0, 0)
            .unwrap();
        Location::new("UA", "Odesa", when)
    }

    fn data(range: std::ops::Range<i64>) -> serde_json::Value {
        json!(range
            .map(|h| json!({"ts": DAY_START + h * 3600, "temp": 20.0 + h as f64, "rh": 55}))
            .collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn history_and_forecast_cover_the_day() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/history/hourly"))
            .and(query_param("city", "Odesa"))
            .and(query_param("country", "UA"))
            .and(query_param("start_date", "2024-07-15:00"))
            .and(query_param("end_date", "2024-07-16:00"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"city_name": "Odessa", "data": data(0..10)})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/forecast/hourly"))
            .and(query_param("hours", "24"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({
                    "city_name": "Odesa",
                    "country_code": "UA",
                    "data": data(9..33)
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = WeatherbitProvider::with_base_url("KEY".into(), server.uri());
        let reading = provider.fetch(&location(), &CancellationToken::new()).await.unwrap();

        assert_eq!(reading.provider, "weatherbit");
        assert_eq!(reading.location.city, "Odesa");
        assert_eq!(reading.location.country, "UA");
        assert_eq!(reading.temperatures.len(), 24);
        assert_eq!(reading.temperatures[0].humidity_pct, 55.0);
    }

    #[tokio::test]
    async fn lat_lon_replace_city_selector() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("lat", "46.48"))
            .and(query_param("lon", "30.72"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"city_name": "Odesa", "data": []})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let provider = WeatherbitProvider::with_base_url("KEY".into(), server.uri());
        let loc = location().with_coordinates("46.48", "30.72");
        let reading = provider.fetch(&loc, &CancellationToken::new()).await.unwrap();

        assert!(reading.temperatures.is_empty());
        assert_eq!(reading.location.coordinates, loc.coordinates);
    }

    #[tokio::test]
    async fn cancellation_abandons_in_flight_requests() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(10))
                    .set_body_json(json!({"data": []})),
            )
            .mount(&server)
            .await;

        let provider = WeatherbitProvider::with_base_url("KEY".into(), server.uri());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = provider.fetch(&location(), &cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
