use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair, kept as the decimal strings the geocoder returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: String,
    pub longitude: String,
}

/// Where and when to look up weather.
///
/// Coordinates, when present, take priority over city/country for querying.
/// `region` is filled from provider responses only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub region: String,
    pub country: String,
    pub coordinates: Option<Coordinates>,
    pub when: DateTime<FixedOffset>,
}

impl Location {
    pub fn new(
        country: impl Into<String>,
        city: impl Into<String>,
        when: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            city: city.into(),
            region: String::new(),
            country: country.into(),
            coordinates: None,
            when,
        }
    }

    pub fn with_coordinates(
        mut self,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
    ) -> Self {
        self.coordinates = Some(Coordinates {
            latitude: latitude.into(),
            longitude: longitude.into(),
        });
        self
    }

    /// Calendar day the reading covers, taken in the location's own offset.
    pub fn day(&self) -> NaiveDate {
        self.when.date_naive()
    }

    /// Overlay naming echoed back by a provider. Empty fields are ignored.
    pub fn resolved_as(&self, place: &Place) -> Location {
        let mut resolved = self.clone();
        if !place.city.is_empty() {
            resolved.city = place.city.clone();
        }
        if !place.region.is_empty() {
            resolved.region = place.region.clone();
        }
        if !place.country.is_empty() {
            resolved.country = place.country.clone();
        }
        resolved
    }
}

/// Place naming as a provider reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Place {
    pub city: String,
    pub region: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperaturePoint {
    /// Seconds since the Unix epoch, UTC.
    pub timestamp: i64,
    pub temp_c: f64,
    pub humidity_pct: f64,
}

/// Final per-provider result for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub provider: String,
    pub location: Location,
    /// Ascending by timestamp, no duplicates.
    pub temperatures: Vec<TemperaturePoint>,
}
