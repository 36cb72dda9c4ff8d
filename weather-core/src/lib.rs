//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Provider adapters, each merging a history and a forecast query into one day
//! - The race that returns the first provider to answer
//! - Optional geocoding of city/country into coordinates
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod geocoding;
mod http;
pub mod merge;
pub mod model;
pub mod provider;
pub mod race;
pub mod service;

pub use config::{Config, ProviderConfig};
pub use error::WeatherError;
pub use geocoding::{Geocoder, MapsCoGeocoder};
pub use model::{Coordinates, Location, Reading, TemperaturePoint};
pub use provider::{ProviderId, WeatherProvider};
pub use service::WeatherService;
pub use tokio_util::sync::CancellationToken;
