use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, bail};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use weather_core::{CancellationToken, Config, Location, ProviderId, WeatherService};

use crate::render::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print debug logs to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a provider or for geocoding.
    Configure {
        /// "weatherapi", "weatherbit" or "geocoding".
        provider: String,
    },

    /// Show hourly temperatures for a city, from whichever provider answers first.
    Show {
        country: String,

        city: String,

        /// Day to show (YYYY-MM-DD); today if absent.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Latitude; skips geocoding when given with --lon.
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<String>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<String>,

        /// Give up after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Print the reading as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = self.config;

        match self.command {
            Command::Configure { provider } => configure(config_path.as_deref(), &provider),
            Command::Show { country, city, date, lat, lon, timeout, json } => {
                let config = load_config(config_path.as_deref())?;
                let service = WeatherService::from_config(&config)?;

                let mut location = Location::new(country, city, target_time(date));
                if let (Some(lat), Some(lon)) = (lat, lon) {
                    location = location.with_coordinates(lat, lon);
                }

                let cancel = CancellationToken::new();
                cancel_on_interrupt(cancel.clone(), timeout.map(Duration::from_secs));

                let reading = match service.get(location, &cancel).await {
                    Ok(reading) => reading,
                    Err(err) if err.is_cancelled() => {
                        bail!("Request cancelled (interrupted or timed out)")
                    }
                    Err(err) => return Err(err.into()),
                };

                if json {
                    println!("{}", serde_json::to_string_pretty(&reading)?);
                } else {
                    print!("{}", render(&reading));
                }
                Ok(())
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn configure(path: Option<&Path>, provider: &str) -> anyhow::Result<()> {
    let mut config = load_config(path)?;

    let target = if provider.eq_ignore_ascii_case("geocoding") {
        None
    } else {
        Some(ProviderId::try_from(provider)?)
    };
    let label = target.map(|id| id.as_str()).unwrap_or("geocoding");

    let api_key = Password::new(&format!("API key for {label}:"))
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    match target {
        Some(id) => config.upsert_provider_api_key(id, api_key.trim().to_string()),
        None => config.set_geocoding_api_key(api_key.trim().to_string()),
    }

    match path {
        Some(path) => config.save_to(path)?,
        None => config.save()?,
    }

    println!("Saved credentials for {label}.");
    Ok(())
}

/// Start of `date` in the local offset, or now.
fn target_time(date: Option<NaiveDate>) -> DateTime<FixedOffset> {
    let now = Local::now().fixed_offset();
    match date {
        Some(day) => day
            .and_time(NaiveTime::MIN)
            .and_local_timezone(*now.offset())
            .single()
            .unwrap_or(now),
        None => now,
    }
}

fn cancel_on_interrupt(cancel: CancellationToken, timeout: Option<Duration>) {
    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(after) => tokio::time::sleep(after).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::warn!("interrupted"),
            _ = deadline => tracing::warn!(?timeout, "timed out"),
            _ = cancel.cancelled() => return,
        }
        cancel.cancel();
    });
}
