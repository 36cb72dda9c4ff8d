use thiserror::Error;

/// Every failure the core can report to its caller.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Connection-level failure while talking to an upstream.
    #[error("Request to {provider} failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success status.
    #[error("{provider} request failed with status {status}:\n{body}")]
    UpstreamStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse {provider} response: {source}")]
    Decode {
        provider: String,
        #[source]
        source: serde_json::Error,
    },

    /// Geocoding found no city-level or administrative candidate.
    #[error("Location not found")]
    NotFound,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation was cancelled")]
    Cancelled,

    /// A spawned task panicked or was aborted before reporting.
    #[error("Background task failed: {0}")]
    Task(String),
}

impl WeatherError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, WeatherError::NotFound)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WeatherError::Cancelled)
    }

    pub(crate) fn transport(provider: &str, source: reqwest::Error) -> Self {
        WeatherError::Transport { provider: provider.to_string(), source }
    }

    pub(crate) fn decode(provider: &str, source: serde_json::Error) -> Self {
        WeatherError::Decode { provider: provider.to_string(), source }
    }
}

impl From<tokio::task::JoinError> for WeatherError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            WeatherError::Cancelled
        } else {
            WeatherError::Task(err.to_string())
        }
    }
}
