use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{
    error::WeatherError,
    model::{Location, Reading},
    provider::WeatherProvider,
};

/// Run every provider against `location` and return whichever answers first.
///
/// The first answer decides the outcome even when it is an error; slower
/// providers are cancelled and aborted either way.
pub async fn race(
    providers: &[Arc<dyn WeatherProvider>],
    location: &Location,
    cancel: &CancellationToken,
) -> Result<Reading, WeatherError> {
    if providers.is_empty() {
        return Err(WeatherError::Configuration("no weather providers registered".into()));
    }

    let scope = cancel.child_token();
    let _cancel_losers = scope.clone().drop_guard();

    let mut tasks = JoinSet::new();
    for provider in providers {
        let provider = Arc::clone(provider);
        let location = location.clone();
        let scope = scope.clone();
        tasks.spawn(async move {
            let result = provider.fetch(&location, &scope).await;
            if scope.is_cancelled() {
                tracing::debug!(provider = provider.name(), "provider abandoned");
            }
            (provider.name().to_string(), result)
        });
    }

    let joined = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(WeatherError::Cancelled),
        joined = tasks.join_next() => joined,
    };

    let Some(joined) = joined else {
        return Err(WeatherError::Configuration("no weather providers registered".into()));
    };
    let (name, result) = joined?;

    match &result {
        Ok(reading) => tracing::info!(
            provider = %name,
            points = reading.temperatures.len(),
            "provider answered first"
        ),
        Err(err) => {
            tracing::warn!(provider = %name, error = %err, "first provider to answer failed")
        }
    }

    scope.cancel();
    result
}
