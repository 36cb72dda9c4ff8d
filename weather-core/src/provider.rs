use crate::{
    Config, Location, Reading,
    error::WeatherError,
    merge::merge,
    model::{Place, TemperaturePoint},
    provider::{weatherapi::WeatherApiProvider, weatherbit::WeatherbitProvider},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::{convert::TryFrom, fmt::Debug, future::Future, sync::Arc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub mod weatherapi;
pub mod weatherbit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    WeatherApi,
    Weatherbit,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::WeatherApi => "weatherapi",
            ProviderId::Weatherbit => "weatherbit",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::WeatherApi, ProviderId::Weatherbit]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "weatherapi" => Ok(ProviderId::WeatherApi),
            "weatherbit" => Ok(ProviderId::Weatherbit),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: weatherapi, weatherbit."
            )),
        }
    }
}

/// An upstream data source able to produce a full-day [`Reading`].
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Identifier stamped on every reading this provider returns.
    fn name(&self) -> &str;

    /// Fetch one day of hourly temperatures for `location`.
    ///
    /// Implementations must stop promptly once `cancel` fires.
    async fn fetch(
        &self,
        location: &Location,
        cancel: &CancellationToken,
    ) -> Result<Reading, WeatherError>;
}

/// Raw output of a single sub-fetch, before merging.
#[derive(Debug, Default)]
pub(crate) struct SubFetch {
    pub points: Vec<TemperaturePoint>,
    pub place: Option<Place>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Forecast,
    History,
}

/// Run the forecast and history sub-fetches concurrently and merge them.
///
/// Returns on the first failure without waiting for the other sub-fetch, which
/// is cancelled and aborted. Series are merged in arrival order. The place
/// naming prefers the forecast answer over the history one.
pub(crate) async fn fetch_window<F, H>(
    day: NaiveDate,
    cancel: &CancellationToken,
    forecast: F,
    history: H,
) -> Result<(Vec<TemperaturePoint>, Option<Place>), WeatherError>
where
    F: Future<Output = Result<SubFetch, WeatherError>> + Send + 'static,
    H: Future<Output = Result<SubFetch, WeatherError>> + Send + 'static,
{
    let scope = cancel.child_token();
    let _cancel_on_exit = scope.clone().drop_guard();

    let mut tasks = JoinSet::new();
    tasks.spawn(sub_fetch(Slot::Forecast, scope.clone(), forecast));
    tasks.spawn(sub_fetch(Slot::History, scope.clone(), history));

    let mut arrived: Vec<(Slot, SubFetch)> = Vec::with_capacity(2);
    while let Some(joined) = tasks.join_next().await {
        let (slot, result) = joined?;
        arrived.push((slot, result?));
    }

    let [(first_slot, first), (_, second)]: [(Slot, SubFetch); 2] = arrived
        .try_into()
        .map_err(|_| WeatherError::Task("sub-fetch ended without reporting".into()))?;

    let (forecast, history) = match first_slot {
        Slot::Forecast => (&first, &second),
        Slot::History => (&second, &first),
    };
    let place = forecast.place.clone().or_else(|| history.place.clone());

    Ok((merge(day, Ok(first.points), Ok(second.points))?, place))
}

async fn sub_fetch<F>(
    slot: Slot,
    scope: CancellationToken,
    fut: F,
) -> (Slot, Result<SubFetch, WeatherError>)
where
    F: Future<Output = Result<SubFetch, WeatherError>>,
{
    let result = tokio::select! {
        biased;
        _ = scope.cancelled() => Err(WeatherError::Cancelled),
        res = fut => res,
    };
    (slot, result)
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let provider_cfg = config.provider_config(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `weather configure {id}` and enter your API key."
        )
    })?;

    let api_key = provider_cfg.api_key.clone();
    let base_url = provider_cfg.base_url.as_deref();

    let provider: Arc<dyn WeatherProvider> = match (id, base_url) {
        (ProviderId::WeatherApi, Some(url)) => {
            Arc::new(WeatherApiProvider::with_base_url(api_key, url))
        }
        (ProviderId::WeatherApi, None) => Arc::new(WeatherApiProvider::new(api_key)),
        (ProviderId::Weatherbit, Some(url)) => {
            Arc::new(WeatherbitProvider::with_base_url(api_key, url))
        }
        (ProviderId::Weatherbit, None) => Arc::new(WeatherbitProvider::new(api_key)),
    };

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::merge::day_window;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn point(hour: i64, temp_c: f64) -> TemperaturePoint {
        TemperaturePoint {
            timestamp: day_window(day()).0 + hour * 3600,
            temp_c,
            humidity_pct: 60.0,
        }
    }

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = provider_from_config(ProviderId::Weatherbit, &cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider"));
    }

    #[test]
    fn provider_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::WeatherApi, "KEY".to_string());

        let provider = provider_from_config(ProviderId::WeatherApi, &cfg).unwrap();
        assert_eq!(provider.name(), "weatherapi");
    }

    #[tokio::test]
    async fn window_waits_for_both_and_prefers_forecast_place() {
        let cancel = CancellationToken::new();

        let forecast = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<_, WeatherError>(SubFetch {
                points: vec![point(12, 20.0), point(13, 21.0)],
                place: Some(Place { city: "Lviv".into(), ..Place::default() }),
            })
        };
        let history = async {
            Ok::<_, WeatherError>(SubFetch {
                points: vec![point(1, 10.0), point(12, 19.5)],
                place: Some(Place { city: "Lvov".into(), ..Place::default() }),
            })
        };

        let (points, place) = fetch_window(day(), &cancel, forecast, history).await.unwrap();

        // history arrived first, so the forecast value for 12:00 is the later writer
        assert_eq!(points, vec![point(1, 10.0), point(12, 20.0), point(13, 21.0)]);
        assert_eq!(place.unwrap().city, "Lviv");
    }

    #[tokio::test]
    async fn window_fails_fast_and_releases_sibling() {
        let cancel = CancellationToken::new();
        let released = Arc::new(AtomicBool::new(false));

        let guard = SetOnDrop(released.clone());
        let forecast = async move {
            let _guard = guard;
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, WeatherError>(SubFetch::default())
        };
        let history = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err::<SubFetch, _>(WeatherError::UpstreamStatus {
                provider: "test".into(),
                status: 500,
                body: "boom".into(),
            })
        };

        let started = std::time::Instant::now();
        let err = fetch_window(day(), &cancel, forecast, history).await.unwrap_err();

        assert!(matches!(err, WeatherError::UpstreamStatus { status: 500, .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!cancel.is_cancelled());

        // the aborted task drops its future on the runtime's next turn
        for _ in 0..50 {
            if released.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(released.load(Ordering::SeqCst), "sibling sub-fetch still alive");
    }

    #[tokio::test]
    async fn window_observes_caller_cancellation() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let forever = || async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, WeatherError>(SubFetch::default())
        };

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = fetch_window(day(), &cancel, forever(), forever()).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
