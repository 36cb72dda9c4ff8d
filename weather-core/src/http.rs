use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::WeatherError;

/// One GET request decoded as JSON, abandoned as soon as `cancel` fires.
///
/// Non-success statuses become [`WeatherError::UpstreamStatus`] with the body
/// pretty-printed when it is JSON.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    provider: &str,
    url: &str,
    query: &[(&str, String)],
    cancel: &CancellationToken,
) -> Result<T, WeatherError> {
    if cancel.is_cancelled() {
        return Err(WeatherError::Cancelled);
    }

    tracing::debug!(provider, url, "sending request");

    let request = async {
        let res = http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| WeatherError::transport(provider, e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| WeatherError::transport(provider, e))?;

        if !status.is_success() {
            return Err(WeatherError::UpstreamStatus {
                provider: provider.to_string(),
                status: status.as_u16(),
                body: pretty_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::decode(provider, e))
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WeatherError::Cancelled),
        res = request => res,
    }
}

fn pretty_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| truncate_body(body))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

/// Join `base` and `path` with exactly one slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
