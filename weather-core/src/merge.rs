//! Reconciliation of the two overlapping sub-fetch series an adapter collects.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};

use crate::{error::WeatherError, model::TemperaturePoint};

/// Outcome of one sub-fetch as handed to [`merge`].
pub type SubFetchResult = Result<Vec<TemperaturePoint>, WeatherError>;

const WINDOW_SECS: i64 = 23 * 3600;

/// UTC bounds of `day`, both inclusive: midnight through 23:00.
pub fn day_window(day: NaiveDate) -> (i64, i64) {
    let start = day.and_time(NaiveTime::MIN).and_utc().timestamp();
    (start, start + WINDOW_SECS)
}

/// Merge two sub-fetch series into one series for `day`.
///
/// Points are keyed by timestamp; on a collision the point from `second` wins.
/// Points outside [`day_window`] are dropped and the rest come out ascending.
/// If either input failed, the first failure (in argument order) is returned.
pub fn merge(
    day: NaiveDate,
    first: SubFetchResult,
    second: SubFetchResult,
) -> Result<Vec<TemperaturePoint>, WeatherError> {
    let first = first?;
    let second = second?;

    let (start, end) = day_window(day);
    let mut by_ts: BTreeMap<i64, TemperaturePoint> = BTreeMap::new();

    for point in first.into_iter().chain(second) {
        if point.timestamp < start || point.timestamp > end {
            continue;
        }
        by_ts.insert(point.timestamp, point);
    }

    Ok(by_ts.into_values().collect())
}
