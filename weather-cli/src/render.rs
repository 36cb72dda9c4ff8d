use chrono::DateTime;
use weather_core::Reading;

/// Plain-text table: provider and location headers, then hour/temp/humidity rows.
pub fn render(reading: &Reading) -> String {
    let loc = &reading.location;
    let place: Vec<&str> = [loc.country.as_str(), loc.region.as_str(), loc.city.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

    let hours: String = reading
        .temperatures
        .iter()
        .map(|p| {
            let hour = DateTime::from_timestamp(p.timestamp, 0)
                .map(|t| t.format("%H").to_string())
                .unwrap_or_else(|| "--".to_string());
            format!("{hour:>3}  ")
        })
        .collect();
    let temps: String =
        reading.temperatures.iter().map(|p| format!("{:>3.0}  ", p.temp_c)).collect();
    let humidity: String =
        reading.temperatures.iter().map(|p| format!("{:>3.0}  ", p.humidity_pct)).collect();

    format!(
        "PROVIDER\t {}\nLOCATION\t {}\nTIME\t\t{}\nTEMP\t\t{}\nHUMIDITY\t{}\n",
        reading.provider,
        place.join(" "),
        hours,
        temps,
        humidity,
    )
}
