use chrono::Local;
use weatherfeed_core::{Coordinates, FeedState, WeatherSnapshot};

pub fn snapshot_report(coordinates: Coordinates, snapshot: &WeatherSnapshot) -> String {
    let period = if snapshot.is_daytime { "day" } else { "night" };
    let updated = snapshot.fetched_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");

    format!(
        "Site:        {:.4}, {:.4}\n\
         Condition:   {} ({period})\n\
         Temperature: {} °C\n\
         Humidity:    {} %\n\
         Wind:        {} km/h\n\
         UV index:    {} ({})\n\
         Updated:     {updated}",
        coordinates.latitude,
        coordinates.longitude,
        snapshot.condition_label(),
        snapshot.temperature_celsius,
        snapshot.relative_humidity_percent,
        snapshot.wind_speed_kph,
        snapshot.uv_index,
        snapshot.uv_label(),
    )
}

/// What a dashboard tile would show for `state`. `None` means nothing new to draw.
pub fn state_report(coordinates: Coordinates, state: &FeedState) -> Option<String> {
    match (state.snapshot(), state.last_error()) {
        (None, _) if state.is_loading() => Some("Loading weather...".to_string()),
        (None, Some(error)) => Some(format!("Unable to load weather: {error}")),
        (None, None) => None,
        (Some(snapshot), error) => {
            let mut report = snapshot_report(coordinates, snapshot);
            if state.is_refreshing() {
                report.push_str("\n(refreshing...)");
            } else if let Some(error) = error {
                report.push_str(&format!("\n(showing last good data; latest refresh failed: {error})"));
            }
            Some(report)
        }
    }
}
