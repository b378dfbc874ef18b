use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::FetchError,
    model::{Coordinates, WeatherSnapshot, round_half_up},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,weather_code,wind_speed_10m,is_day";
const DAILY_FIELDS: &str = "uv_index_max";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature_2m: f64,
    relative_humidity_2m: u8,
    wind_speed_10m: f64,
    weather_code: i32,
    is_day: u8,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    #[serde(default)]
    uv_index_max: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    current: OmCurrent,
    daily: OmDaily,
}

/// Turn a `/v1/forecast` body into a snapshot stamped with `fetched_at`.
pub fn parse_forecast(body: &str, fetched_at: DateTime<Utc>) -> Result<WeatherSnapshot, FetchError> {
    let parsed: OmForecastResponse = serde_json::from_str(body)?;

    let uv_max = parsed
        .daily
        .uv_index_max
        .first()
        .copied()
        .flatten()
        .ok_or(FetchError::MissingField("daily.uv_index_max[0]"))?;

    Ok(WeatherSnapshot {
        temperature_celsius: round_half_up(parsed.current.temperature_2m),
        relative_humidity_percent: parsed.current.relative_humidity_2m,
        wind_speed_kph: round_half_up(parsed.current.wind_speed_10m),
        uv_index: round_half_up(uv_max),
        weather_code: parsed.current.weather_code,
        is_daytime: parsed.current.is_day == 1,
        fetched_at,
    })
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn fetch_snapshot(&self, coordinates: Coordinates) -> Result<WeatherSnapshot, FetchError> {
        let url = format!("{}/v1/forecast", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", coordinates.latitude.to_string().as_str()),
                ("longitude", coordinates.longitude.to_string().as_str()),
                ("current", CURRENT_FIELDS),
                ("daily", DAILY_FIELDS),
                ("timezone", "auto"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16(), body: truncate_body(&body) });
        }

        parse_forecast(&body, Utc::now())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
