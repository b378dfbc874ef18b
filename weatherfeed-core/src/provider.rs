use crate::{Config, Coordinates, WeatherSnapshot, error::FetchError, provider::open_meteo::OpenMeteoProvider};
use anyhow::Context;
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod open_meteo;

/// Source of current conditions for a coordinate.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_snapshot(&self, coordinates: Coordinates) -> Result<WeatherSnapshot, FetchError>;
}

/// Construct the Open-Meteo provider described by `config`.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let provider = OpenMeteoProvider::new(config.base_url.as_str(), config.request_timeout()?)
        .with_context(|| format!("Failed to build HTTP client for {}", config.base_url))?;

    Ok(Arc::new(provider))
}
