//! Periodic weather polling with an activation-scoped lifecycle.
//!
//! [`WeatherFeed::activate`] spawns one task that fetches immediately and then
//! on every tick of the refresh interval. All state is published through a
//! `watch` channel as a [`FeedState`]. The next scheduled fetch is always one
//! full period after the previous fetch finished, so a slow fetch never
//! triggers a catch-up fetch. The returned [`FeedHandle`] owns the activation:
//! deactivating or dropping it cancels the timer, and a fetch that is still in
//! flight at that point never writes its result.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Notify, watch},
    task::JoinHandle,
    time::interval,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    Config, Coordinates, FeedState, WeatherSnapshot,
    error::FetchError,
    provider::{WeatherProvider, provider_from_config},
};

/// How often a feed refreshes unless told otherwise.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Shortest period accepted by [`WeatherFeed::with_refresh_interval`].
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Stored as `last_error` when a failure renders to an empty message.
pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to fetch weather data";

#[derive(Debug, Clone)]
pub struct WeatherFeed {
    provider: Arc<dyn WeatherProvider>,
    coordinates: Coordinates,
    refresh_interval: Duration,
}

impl WeatherFeed {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            coordinates: Coordinates::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// Build a feed and its Open-Meteo provider from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = provider_from_config(config)?;

        Ok(Self::new(provider)
            .with_coordinates(config.coordinates()?)
            .with_refresh_interval(config.refresh_interval()?))
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval.max(MIN_REFRESH_INTERVAL);
        self
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Single request, no state, no timer.
    pub async fn fetch_once(&self) -> Result<WeatherSnapshot, FetchError> {
        self.provider.fetch_snapshot(self.coordinates).await
    }

    /// Start polling on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn activate(self) -> FeedHandle {
        let (state_tx, state_rx) = watch::channel(FeedState::Idle);
        let refresh = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let span = tracing::info_span!(
            "weather_feed",
            lat = self.coordinates.latitude,
            lon = self.coordinates.longitude,
        );
        tracing::info!(
            parent: &span,
            interval_secs = self.refresh_interval.as_secs(),
            "Activating weather feed"
        );

        let task = tokio::spawn(
            poll_loop(self, state_tx, refresh.clone(), cancel.clone()).instrument(span),
        );

        FeedHandle { state: state_rx, refresh, cancel, task: Some(task) }
    }
}

/// Owner of one feed activation.
#[derive(Debug)]
pub struct FeedHandle {
    state: watch::Receiver<FeedState>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn current_snapshot(&self) -> Option<WeatherSnapshot> {
        self.state.borrow().snapshot().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// A background refresh is running while older data is still shown.
    pub fn is_refreshing(&self) -> bool {
        self.state.borrow().is_refreshing()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error().map(str::to_owned)
    }

    /// Receiver that wakes on every state change. `changed()` errors once the
    /// feed has been deactivated; the last value is then never `Loading`.
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.clone()
    }

    /// Fetch as soon as possible instead of waiting for the next tick.
    /// Requests made while a fetch is running collapse into one follow-up.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// Stop polling and wait for the task to finish. A fetch that is still in
    /// flight is abandoned and the state goes back to what it was before it.
    pub async fn deactivate(mut self) {
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Weather feed task ended abnormally: {e}");
            }
        }

        tracing::info!("Weather feed deactivated");
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop(
    feed: WeatherFeed,
    state: watch::Sender<FeedState>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(feed.refresh_interval);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => tracing::debug!("Scheduled weather refresh"),
            _ = refresh.notified() => tracing::debug!("Manual weather refresh"),
        }

        state.send_modify(|s| *s = std::mem::take(s).loading());

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Discarding in-flight weather fetch");
                state.send_modify(|s| *s = std::mem::take(s).abandoned());
                break;
            }
            outcome = feed.provider.fetch_snapshot(feed.coordinates) => outcome,
        };

        match outcome {
            Ok(snapshot) => {
                tracing::info!(
                    temperature = snapshot.temperature_celsius,
                    code = snapshot.weather_code,
                    "Weather updated"
                );
                state.send_modify(|s| *s = std::mem::take(s).loaded(snapshot));
            }
            Err(e) => {
                let message = error_message(&e);
                tracing::warn!(kind = ?e.kind(), "Weather fetch failed: {message}");
                state.send_modify(|s| *s = std::mem::take(s).failed(message));
            }
        }

        // Ticks that fell due during the fetch are dropped.
        ticker.reset();
    }
}

fn error_message(err: &FetchError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() { FALLBACK_ERROR_MESSAGE.to_string() } else { message }
}
