//! Lifecycle tests for `WeatherFeed` against a scripted provider on a paused clock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use weatherfeed_core::{
    Coordinates, FeedState, FetchError, WeatherFeed, WeatherProvider, WeatherSnapshot,
};

const PERIOD: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
enum Step {
    Ok(i32),
    Fail(u16),
    Slow(Duration, i32),
}

#[derive(Debug, Default)]
struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(steps.into_iter().collect()), calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn snapshot(temp: i32) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature_celsius: temp,
        relative_humidity_percent: 70,
        wind_speed_kph: 9,
        uv_index: 4,
        weather_code: 1,
        is_daytime: true,
        fetched_at: Utc::now(),
    }
}

#[async_trait]
impl WeatherProvider for ScriptedProvider {
    async fn fetch_snapshot(&self, _coordinates: Coordinates) -> Result<WeatherSnapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Ok(25));

        match step {
            Step::Ok(temp) => Ok(snapshot(temp)),
            Step::Fail(status) => {
                Err(FetchError::Status { status, body: "upstream unavailable".into() })
            }
            Step::Slow(delay, temp) => {
                tokio::time::sleep(delay).await;
                Ok(snapshot(temp))
            }
        }
    }
}

/// Let the feed task run whatever is due.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn feed(provider: &Arc<ScriptedProvider>) -> WeatherFeed {
    WeatherFeed::new(provider.clone())
}

#[tokio::test(start_paused = true)]
async fn fetches_on_activation_then_every_period() {
    let provider = ScriptedProvider::new([Step::Ok(28), Step::Ok(29)]);
    let handle = feed(&provider).activate();

    settle().await;
    assert_eq!(provider.calls(), 1);
    assert_eq!(handle.current_snapshot().map(|s| s.temperature_celsius), Some(28));
    assert!(!handle.is_loading());
    assert_eq!(handle.last_error(), None);

    tokio::time::advance(PERIOD / 2).await;
    settle().await;
    assert_eq!(provider.calls(), 1);

    tokio::time::advance(PERIOD / 2).await;
    settle().await;
    assert_eq!(provider.calls(), 2);
    assert_eq!(handle.current_snapshot().map(|s| s.temperature_celsius), Some(29));

    handle.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn first_failure_leaves_no_snapshot() {
    let provider = ScriptedProvider::new([Step::Fail(500)]);
    let handle = feed(&provider).activate();

    settle().await;
    assert!(handle.current_snapshot().is_none());
    assert!(!handle.is_loading());
    let error = handle.last_error().expect("error is recorded");
    assert!(error.contains("500"), "unexpected error: {error}");

    handle.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn refresh_failure_keeps_last_good_snapshot() {
    let provider = ScriptedProvider::new([Step::Ok(28), Step::Fail(500)]);
    let handle = feed(&provider).activate();

    settle().await;
    let before = handle.current_snapshot().expect("first fetch succeeded");

    tokio::time::advance(PERIOD).await;
    settle().await;

    assert_eq!(provider.calls(), 2);
    assert_eq!(handle.current_snapshot(), Some(before));
    assert!(handle.last_error().is_some());
    assert!(!handle.is_loading());

    handle.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn success_after_failure_clears_error() {
    let provider = ScriptedProvider::new([Step::Fail(502), Step::Ok(31)]);
    let handle = feed(&provider).activate();

    settle().await;
    assert!(handle.last_error().is_some());

    tokio::time::advance(PERIOD).await;
    settle().await;

    assert_eq!(handle.last_error(), None);
    assert_eq!(handle.current_snapshot().map(|s| s.temperature_celsius), Some(31));

    handle.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn loading_flag_covers_initial_and_background_fetches() {
    let provider = ScriptedProvider::new([
        Step::Slow(Duration::from_secs(60), 20),
        Step::Slow(Duration::from_secs(60), 21),
    ]);
    let handle = feed(&provider).activate();

    settle().await;
    assert!(handle.is_loading());
    assert!(!handle.is_refreshing());
    assert!(handle.current_snapshot().is_none());

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert!(!handle.is_loading());

    tokio::time::advance(PERIOD).await;
    settle().await;
    assert!(handle.is_loading());
    assert!(handle.is_refreshing());
    assert_eq!(handle.current_snapshot().map(|s| s.temperature_celsius), Some(20));

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert!(!handle.is_refreshing());
    assert_eq!(handle.current_snapshot().map(|s| s.temperature_celsius), Some(21));

    handle.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn deactivation_stops_scheduled_fetches() {
    let provider = ScriptedProvider::new([]);
    let handle = feed(&provider).activate();

    settle().await;
    assert_eq!(provider.calls(), 1);

    handle.deactivate().await;

    tokio::time::advance(PERIOD * 4).await;
    settle().await;
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_also_stops_the_feed() {
    let provider = ScriptedProvider::new([]);
    let handle = feed(&provider).activate();

    settle().await;
    drop(handle);

    tokio::time::advance(PERIOD * 3).await;
    settle().await;
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn in_flight_result_is_ignored_after_deactivation() {
    let provider = ScriptedProvider::new([Step::Slow(Duration::from_secs(600), 28)]);
    let handle = feed(&provider).activate();

    settle().await;
    let rx = handle.subscribe();
    assert!(handle.is_loading());

    handle.deactivate().await;

    tokio::time::advance(Duration::from_secs(1200)).await;
    settle().await;

    assert_eq!(*rx.borrow(), FeedState::Idle);
    assert!(!rx.borrow().is_loading());
    assert!(rx.has_changed().is_err(), "feed task should have dropped its sender");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_refresh_keeps_last_good_snapshot_visible() {
    let provider = ScriptedProvider::new([Step::Ok(24), Step::Slow(Duration::from_secs(600), 30)]);
    let handle = feed(&provider).activate();

    settle().await;
    handle.refresh_now();
    settle().await;
    assert!(handle.is_refreshing());

    let rx = handle.subscribe();
    handle.deactivate().await;

    let state = rx.borrow().clone();
    assert!(!state.is_loading());
    assert_eq!(state.snapshot().map(|s| s.temperature_celsius), Some(24));
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_past_the_period_gets_no_catch_up_fetch() {
    let provider = ScriptedProvider::new([Step::Slow(Duration::from_secs(45 * 60), 20)]);
    let handle = feed(&provider).activate();

    settle().await;
    assert_eq!(provider.calls(), 1);

    tokio::time::advance(Duration::from_secs(45 * 60)).await;
    settle().await;
    assert_eq!(provider.calls(), 1);
    assert_eq!(handle.current_snapshot().map(|s| s.temperature_celsius), Some(20));

    // t = 60 min: the original 60-minute tick is gone too.
    tokio::time::advance(PERIOD / 2).await;
    settle().await;
    assert_eq!(provider.calls(), 1);

    // One full period after the slow fetch finished.
    tokio::time::advance(PERIOD / 2).await;
    settle().await;
    assert_eq!(provider.calls(), 2);

    handle.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn refresh_now_fetches_before_next_tick() {
    let provider = ScriptedProvider::new([Step::Ok(20), Step::Ok(22)]);
    let handle = feed(&provider).activate();

    settle().await;
    assert_eq!(provider.calls(), 1);

    handle.refresh_now();
    settle().await;

    assert_eq!(provider.calls(), 2);
    assert_eq!(handle.current_snapshot().map(|s| s.temperature_celsius), Some(22));

    // The schedule restarts from the manual fetch.
    tokio::time::advance(PERIOD - Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(provider.calls(), 2);

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(provider.calls(), 3);

    handle.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn refresh_requests_during_a_fetch_collapse_into_one() {
    let provider = ScriptedProvider::new([Step::Ok(20), Step::Slow(Duration::from_secs(300), 21)]);
    let handle = feed(&provider).activate();

    settle().await;
    handle.refresh_now();
    settle().await;
    assert_eq!(provider.calls(), 2);
    assert!(handle.is_refreshing());

    handle.refresh_now();
    handle.refresh_now();
    handle.refresh_now();

    tokio::time::advance(Duration::from_secs(300)).await;
    settle().await;
    settle().await;

    assert_eq!(provider.calls(), 3);
    assert!(!handle.is_loading());

    handle.deactivate().await;
}
