use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::describe::{describe_condition, describe_uv_index};

/// Latitude of the default site.
pub const DEFAULT_LATITUDE: f64 = -8.8095;
/// Longitude of the default site.
pub const DEFAULT_LONGITUDE: f64 = 115.0871;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Coordinates {
    fn default() -> Self {
        Self { latitude: DEFAULT_LATITUDE, longitude: DEFAULT_LONGITUDE }
    }
}

/// Current conditions at one site, as of one successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_celsius: i32,
    pub relative_humidity_percent: u8,
    pub wind_speed_kph: i32,
    pub uv_index: i32,
    /// WMO weather interpretation code.
    pub weather_code: i32,
    pub is_daytime: bool,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn condition_label(&self) -> &'static str {
        describe_condition(self.weather_code)
    }

    pub fn uv_label(&self) -> &'static str {
        describe_uv_index(self.uv_index)
    }
}

/// Everything a consumer can observe about a feed.
///
/// `Loading` keeps the last good snapshot and the last error around so a
/// background refresh never blanks out data that is already on screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FeedState {
    #[default]
    Idle,
    Loading {
        previous: Option<WeatherSnapshot>,
        last_error: Option<String>,
    },
    Loaded(WeatherSnapshot),
    Failed {
        error: String,
        previous: Option<WeatherSnapshot>,
    },
}

impl FeedState {
    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            FeedState::Idle => None,
            FeedState::Loading { previous, .. } | FeedState::Failed { previous, .. } => {
                previous.as_ref()
            }
            FeedState::Loaded(snapshot) => Some(snapshot),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FeedState::Loading { .. })
    }

    /// Loading while a previous snapshot is still available.
    pub fn is_refreshing(&self) -> bool {
        matches!(self, FeedState::Loading { previous: Some(_), .. })
    }

    pub fn last_error(&self) -> Option<&str> {
        match self {
            FeedState::Failed { error, .. } => Some(error),
            FeedState::Loading { last_error, .. } => last_error.as_deref(),
            FeedState::Idle | FeedState::Loaded(_) => None,
        }
    }

    /// A fetch has started. The error from the previous attempt stays visible.
    pub fn loading(self) -> Self {
        match self {
            FeedState::Idle => FeedState::Loading { previous: None, last_error: None },
            state @ FeedState::Loading { .. } => state,
            FeedState::Loaded(snapshot) => {
                FeedState::Loading { previous: Some(snapshot), last_error: None }
            }
            FeedState::Failed { error, previous } => {
                FeedState::Loading { previous, last_error: Some(error) }
            }
        }
    }

    /// A fetch succeeded: replace the snapshot, clear the error.
    pub fn loaded(self, snapshot: WeatherSnapshot) -> Self {
        FeedState::Loaded(snapshot)
    }

    /// A fetch was abandoned: undo `loading()`, keeping its snapshot and error.
    pub fn abandoned(self) -> Self {
        match self {
            FeedState::Loading { previous, last_error: Some(error) } => {
                FeedState::Failed { error, previous }
            }
            FeedState::Loading { previous: Some(snapshot), last_error: None } => {
                FeedState::Loaded(snapshot)
            }
            FeedState::Loading { previous: None, last_error: None } => FeedState::Idle,
            settled => settled,
        }
    }

    /// A fetch failed: keep whatever snapshot we had.
    pub fn failed(self, error: impl Into<String>) -> Self {
        let previous = match self {
            FeedState::Idle => None,
            FeedState::Loading { previous, .. } | FeedState::Failed { previous, .. } => previous,
            FeedState::Loaded(snapshot) => Some(snapshot),
        };

        FeedState::Failed { error: error.into(), previous }
    }
}

/// Round to the nearest integer, halves toward positive infinity.
pub(crate) fn round_half_up(value: f64) -> i32 {
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded as i32
}
