//! Core library for the weather feed.
//!
//! This crate defines:
//! - The polling feed and its lifecycle handle
//! - The Open-Meteo provider behind the `WeatherProvider` trait
//! - Condition and UV index labels
//! - Configuration handling
//!
//! It is used by `weatherfeed-cli`, but any dashboard front end can embed it.

pub mod config;
pub mod describe;
pub mod error;
pub mod feed;
pub mod model;
pub mod provider;

pub use config::Config;
pub use describe::{UvLevel, describe_condition, describe_uv_index};
pub use error::{FetchError, FetchErrorKind};
pub use feed::{FeedHandle, WeatherFeed};
pub use model::{Coordinates, FeedState, WeatherSnapshot};
pub use provider::{WeatherProvider, open_meteo::OpenMeteoProvider};
