//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The HTTP transport with retry/backoff
//! - Parsing of OpenWeatherMap payloads into shared domain models
//! - Daily aggregation of 3-hourly forecasts
//! - Per-city bundle fetching and ordered, failure-isolated fan-out
//! - JSON/CSV export of the results
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod fanout;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod transport;

pub use aggregate::aggregate_daily;
pub use config::{Config, Endpoints, HttpSettings};
pub use error::{FetchError, FetchPhase, WeatherError};
pub use export::{ExportRow, OutputFormat};
pub use fanout::{FanOutSummary, FetchMode, fetch_all};
pub use fetch::WeatherClient;
pub use model::{CityBundle, CurrentWeather, DailyForecast, ForecastItem, WeatherSample};
pub use transport::{HttpTransport, RetryPolicy, Transport};
