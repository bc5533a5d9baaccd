use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One normalized reading: the shape shared by current and forecast data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub temperature_c: f64,
    /// Sum of every rain/snow accumulation the provider reported; never negative.
    pub precipitation_mm: f64,
    pub wind_speed_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Display name resolved by the provider, not necessarily the requested spelling.
    pub city: String,
    #[serde(flatten)]
    pub sample: WeatherSample,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub sample: WeatherSample,
}

/// Current weather plus aggregated daily forecast for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityBundle {
    pub city: String,
    pub current: WeatherSample,
    /// Ascending by date.
    pub forecast: Vec<DailyForecast>,
}

/// A single 3-hourly forecast entry as decoded from the provider.
///
/// Fields are optional because the aggregator tolerates malformed entries;
/// only precipitation is always present (absent sub-fields count as zero).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastItem {
    /// `"YYYY-MM-DD HH:MM:SS"` as sent in `dt_txt`.
    pub timestamp: Option<String>,
    pub temperature_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub precipitation_mm: f64,
}
