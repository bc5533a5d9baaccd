//! Strict decoding of OpenWeatherMap payloads into typed records.
//!
//! Payloads are first decoded into `Ow*` intermediate structs whose fields are
//! all optional, then validated. Sub-objects of the wrong JSON type decode to
//! `None` instead of failing the whole payload, so validation can report
//! exactly which field is missing.

use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::WeatherError,
    model::{CurrentWeather, ForecastItem, WeatherSample},
};

#[derive(Debug, Default, Deserialize)]
struct OwPrecip {
    #[serde(rename = "1h", default)]
    one_hour: Option<Value>,
    #[serde(rename = "3h", default)]
    three_hours: Option<Value>,
}

impl OwPrecip {
    fn total_mm(&self) -> f64 {
        [&self.one_hour, &self.three_hours]
            .into_iter()
            .flatten()
            .filter_map(strict_number)
            .map(|mm| mm.max(0.0))
            .sum()
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    #[serde(default)]
    temp: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    main: Option<OwMain>,
    #[serde(default, deserialize_with = "lenient")]
    wind: Option<OwWind>,
    #[serde(default, deserialize_with = "lenient")]
    rain: Option<OwPrecip>,
    #[serde(default, deserialize_with = "lenient")]
    snow: Option<OwPrecip>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    #[serde(default, deserialize_with = "lenient")]
    dt_txt: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    main: Option<OwMain>,
    #[serde(default, deserialize_with = "lenient")]
    wind: Option<OwWind>,
    #[serde(default, deserialize_with = "lenient")]
    rain: Option<OwPrecip>,
    #[serde(default, deserialize_with = "lenient")]
    snow: Option<OwPrecip>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    list: Option<Vec<Value>>,
}

/// Accepts any JSON value; anything that doesn't fit `T` becomes `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn strict_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Numbers pass through, numeric strings are parsed, anything else is rejected.
fn coerce_number(field: &str, value: &Value) -> Result<f64, WeatherError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| WeatherError::validation(format!("field '{field}' is not a finite number"))),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            WeatherError::validation(format!("field '{field}' is not numeric: {s:?}"))
        }),
        other => Err(WeatherError::validation(format!(
            "field '{field}' has non-numeric type: {other}"
        ))),
    }
}

/// Display name as text. Numbers and booleans are spelled out; `null` counts as absent.
fn coerce_name(value: Option<&Value>) -> Result<Option<String>, WeatherError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(scalar @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(scalar.to_string())),
        Some(other) => Err(WeatherError::validation(format!(
            "field 'name' has non-text type: {other}"
        ))),
    }
}

fn precipitation_of(rain: Option<&OwPrecip>, snow: Option<&OwPrecip>) -> f64 {
    rain.map_or(0.0, OwPrecip::total_mm) + snow.map_or(0.0, OwPrecip::total_mm)
}

fn decode<T: DeserializeOwned>(json: &Value, what: &str) -> Result<T, WeatherError> {
    if !json.is_object() {
        return Err(WeatherError::validation(format!("{what} payload is not a JSON object")));
    }

    T::deserialize(json).map_err(|e| WeatherError::validation(format!("{what} payload: {e}")))
}

/// Total precipitation (mm) of a current-weather payload or a forecast entry:
/// `rain.1h + rain.3h + snow.1h + snow.3h`, non-numeric or absent parts count as 0.
pub fn extract_precipitation_mm(json: &Value) -> f64 {
    #[derive(Deserialize)]
    struct Precip {
        #[serde(default, deserialize_with = "lenient")]
        rain: Option<OwPrecip>,
        #[serde(default, deserialize_with = "lenient")]
        snow: Option<OwPrecip>,
    }

    match Precip::deserialize(json) {
        Ok(p) => precipitation_of(p.rain.as_ref(), p.snow.as_ref()),
        Err(_) => 0.0,
    }
}

/// Validated current conditions with the provider's display name, if it sent one.
pub(crate) fn parse_current_parts(
    json: &Value,
) -> Result<(Option<String>, WeatherSample), WeatherError> {
    let parsed: OwCurrentResponse = decode(json, "current weather")?;
    let name = coerce_name(parsed.name.as_ref())?;

    let temp = parsed
        .main
        .as_ref()
        .and_then(|m| m.temp.as_ref())
        .ok_or_else(|| WeatherError::validation("missing field 'main.temp'"))?;
    let speed = parsed
        .wind
        .as_ref()
        .and_then(|w| w.speed.as_ref())
        .ok_or_else(|| WeatherError::validation("missing field 'wind.speed'"))?;

    let sample = WeatherSample {
        temperature_c: coerce_number("main.temp", temp)?,
        precipitation_mm: precipitation_of(parsed.rain.as_ref(), parsed.snow.as_ref()),
        wind_speed_ms: coerce_number("wind.speed", speed)?,
    };

    Ok((name, sample))
}

/// Parse a current-weather response. The resolved city name is required.
pub fn parse_current(json: &Value) -> Result<CurrentWeather, WeatherError> {
    let (name, sample) = parse_current_parts(json)?;
    let city = name.ok_or_else(|| WeatherError::validation("missing field 'name'"))?;

    Ok(CurrentWeather { city, sample })
}

/// Parse the `list` of a forecast response in provider order.
///
/// A missing or `null` list yields no items. Entries that are not JSON objects
/// are skipped; per-field problems are left for the aggregator to judge.
pub fn parse_forecast_items(json: &Value) -> Result<Vec<ForecastItem>, WeatherError> {
    let parsed: OwForecastResponse = decode(json, "forecast")?;

    let items = parsed
        .list
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| {
            if !raw.is_object() {
                debug!(index = idx, "skipping forecast entry that is not an object");
                return None;
            }
            let entry: OwForecastEntry = serde_json::from_value(raw).ok()?;

            Some(ForecastItem {
                timestamp: entry.dt_txt,
                temperature_c: entry.main.as_ref().and_then(|m| m.temp.as_ref()).and_then(strict_number),
                wind_speed_ms: entry.wind.as_ref().and_then(|w| w.speed.as_ref()).and_then(strict_number),
                precipitation_mm: precipitation_of(entry.rain.as_ref(), entry.snow.as_ref()),
            })
        })
        .collect();

    Ok(items)
}
