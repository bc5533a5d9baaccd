use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::model::{DailyForecast, ForecastItem, WeatherSample};

/// First 10 characters of a `"YYYY-MM-DD HH:MM:SS"` timestamp, or `None` if it is shorter.
fn bucket_key(timestamp: &str) -> Option<&str> {
    match timestamp.char_indices().nth(10) {
        Some((end, _)) => Some(&timestamp[..end]),
        None if timestamp.chars().count() == 10 => Some(timestamp),
        None => None,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn reduce_bucket(key: &str, bucket: &[&ForecastItem]) -> Option<DailyForecast> {
    let Ok(date) = NaiveDate::parse_from_str(key, "%Y-%m-%d") else {
        debug!(key, entries = bucket.len(), "dropping forecast day with invalid date");
        return None;
    };

    let temps: Vec<f64> = bucket.iter().filter_map(|i| i.temperature_c).collect();
    let winds: Vec<f64> = bucket.iter().filter_map(|i| i.wind_speed_ms).collect();
    let precipitation_mm: f64 = bucket.iter().map(|i| i.precipitation_mm).sum();

    let (Some(temperature_c), Some(wind_speed_ms)) = (mean(&temps), mean(&winds)) else {
        debug!(%date, entries = bucket.len(), "dropping forecast day without valid readings");
        return None;
    };

    Some(DailyForecast {
        date,
        sample: WeatherSample { temperature_c, precipitation_mm, wind_speed_ms },
    })
}

/// Collapse 3-hourly forecast items into one summary per calendar date.
///
/// Date keys are sorted ascending as text and cut to the first `max_days`
/// *before* each bucket is reduced. A bucket whose key is not a real date, or
/// that has no valid temperature or wind reading, is dropped afterwards and
/// later dates are not promoted into its slot, so the result can be shorter
/// than `max_days`. Temperature and wind are averaged, precipitation is summed.
pub fn aggregate_daily(items: &[ForecastItem], max_days: i64) -> Vec<DailyForecast> {
    let max_days = usize::try_from(max_days).unwrap_or(0);
    if max_days == 0 {
        return Vec::new();
    }

    let mut by_date: BTreeMap<&str, Vec<&ForecastItem>> = BTreeMap::new();
    for item in items {
        let Some(key) = item.timestamp.as_deref().and_then(bucket_key) else {
            debug!(timestamp = ?item.timestamp, "skipping forecast item with short timestamp");
            continue;
        };
        by_date.entry(key).or_default().push(item);
    }

    by_date
        .iter()
        .take(max_days)
        .filter_map(|(key, bucket)| reduce_bucket(key, bucket))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(ts: &str, temp: Option<f64>, wind: Option<f64>, precip: f64) -> ForecastItem {
        ForecastItem {
            timestamp: Some(ts.to_string()),
            temperature_c: temp,
            wind_speed_ms: wind,
            precipitation_mm: precip,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
    }

    fn three_days() -> Vec<ForecastItem> {
        vec![
            item("2025-10-09 00:00:00", Some(9.0), Some(3.0), 0.0),
            item("2025-10-07 00:00:00", Some(10.0), Some(2.0), 0.5),
            item("2025-10-07 03:00:00", Some(14.0), Some(4.0), 1.0),
            item("2025-10-08 12:00:00", Some(11.0), Some(5.0), 0.0),
        ]
    }

    #[test]
    fn caps_to_earliest_dates_in_ascending_order() {
        let daily = aggregate_daily(&three_days(), 2);

        let dates: Vec<NaiveDate> = daily.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date("2025-10-07"), date("2025-10-08")]);
    }

    #[test]
    fn averages_temperature_and_wind_and_sums_precipitation() {
        let daily = aggregate_daily(&three_days(), 5);

        assert_eq!(daily.len(), 3);
        let first = &daily[0];
        assert_eq!(first.date, date("2025-10-07"));
        assert_eq!(first.sample.temperature_c, 12.0);
        assert_eq!(first.sample.wind_speed_ms, 3.0);
        assert_eq!(first.sample.precipitation_mm, 1.5);
    }

    #[test]
    fn non_positive_max_days_yields_nothing() {
        assert!(aggregate_daily(&three_days(), 0).is_empty());
        assert!(aggregate_daily(&three_days(), -3).is_empty());
    }

    #[test]
    fn bucket_without_temperature_is_dropped_and_not_backfilled() {
        let items = vec![
            item("2025-10-07 00:00:00", None, Some(2.0), 0.0),
            item("2025-10-07 03:00:00", None, Some(3.0), 0.0),
            item("2025-10-08 00:00:00", Some(11.0), Some(5.0), 0.0),
            item("2025-10-09 00:00:00", Some(9.0), Some(3.0), 0.0),
        ];

        let daily = aggregate_daily(&items, 2);

        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].date, date("2025-10-08"));
    }

    #[test]
    fn bucket_without_wind_is_dropped() {
        let items = vec![
            item("2025-10-07 00:00:00", Some(10.0), None, 0.0),
            item("2025-10-08 00:00:00", Some(11.0), Some(5.0), 0.0),
        ];

        let daily = aggregate_daily(&items, 2);

        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].date, date("2025-10-08"));
    }

    #[test]
    fn partially_valid_bucket_uses_only_valid_readings() {
        let items = vec![
            item("2025-10-07 00:00:00", Some(10.0), None, 0.2),
            item("2025-10-07 03:00:00", None, Some(6.0), 0.3),
            item("2025-10-07 06:00:00", Some(20.0), Some(2.0), 0.0),
        ];

        let daily = aggregate_daily(&items, 1);

        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].sample.temperature_c, 15.0);
        assert_eq!(daily[0].sample.wind_speed_ms, 4.0);
        assert!((daily[0].sample.precipitation_mm - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_and_short_timestamps_are_skipped() {
        let items = vec![
            ForecastItem { timestamp: None, temperature_c: Some(1.0), wind_speed_ms: Some(1.0), precipitation_mm: 0.0 },
            item("2025-10", Some(1.0), Some(1.0), 0.0),
            item("2025-10-08 00:00:00", Some(11.0), Some(5.0), 0.0),
            item("2025-10-09 00:00:00", Some(12.0), Some(4.0), 0.0),
        ];

        let daily = aggregate_daily(&items, 1);

        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].date, date("2025-10-08"));
    }

    #[test]
    fn invalid_date_takes_a_day_slot_without_producing_a_row() {
        let items = vec![
            item("2025-02-30 00:00:00", Some(1.0), Some(1.0), 0.0),
            item("2025-03-01 00:00:00", Some(2.0), Some(2.0), 0.0),
            item("2025-03-02 00:00:00", Some(3.0), Some(3.0), 0.0),
        ];

        let daily = aggregate_daily(&items, 2);

        let dates: Vec<NaiveDate> = daily.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date("2025-03-01")]);
    }

    #[test]
    fn non_date_prefix_sorts_as_text() {
        let items = vec![
            item("yesterday!", Some(1.0), Some(1.0), 0.0),
            item("2025-10-08 00:00:00", Some(11.0), Some(5.0), 0.0),
        ];

        let daily = aggregate_daily(&items, 2);

        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].date, date("2025-10-08"));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(aggregate_daily(&[], 5).is_empty());
    }
}
