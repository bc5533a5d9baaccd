//! Human-readable console output.

use std::fmt::Write;

use weather_core::{CityBundle, CurrentWeather, WeatherSample};

fn sample_lines(out: &mut String, sample: &WeatherSample) {
    let _ = writeln!(out, "  • Temperature  : {:.1} °C", sample.temperature_c);
    let _ = writeln!(out, "  • Precipitation: {:.1} mm", sample.precipitation_mm);
    let _ = writeln!(out, "  • Wind speed   : {:.1} m/s", sample.wind_speed_ms);
}

pub fn current(weather: &CurrentWeather) -> String {
    let mut out = format!("Weather in {}:\n", weather.city);
    sample_lines(&mut out, &weather.sample);
    out
}

pub fn bundle(bundle: &CityBundle) -> String {
    let mut out = format!("Weather in {}:\n", bundle.city);
    sample_lines(&mut out, &bundle.current);

    if bundle.forecast.is_empty() {
        out.push_str("  Forecast: no data\n");
        return out;
    }

    out.push_str("  Forecast:\n");
    for day in &bundle.forecast {
        let _ = writeln!(
            out,
            "    {}: {:.1} °C, {:.1} mm, {:.1} m/s",
            day.date.format("%Y-%m-%d"),
            day.sample.temperature_c,
            day.sample.precipitation_mm,
            day.sample.wind_speed_ms,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use weather_core::DailyForecast;

    fn sample() -> WeatherSample {
        WeatherSample { temperature_c: 12.34, precipitation_mm: 0.0, wind_speed_ms: 3.06 }
    }

    #[test]
    fn current_block_lists_all_values() {
        let text = current(&CurrentWeather { city: "Warsaw".into(), sample: sample() });

        assert!(text.starts_with("Weather in Warsaw:\n"));
        assert!(text.contains("12.3 °C"));
        assert!(text.contains("0.0 mm"));
        assert!(text.contains("3.1 m/s"));
    }

    #[test]
    fn bundle_block_lists_forecast_days() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 7).expect("valid date");
        let text = bundle(&CityBundle {
            city: "Warsaw".into(),
            current: sample(),
            forecast: vec![DailyForecast { date, sample: sample() }],
        });

        assert!(text.contains("  Forecast:\n"));
        assert!(text.contains("    2025-10-07: 12.3 °C, 0.0 mm, 3.1 m/s"));
    }

    #[test]
    fn bundle_without_forecast_says_so() {
        let text = bundle(&CityBundle { city: "Oslo".into(), current: sample(), forecast: vec![] });
        assert!(text.contains("Forecast: no data"));
    }
}
