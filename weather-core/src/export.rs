//! Flattening bundles into rows and saving them as JSON or CSV.

use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::model::{CityBundle, CurrentWeather, WeatherSample};

/// `date` value used for the current-conditions row of a city.
pub const TODAY: &str = "today";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OutputFormat {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(anyhow::anyhow!(
                "Unknown output format '{value}'. Supported formats: json, csv."
            )),
        }
    }
}

/// One flattened line of output. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub city: String,
    /// `"today"` for current conditions, otherwise an ISO date.
    pub date: String,
    pub temperature_c: f64,
    pub precipitation_mm: f64,
    pub wind_speed_ms: f64,
}

impl ExportRow {
    fn new(city: &str, date: String, sample: &WeatherSample) -> Self {
        Self {
            city: city.to_string(),
            date,
            temperature_c: round2(sample.temperature_c),
            precipitation_mm: round2(sample.precipitation_mm),
            wind_speed_ms: round2(sample.wind_speed_ms),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A `today` row per bundle followed by its forecast days.
pub fn bundles_to_rows(bundles: &[CityBundle]) -> Vec<ExportRow> {
    bundles
        .iter()
        .flat_map(|bundle| {
            std::iter::once(ExportRow::new(&bundle.city, TODAY.to_string(), &bundle.current)).chain(
                bundle.forecast.iter().map(|day| {
                    ExportRow::new(&bundle.city, day.date.format("%Y-%m-%d").to_string(), &day.sample)
                }),
            )
        })
        .collect()
}

pub fn current_to_rows(current: &[CurrentWeather]) -> Vec<ExportRow> {
    current
        .iter()
        .map(|c| ExportRow::new(&c.city, TODAY.to_string(), &c.sample))
        .collect()
}

/// Write rows to `path`. An empty row set is refused.
pub fn write_rows(path: &Path, format: OutputFormat, rows: &[ExportRow]) -> Result<()> {
    if rows.is_empty() {
        bail!("No data available to save");
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, rows)
                .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
            // Dropping a BufWriter swallows flush errors.
            writer
                .flush()
                .with_context(|| format!("Failed to flush JSON to {}", path.display()))?;
        }
        OutputFormat::Csv => {
            let mut csv = csv::Writer::from_writer(writer);
            for row in rows {
                csv.serialize(row)
                    .with_context(|| format!("Failed to write CSV row to {}", path.display()))?;
            }
            csv.flush()
                .with_context(|| format!("Failed to flush CSV to {}", path.display()))?;
        }
    }

    Ok(())
}

pub fn read_json_rows(path: &Path) -> Result<Vec<ExportRow>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open export file: {}", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse exported JSON: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DailyForecast;
    use chrono::NaiveDate;

    fn sample(t: f64, p: f64, w: f64) -> WeatherSample {
        WeatherSample { temperature_c: t, precipitation_mm: p, wind_speed_ms: w }
    }

    fn bundles() -> Vec<CityBundle> {
        vec![
            CityBundle {
                city: "Warsaw".into(),
                current: sample(12.346, 0.0, 3.333),
                forecast: vec![
                    DailyForecast {
                        date: NaiveDate::from_ymd_opt(2025, 10, 7).expect("date"),
                        sample: sample(11.111, 1.005, 2.0),
                    },
                    DailyForecast {
                        date: NaiveDate::from_ymd_opt(2025, 10, 8).expect("date"),
                        sample: sample(9.0, 0.0, 4.567),
                    },
                ],
            },
            CityBundle { city: "Kraków".into(), current: sample(-1.0, 0.25, 0.5), forecast: vec![] },
        ]
    }

    #[test]
    fn bundles_flatten_with_today_row_first() {
        let rows = bundles_to_rows(&bundles());

        let keys: Vec<(&str, &str)> = rows.iter().map(|r| (r.city.as_str(), r.date.as_str())).collect();
        assert_eq!(
            keys,
            vec![
                ("Warsaw", "today"),
                ("Warsaw", "2025-10-07"),
                ("Warsaw", "2025-10-08"),
                ("Kraków", "today"),
            ]
        );
        assert_eq!(rows[0].temperature_c, 12.35);
        assert_eq!(rows[0].wind_speed_ms, 3.33);
        assert_eq!(rows[2].wind_speed_ms, 4.57);
    }

    #[test]
    fn json_export_reads_back_identically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("weather_results.json");
        let rows = bundles_to_rows(&bundles());

        write_rows(&path, OutputFormat::Json, &rows).expect("write json");
        let read_back = read_json_rows(&path).expect("read json");

        assert_eq!(read_back, rows);
    }

    #[test]
    fn csv_export_has_fixed_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("weather_results.csv");
        let current = vec![CurrentWeather { city: "Gdańsk".into(), sample: sample(5.0, 0.0, 7.25) }];

        write_rows(&path, OutputFormat::Csv, &current_to_rows(&current)).expect("write csv");
        let text = std::fs::read_to_string(&path).expect("read csv");
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some("city,date,temperature_c,precipitation_mm,wind_speed_ms"));
        assert_eq!(lines.next(), Some("Gdańsk,today,5.0,0.0,7.25"));
        assert_eq!(lines.next(), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn write_errors_are_reported_for_every_format() {
        let rows = bundles_to_rows(&bundles());
        let full = Path::new("/dev/full");

        for format in [OutputFormat::Json, OutputFormat::Csv] {
            let err = write_rows(full, format, &rows).unwrap_err();
            assert!(err.to_string().contains("/dev/full"), "{format}: {err:#}");
        }
    }

    #[test]
    fn empty_rows_are_not_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.json");

        let err = write_rows(&path, OutputFormat::Json, &[]).unwrap_err();

        assert!(err.to_string().contains("No data"));
        assert!(!path.exists());
    }

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!(OutputFormat::try_from("JSON").expect("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::try_from("csv").expect("csv"), OutputFormat::Csv);
        assert!(OutputFormat::try_from("xml").is_err());
    }
}
