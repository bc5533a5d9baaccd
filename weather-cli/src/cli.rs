use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;
use weather_core::{
    Config, FanOutSummary, FetchMode, OutputFormat, WeatherClient,
    config::DEFAULT_CITY,
    export::{ExportRow, bundles_to_rows, current_to_rows, write_rows},
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key in the config file.
    Configure,

    /// Show current weather and forecast for one or more cities.
    Show(ShowArgs),
}

#[derive(Debug, clap::Args)]
pub struct ShowArgs {
    /// City names; defaults to Warszawa.
    pub cities: Vec<String>,

    /// Fetch cities concurrently instead of one after another.
    #[arg(long)]
    pub concurrent: bool,

    /// Number of forecast days to aggregate (overrides config).
    #[arg(long, allow_negative_numbers = true)]
    pub days: Option<i64>,

    /// Only fetch current weather, no forecast.
    #[arg(long)]
    pub current_only: bool,

    /// Output format for the saved file: json or csv (overrides config).
    #[arg(long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Output file path (overrides config).
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Print results without saving them to a file.
    #[arg(long)]
    pub no_save: bool,
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    OutputFormat::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        match self.command {
            Command::Configure => configure(),
            Command::Show(args) => show(args).await,
        }
    }
}

fn configure() -> anyhow::Result<ExitCode> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeatherMap API key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim();
    if api_key.is_empty() {
        eprintln!("[error] API key must not be empty");
        return Ok(ExitCode::FAILURE);
    }

    config.set_api_key(api_key.to_string());
    let path = config.save()?;
    println!("Saved configuration to {}", path.display());

    Ok(ExitCode::SUCCESS)
}

/// `--output` if given, else the configured file with its extension set to the format.
fn output_path(explicit: Option<PathBuf>, configured: &std::path::Path, format: OutputFormat) -> PathBuf {
    explicit.unwrap_or_else(|| configured.with_extension(format.as_str()))
}

async fn show(args: ShowArgs) -> anyhow::Result<ExitCode> {
    let config = Config::load()?;
    debug!(endpoints = ?config.endpoints, concurrency = config.concurrency, "loaded configuration");

    let cities = if args.cities.is_empty() {
        vec![DEFAULT_CITY.to_string()]
    } else {
        args.cities
    };
    let mode = if args.concurrent {
        FetchMode::concurrent(config.concurrency)
    } else {
        FetchMode::Sequential
    };
    let days = args.days.unwrap_or(config.forecast_days);
    let format = args.format.unwrap_or(config.output_format);

    let client = WeatherClient::from_config(&config)?;

    let (rows, summary): (Vec<ExportRow>, FanOutSummary) = if args.current_only {
        let results = client.fetch_current_many(&cities, mode).await;
        let summary = FanOutSummary::of(&results);
        let mut ok = Vec::new();
        for result in results {
            match result {
                Ok(weather) => {
                    print!("{}", render::current(&weather));
                    ok.push(weather);
                }
                Err(err) => eprintln!("[error] {err}"),
            }
        }
        (current_to_rows(&ok), summary)
    } else {
        let results = client.fetch_bundles(&cities, days, mode).await;
        let summary = FanOutSummary::of(&results);
        let mut ok = Vec::new();
        for result in results {
            match result {
                Ok(bundle) => {
                    print!("{}", render::bundle(&bundle));
                    ok.push(bundle);
                }
                Err(err) => eprintln!("[error] {err}"),
            }
        }
        (bundles_to_rows(&ok), summary)
    };

    let mut success = summary.all_succeeded();

    if !args.no_save {
        let path = output_path(args.output, &config.output_file, format);
        match write_rows(&path, format, &rows) {
            Ok(()) => println!("Saved {} rows to {}", rows.len(), path.display()),
            Err(err) => {
                eprintln!("[error] {err:#}");
                success = false;
            }
        }
    }

    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
