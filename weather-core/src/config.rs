use anyhow::{Context, Result, anyhow, ensure};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::{Path, PathBuf}, time::Duration};

use crate::export::OutputFormat;

/// Environment variable holding the OpenWeatherMap API key.
pub const API_KEY_ENV_VAR: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_CITY: &str = "Warszawa";

/// Connection and retry settings for the HTTP transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_secs: f64,
    pub read_timeout_secs: f64,
    /// Idle connections kept per host; should not be below `Config::concurrency`.
    pub pool_size: usize,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 3.5,
            read_timeout_secs: 10.0,
            pool_size: 10,
            max_attempts: 5,
            initial_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub current_url: String,
    pub forecast_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            current_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            forecast_url: "https://api.openweathermap.org/data/2.5/forecast".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// forecast_days = 3
///
/// [http]
/// read_timeout_secs = 5.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overridden by `OPENWEATHER_API_KEY` when that is set.
    pub api_key: Option<String>,
    pub forecast_days: i64,
    /// Upper bound on cities fetched at the same time.
    pub concurrency: usize,
    pub output_format: OutputFormat,
    pub output_file: PathBuf,
    pub http: HttpSettings,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            forecast_days: 2,
            concurrency: 8,
            output_format: OutputFormat::Json,
            output_file: PathBuf::from("weather_results.json"),
            http: HttpSettings::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Load config from the platform config dir, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config dir.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.concurrency >= 1, "concurrency must be at least 1");
        ensure!(
            self.http.pool_size >= self.concurrency,
            "http.pool_size ({}) must not be below concurrency ({})",
            self.http.pool_size,
            self.concurrency
        );
        for (name, secs) in [
            ("connect_timeout_secs", self.http.connect_timeout_secs),
            ("read_timeout_secs", self.http.read_timeout_secs),
        ] {
            ensure!(
                secs > 0.0 && Duration::try_from_secs_f64(secs).is_ok(),
                "http.{name} must be a positive, finite number of seconds (got {secs})"
            );
        }
        ensure!(self.http.max_attempts >= 1, "http.max_attempts must be at least 1");
        Ok(())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// API key from the environment, falling back to the config file. Blank values count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        let from_env = env::var(API_KEY_ENV_VAR).ok();
        pick_api_key(from_env.as_deref(), self.api_key.as_deref())
    }
}

fn pick_api_key(from_env: Option<&str>, from_file: Option<&str>) -> Option<String> {
    [from_env, from_file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .map(str::to_string)
}
