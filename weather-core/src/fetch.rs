use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    aggregate::aggregate_daily,
    config::{Config, Endpoints, API_KEY_ENV_VAR},
    error::{FetchError, FetchPhase, WeatherError},
    fanout::{FanOutSummary, FetchMode, fetch_all},
    model::{CityBundle, CurrentWeather, WeatherSample},
    parser::{parse_current, parse_current_parts, parse_forecast_items},
    transport::{HttpTransport, Transport},
};

/// Fetches current weather and forecast bundles through an injected [`Transport`].
#[derive(Debug, Clone)]
pub struct WeatherClient {
    transport: Arc<dyn Transport>,
    api_key: Option<String>,
    endpoints: Endpoints,
}

impl WeatherClient {
    pub fn new(transport: Arc<dyn Transport>, api_key: Option<String>, endpoints: Endpoints) -> Self {
        Self { transport, api_key, endpoints }
    }

    /// Build a client with a pooled HTTP transport from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config.http)?;
        Ok(Self::new(Arc::new(transport), config.resolve_api_key(), config.endpoints.clone()))
    }

    fn api_key(&self, city: &str) -> Result<&str, FetchError> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            FetchError::new(city, FetchPhase::Credentials, WeatherError::missing_credential(API_KEY_ENV_VAR))
        })
    }

    fn query<'a>(city: &'a str, api_key: &'a str) -> [(&'static str, &'a str); 3] {
        [("q", city), ("appid", api_key), ("units", "metric")]
    }

    /// Current conditions for one city; the provider must report a city name.
    pub async fn fetch_current(&self, city: &str) -> Result<CurrentWeather, FetchError> {
        let api_key = self.api_key(city)?;

        let json = self
            .transport
            .get_json(&self.endpoints.current_url, &Self::query(city, api_key))
            .await
            .map_err(|e| FetchError::new(city, FetchPhase::Current, e))?;

        parse_current(&json).map_err(|e| FetchError::new(city, FetchPhase::Current, e))
    }

    /// Current conditions plus up to `days` daily forecasts for one city.
    ///
    /// Both requests must succeed; there are no partial bundles.
    pub async fn fetch_bundle(&self, city: &str, days: i64) -> Result<CityBundle, FetchError> {
        let api_key = self.api_key(city)?;
        let query = Self::query(city, api_key);

        let current = async {
            self.transport
                .get_json(&self.endpoints.current_url, &query)
                .await
                .and_then(|json| parse_current_parts(&json))
                .map_err(|e| FetchError::new(city, FetchPhase::Current, e))
        };
        let forecast = async {
            self.transport
                .get_json(&self.endpoints.forecast_url, &query)
                .await
                .and_then(|json| parse_forecast_items(&json))
                .map_err(|e| FetchError::new(city, FetchPhase::Forecast, e))
        };

        // Wait for both so a double failure is always reported as the current call's.
        let (current, forecast) = tokio::join!(current, forecast);
        let (name, current): (Option<String>, WeatherSample) = current?;
        let items = forecast?;

        let forecast = aggregate_daily(&items, days);
        debug!(city, items = items.len(), days = forecast.len(), "aggregated forecast");

        Ok(CityBundle {
            city: name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| city.to_string()),
            current,
            forecast,
        })
    }

    pub async fn fetch_bundles(
        &self,
        cities: &[String],
        days: i64,
        mode: FetchMode,
    ) -> Vec<Result<CityBundle, FetchError>> {
        let results =
            fetch_all(cities, mode, |city| async move { self.fetch_bundle(&city, days).await }).await;
        log_summary("bundles", &results);
        results
    }

    pub async fn fetch_current_many(
        &self,
        cities: &[String],
        mode: FetchMode,
    ) -> Vec<Result<CurrentWeather, FetchError>> {
        let results = fetch_all(cities, mode, |city| async move { self.fetch_current(&city).await }).await;
        log_summary("current weather", &results);
        results
    }
}

fn log_summary<T>(what: &str, results: &[Result<T, FetchError>]) {
    let summary = FanOutSummary::of(results);
    info!(what, succeeded = summary.succeeded, failed = summary.failed, "fan-out finished");
}
