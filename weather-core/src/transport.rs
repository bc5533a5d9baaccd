//! HTTP GET returning JSON, with retry on transient failures.

use std::{fmt::Debug, future::Future, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{config::HttpSettings, error::WeatherError};

/// Performs a single logical GET: `url?query` to a decoded JSON body.
///
/// Implementations own their retry behaviour; callers see only the final outcome.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, WeatherError>;
}

/// Exponential backoff over a fixed number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, initial_backoff: Duration::from_millis(500) }
    }
}

impl From<&HttpSettings> for RetryPolicy {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self { max_attempts, initial_backoff }
    }

    /// Delay after the failed attempt number `attempt` (0-based): `initial * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 0-based attempt number. There is no delay after the last attempt.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, WeatherError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, WeatherError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// `reqwest`-backed transport with a pooled client.
///
/// Timeouts apply to each attempt separately.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(settings: &HttpSettings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let connect_timeout = Duration::try_from_secs_f64(settings.connect_timeout_secs)
            .context("Invalid http.connect_timeout_secs")?;
        let read_timeout = Duration::try_from_secs_f64(settings.read_timeout_secs)
            .context("Invalid http.read_timeout_secs")?;

        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .pool_max_idle_per_host(settings.pool_size)
            .default_headers(headers)
            .build()?;

        Ok(Self { http, retry: RetryPolicy::from(settings) })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn attempt(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, WeatherError> {
        // `without_url` keeps the API key in the query string out of error messages.
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| WeatherError::network(e.without_url().to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(WeatherError::http_status(status.as_u16(), provider_message(&body)));
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::decode(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, WeatherError> {
        self.retry
            .run(|attempt| {
                debug!(url, attempt = attempt + 1, "GET");
                self.attempt(url, query)
            })
            .await
    }
}

/// OpenWeatherMap puts a human-readable `message` into its error bodies.
fn provider_message(body: &str) -> Option<String> {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = json.get("message").and_then(Value::as_str) {
            return Some(msg.to_string());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() { None } else { Some(truncate_body(trimmed)) }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
