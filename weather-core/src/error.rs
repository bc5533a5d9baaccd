use std::fmt;

use thiserror::Error;

/// HTTP statuses that are worth another attempt.
pub const TRANSIENT_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Everything that can go wrong between "city name" and "typed weather record".
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeatherError {
    #[error("Missing API key. Please set {env_var} in your environment or .env file.")]
    MissingCredential { env_var: String },

    #[error("Network issue while contacting OpenWeatherMap: {message}")]
    Network { message: String },

    #[error("HTTP error from OpenWeatherMap ({status}){}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    HttpStatus { status: u16, message: Option<String> },

    #[error("Received invalid JSON from OpenWeatherMap: {message}")]
    Decode { message: String },

    #[error("Unexpected response structure from OpenWeatherMap: {message}")]
    Validation { message: String },
}

impl WeatherError {
    pub fn missing_credential<S: Into<String>>(env_var: S) -> Self {
        Self::MissingCredential { env_var: env_var.into() }
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn http_status(status: u16, message: Option<String>) -> Self {
        Self::HttpStatus { status, message }
    }

    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode { message: message.into() }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Whether a retry loop is allowed to try again after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            WeatherError::Network { .. } => true,
            WeatherError::HttpStatus { status, .. } => TRANSIENT_STATUSES.contains(status),
            _ => false,
        }
    }
}

/// Which step of a per-city fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Credentials,
    Current,
    Forecast,
}

impl FetchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchPhase::Credentials => "credential check",
            FetchPhase::Current => "current weather",
            FetchPhase::Forecast => "forecast",
        }
    }
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single city, carried in that city's result slot.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{phase} failed for '{city}': {source}")]
pub struct FetchError {
    pub city: String,
    pub phase: FetchPhase,
    #[source]
    pub source: WeatherError,
}

impl FetchError {
    pub fn new<S: Into<String>>(city: S, phase: FetchPhase, source: WeatherError) -> Self {
        Self { city: city.into(), phase, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable() {
        for status in TRANSIENT_STATUSES {
            assert!(WeatherError::http_status(*status, None).is_transient());
        }
        assert!(WeatherError::network("connection reset").is_transient());
    }

    #[test]
    fn client_errors_and_bad_payloads_are_not_retryable() {
        assert!(!WeatherError::http_status(404, Some("city not found".into())).is_transient());
        assert!(!WeatherError::http_status(401, None).is_transient());
        assert!(!WeatherError::decode("eof").is_transient());
        assert!(!WeatherError::validation("missing field").is_transient());
        assert!(!WeatherError::missing_credential("OPENWEATHER_API_KEY").is_transient());
    }

    #[test]
    fn http_status_message_is_attached_when_present() {
        let err = WeatherError::http_status(404, Some("city not found".into()));
        assert_eq!(err.to_string(), "HTTP error from OpenWeatherMap (404): city not found");

        let err = WeatherError::http_status(502, None);
        assert_eq!(err.to_string(), "HTTP error from OpenWeatherMap (502)");
    }

    #[test]
    fn fetch_error_names_city_and_phase() {
        let err = FetchError::new("Atlantis", FetchPhase::Forecast, WeatherError::http_status(404, None));
        let msg = err.to_string();

        assert!(msg.contains("forecast failed"));
        assert!(msg.contains("'Atlantis'"));
        assert!(msg.contains("404"));
    }
}
