use std::env;
use std::fmt;
use std::time::Duration;

use crate::scoring::{FactorWeights, WeightsError};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the arbiter.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub carbon_api: CarbonApiConfig,
    pub observer: ObserverConfig,
    pub weights: FactorWeights,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("ARBITER_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("ARBITER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let api_key = env::var("CARBON_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let base_url = env::var("CARBON_API_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_CARBON_API_URL.to_string());
        let timeout_secs = env::var("CARBON_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_CARBON_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let weights = match env::var("ARBITER_WEIGHTS") {
            Ok(raw) if !raw.trim().is_empty() => parse_weights(&raw)?,
            _ => FactorWeights::default(),
        };

        let mut observer = ObserverConfig::default();
        if let Ok(raw) = env::var("ARBITER_OBSERVER_LAT") {
            observer.latitude = parse_coordinate("ARBITER_OBSERVER_LAT", &raw, 90.0)?;
            observer.label = "custom observer".to_string();
        }
        if let Ok(raw) = env::var("ARBITER_OBSERVER_LON") {
            observer.longitude = parse_coordinate("ARBITER_OBSERVER_LON", &raw, 180.0)?;
            observer.label = "custom observer".to_string();
        }

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            carbon_api: CarbonApiConfig {
                api_key,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            observer,
            weights,
        })
    }
}

pub const DEFAULT_CARBON_API_URL: &str = "https://api.electricitymap.org";
pub const DEFAULT_CARBON_TIMEOUT_SECS: u64 = 10;

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection settings for the carbon-intensity provider. Without an API key the collector
/// serves deterministic per-zone values instead of calling out.
#[derive(Debug, Clone)]
pub struct CarbonApiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for CarbonApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_CARBON_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_CARBON_TIMEOUT_SECS),
        }
    }
}

/// Vantage point the geodesic latency estimate is computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverConfig {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            label: "Ashburn, VA".to_string(),
            latitude: 39.04,
            longitude: -77.49,
        }
    }
}

/// Parses `carbon=0.4,latency=0.4,cost=0.2`. Omitted factors are an error.
pub fn parse_weights(raw: &str) -> Result<FactorWeights, ConfigError> {
    let mut carbon = None;
    let mut latency = None;
    let mut cost = None;

    for pair in raw.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedWeights(pair.to_string()))?;
        let value = value
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::MalformedWeights(pair.to_string()))?;
        let slot = match name.trim().to_ascii_lowercase().as_str() {
            "carbon" => &mut carbon,
            "latency" => &mut latency,
            "cost" => &mut cost,
            _ => return Err(ConfigError::MalformedWeights(pair.to_string())),
        };
        *slot = Some(value);
    }

    match (carbon, latency, cost) {
        (Some(carbon), Some(latency), Some(cost)) => {
            FactorWeights::new(carbon, latency, cost).map_err(ConfigError::InvalidWeights)
        }
        _ => Err(ConfigError::MalformedWeights(raw.to_string())),
    }
}

fn parse_coordinate(name: &'static str, raw: &str, bound: f64) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.abs() <= bound)
        .ok_or(ConfigError::InvalidCoordinate { name })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidTimeout,
    InvalidCoordinate { name: &'static str },
    MalformedWeights(String),
    InvalidWeights(WeightsError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeout => {
                write!(f, "CARBON_API_TIMEOUT_SECS must be a positive integer")
            }
            ConfigError::InvalidCoordinate { name } => {
                write!(f, "{name} must be a decimal degree within range")
            }
            ConfigError::MalformedWeights(raw) => write!(
                f,
                "ARBITER_WEIGHTS must look like carbon=0.4,latency=0.4,cost=0.2 (got '{raw}')"
            ),
            ConfigError::InvalidWeights(err) => write!(f, "ARBITER_WEIGHTS rejected: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidWeights(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "ARBITER_ENV",
            "ARBITER_LOG_LEVEL",
            "CARBON_API_KEY",
            "CARBON_API_URL",
            "CARBON_API_TIMEOUT_SECS",
            "ARBITER_WEIGHTS",
            "ARBITER_OBSERVER_LAT",
            "ARBITER_OBSERVER_LON",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.carbon_api.api_key.is_none());
        assert_eq!(config.carbon_api.base_url, DEFAULT_CARBON_API_URL);
        assert_eq!(config.carbon_api.timeout, Duration::from_secs(10));
        assert_eq!(config.weights, FactorWeights::default());
        assert_eq!(config.observer, ObserverConfig::default());
    }

    #[test]
    fn load_reads_weights_and_blank_key_as_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ARBITER_WEIGHTS", "carbon=0.5, latency=0.3, cost=0.2");
        env::set_var("CARBON_API_KEY", "   ");
        env::set_var("ARBITER_ENV", "prod");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert!(config.carbon_api.api_key.is_none());
        assert!((config.weights.carbon() - 0.5).abs() < 1e-9);
        assert!((config.weights.latency() - 0.3).abs() < 1e-9);
        reset_env();
    }

    #[test]
    fn load_rejects_zero_timeout_and_bad_coordinates() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CARBON_API_TIMEOUT_SECS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidTimeout)
        ));

        reset_env();
        env::set_var("ARBITER_OBSERVER_LAT", "123.0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidCoordinate { name: "ARBITER_OBSERVER_LAT" })
        ));
        reset_env();
    }

    #[test]
    fn parse_weights_rejects_incomplete_and_unbalanced_input() {
        assert!(matches!(
            parse_weights("carbon=0.5,latency=0.5"),
            Err(ConfigError::MalformedWeights(_))
        ));
        assert!(matches!(
            parse_weights("carbon=0.5,latency=0.3,cost=0.1"),
            Err(ConfigError::InvalidWeights(_))
        ));
        assert!(matches!(
            parse_weights("carbon=half,latency=0.3,cost=0.2"),
            Err(ConfigError::MalformedWeights(_))
        ));
    }
}
