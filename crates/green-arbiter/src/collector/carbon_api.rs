use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::CarbonApiConfig;

pub const MOCK_SOURCE_TAG: &str = "mock:zone-table";
pub const FALLBACK_SOURCE_TAG: &str = "fallback:zone-table";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub carbon_intensity: f64,
    pub datetime: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonForecast {
    pub zone: String,
    #[serde(default)]
    pub forecast: Vec<ForecastPoint>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CarbonForecast {
    /// Earliest point at or after `now`; the latest point when the forecast lies in the past.
    pub fn current_point(&self, now: DateTime<Utc>) -> Option<&ForecastPoint> {
        self.forecast
            .iter()
            .filter(|point| point.datetime >= now)
            .min_by_key(|point| point.datetime)
            .or_else(|| self.forecast.iter().max_by_key(|point| point.datetime))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerBreakdown {
    #[serde(default)]
    pub renewable_percentage: Option<f64>,
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpstreamError {
    #[error("zone {zone} is not known to the carbon provider")]
    NotFound { zone: String },
    #[error("carbon provider rate limit reached")]
    RateLimited,
    #[error("carbon provider failed with status {status}")]
    Server { status: u16 },
    #[error("carbon provider did not answer within the timeout")]
    Timeout,
    #[error("carbon provider returned an empty forecast for {zone}")]
    EmptyForecast { zone: String },
    #[error("carbon provider rejected the request: status={status}, body={body}")]
    Api { status: u16, body: String },
    #[error("carbon provider unreachable: {0}")]
    Unreachable(String),
    #[error("carbon provider payload could not be parsed: {0}")]
    Malformed(String),
    #[error("http client error: {0}")]
    Client(String),
}

impl UpstreamError {
    /// Errors that leave no fair basis for a carbon score. Everything else degrades to the
    /// zone table.
    pub fn escalates(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::RateLimited
                | Self::Server { .. }
                | Self::Timeout
                | Self::EmptyForecast { .. }
        )
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Unreachable(err.to_string())
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Client(err.to_string())
        }
    }

    fn from_status(status: StatusCode, zone: &str, body: String) -> Self {
        match status.as_u16() {
            404 => Self::NotFound {
                zone: zone.to_string(),
            },
            429 => Self::RateLimited,
            code if status.is_server_error() => Self::Server { status: code },
            code => Self::Api { status: code, body },
        }
    }
}

/// Provider of grid carbon data for a zone.
#[async_trait::async_trait]
pub trait CarbonIntensitySource: Send + Sync {
    /// Tag recorded as the `data_source` of metrics built from this source.
    fn name(&self) -> &'static str;

    async fn forecast(&self, zone: &str) -> Result<CarbonForecast, UpstreamError>;

    async fn power_breakdown(&self, zone: &str) -> Result<PowerBreakdown, UpstreamError>;
}

#[derive(Clone)]
pub struct ElectricityMapsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ElectricityMapsClient {
    pub fn new(config: &CarbonApiConfig, api_key: impl Into<String>) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| UpstreamError::Client(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn get<T>(&self, path: &str, zone: &str) -> Result<T, UpstreamError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&[("zone", zone)])
            .header("auth-token", &self.api_key)
            .send()
            .await
            .map_err(UpstreamError::from_transport)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(status, zone, body));
        }

        let body = res.text().await.map_err(UpstreamError::from_transport)?;
        serde_json::from_str(&body).map_err(|err| UpstreamError::Malformed(err.to_string()))
    }
}

#[async_trait::async_trait]
impl CarbonIntensitySource for ElectricityMapsClient {
    fn name(&self) -> &'static str {
        "electricitymaps"
    }

    async fn forecast(&self, zone: &str) -> Result<CarbonForecast, UpstreamError> {
        let forecast: CarbonForecast = self.get("/v3/carbon-intensity/forecast", zone).await?;
        if forecast.forecast.is_empty() {
            return Err(UpstreamError::EmptyForecast {
                zone: zone.to_string(),
            });
        }
        Ok(forecast)
    }

    async fn power_breakdown(&self, zone: &str) -> Result<PowerBreakdown, UpstreamError> {
        self.get("/v3/power-breakdown/latest", zone).await
    }
}

/// Typical grid profile for a zone: intensity in gCO2/kWh and renewable share in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneProfile {
    pub carbon_intensity: f64,
    pub renewable_percentage: f64,
}

const ZONE_PROFILES: &[(&str, f64, f64)] = &[
    ("US-MIDA-PJM", 380.0, 12.0),
    ("US-NW-BPAT", 90.0, 80.0),
    ("US-MIDW-MISO", 450.0, 28.0),
    ("CA-QC", 30.0, 95.0),
    ("IE", 290.0, 40.0),
    ("FR", 55.0, 25.0),
    ("DE", 380.0, 48.0),
    ("BE", 160.0, 30.0),
    ("NL", 300.0, 45.0),
    ("SE-SE3", 25.0, 70.0),
    ("FI", 70.0, 55.0),
    ("IN-WE", 650.0, 15.0),
    ("JP-TK", 470.0, 22.0),
    ("TW", 540.0, 10.0),
    ("AU-NSW", 600.0, 30.0),
    ("BR-CS", 90.0, 85.0),
];

const DEFAULT_PROFILE: ZoneProfile = ZoneProfile {
    carbon_intensity: 400.0,
    renewable_percentage: 25.0,
};

pub fn zone_profile(zone: &str) -> ZoneProfile {
    ZONE_PROFILES
        .iter()
        .find(|(name, ..)| name.eq_ignore_ascii_case(zone))
        .map(|(_, carbon_intensity, renewable_percentage)| ZoneProfile {
            carbon_intensity: *carbon_intensity,
            renewable_percentage: *renewable_percentage,
        })
        .unwrap_or(DEFAULT_PROFILE)
}

/// Offline source that serves the static zone profiles as a one-point forecast.
#[derive(Debug, Clone, Default)]
pub struct ZoneTableSource;

#[async_trait::async_trait]
impl CarbonIntensitySource for ZoneTableSource {
    fn name(&self) -> &'static str {
        MOCK_SOURCE_TAG
    }

    async fn forecast(&self, zone: &str) -> Result<CarbonForecast, UpstreamError> {
        let now = Utc::now();
        Ok(CarbonForecast {
            zone: zone.to_string(),
            forecast: vec![ForecastPoint {
                carbon_intensity: zone_profile(zone).carbon_intensity,
                datetime: now,
            }],
            updated_at: Some(now),
        })
    }

    async fn power_breakdown(&self, zone: &str) -> Result<PowerBreakdown, UpstreamError> {
        Ok(PowerBreakdown {
            renewable_percentage: Some(zone_profile(zone).renewable_percentage),
            datetime: Some(Utc::now()),
        })
    }
}

/// Live client when an API key is configured, the zone table otherwise.
pub fn build_carbon_source(
    config: &CarbonApiConfig,
) -> Result<Arc<dyn CarbonIntensitySource>, UpstreamError> {
    match config.api_key.as_deref() {
        Some(key) => Ok(Arc::new(ElectricityMapsClient::new(config, key)?)),
        None => Ok(Arc::new(ZoneTableSource)),
    }
}
