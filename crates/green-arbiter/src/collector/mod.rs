//! Metric collection. This is the only layer that reaches outside the process.

mod carbon_api;
mod estimates;
mod zones;

pub use carbon_api::{
    build_carbon_source, zone_profile, CarbonForecast, CarbonIntensitySource,
    ElectricityMapsClient, ForecastPoint, PowerBreakdown, UpstreamError, ZoneProfile,
    ZoneTableSource, FALLBACK_SOURCE_TAG, MOCK_SOURCE_TAG,
};
pub use estimates::{geodesic_latency, haversine_km, list_price_cost, GEODESIC_SOURCE_TAG};
pub use zones::ZoneDirectory;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::analysis::MAX_VALID_INTENSITY;
use crate::config::{AppConfig, ObserverConfig};
use crate::domain::{CarbonMetrics, CostMetrics, Factor, LatencyMetrics, Region};

/// Raw metric retrieval for one region. Each call is independent and may run concurrently
/// with the others.
#[async_trait::async_trait]
pub trait MetricCollector: Send + Sync {
    fn name(&self) -> &'static str;

    async fn latency(&self, region: &Region) -> Result<LatencyMetrics, CollectorError>;

    async fn carbon(&self, region: &Region) -> Result<CarbonMetrics, CollectorError>;

    async fn cost(&self, region: &Region) -> Result<CostMetrics, CollectorError>;
}

/// A factor could not be measured fairly. The region receives a Blue Card.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "{factor} data unavailable for {region}: {}",
    .cause.as_deref().unwrap_or("no cause reported")
)]
pub struct CollectionFailure {
    pub region: String,
    pub factor: Factor,
    pub cause: Option<String>,
}

impl CollectionFailure {
    pub fn new(region: &Region, factor: Factor, cause: impl Into<String>) -> Self {
        Self {
            region: region.key(),
            factor,
            cause: Some(cause.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollectorError {
    #[error(transparent)]
    Failure(#[from] CollectionFailure),
    /// Anything the collector did not anticipate; aborts the evaluation.
    #[error("{factor} collector fault for {region}: {message}")]
    Fault {
        region: String,
        factor: Factor,
        message: String,
    },
}

/// Collector backed by a carbon source, with geodesic latency and list-price cost estimates.
pub struct StandardCollector {
    carbon_source: Arc<dyn CarbonIntensitySource>,
    zones: ZoneDirectory,
    observer: ObserverConfig,
}

impl StandardCollector {
    pub fn new(carbon_source: Arc<dyn CarbonIntensitySource>, observer: ObserverConfig) -> Self {
        Self {
            carbon_source,
            zones: ZoneDirectory::standard(),
            observer,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        let carbon_source = build_carbon_source(&config.carbon_api)?;
        Ok(Self::new(carbon_source, config.observer.clone()))
    }

    pub fn with_zones(mut self, zones: ZoneDirectory) -> Self {
        self.zones = zones;
        self
    }

    pub fn carbon_source_name(&self) -> &'static str {
        self.carbon_source.name()
    }

    fn fallback(zone: String, now: DateTime<Utc>) -> CarbonMetrics {
        let profile = zone_profile(&zone);
        CarbonMetrics {
            carbon_intensity: profile.carbon_intensity,
            renewable_percentage: profile.renewable_percentage,
            data_source: FALLBACK_SOURCE_TAG.to_string(),
            last_updated: Some(now),
            zone,
        }
    }
}

#[async_trait::async_trait]
impl MetricCollector for StandardCollector {
    fn name(&self) -> &'static str {
        "standard-collector"
    }

    async fn latency(&self, region: &Region) -> Result<LatencyMetrics, CollectorError> {
        Ok(geodesic_latency(&self.observer, region, Utc::now()))
    }

    async fn carbon(&self, region: &Region) -> Result<CarbonMetrics, CollectorError> {
        let zone = self.zones.resolve(region);
        let now = Utc::now();

        let forecast = match self.carbon_source.forecast(&zone).await {
            Ok(forecast) => forecast,
            Err(err) if err.escalates() => {
                return Err(CollectionFailure::new(region, Factor::Carbon, err.to_string()).into());
            }
            Err(err) => {
                warn!(region = %region.key(), zone = %zone, error = %err, "carbon forecast degraded to zone table");
                return Ok(Self::fallback(zone, now));
            }
        };

        let Some(point) = forecast.current_point(now).copied() else {
            let err = UpstreamError::EmptyForecast { zone };
            return Err(CollectionFailure::new(region, Factor::Carbon, err.to_string()).into());
        };
        let carbon_intensity = match checked_intensity(point.carbon_intensity) {
            Ok(intensity) => intensity,
            Err(err) => {
                warn!(region = %region.key(), zone = %zone, error = %err, "carbon forecast degraded to zone table");
                return Ok(Self::fallback(zone, now));
            }
        };
        let last_updated = forecast.updated_at.unwrap_or(point.datetime);

        let renewable = match self.carbon_source.power_breakdown(&zone).await {
            Ok(PowerBreakdown {
                renewable_percentage: Some(share),
                ..
            }) => match checked_share(share) {
                Ok(share) => Some(share),
                Err(err) => {
                    warn!(region = %region.key(), zone = %zone, error = %err, "power breakdown degraded to zone table");
                    None
                }
            },
            Ok(_) => {
                warn!(region = %region.key(), zone = %zone, "power breakdown missing renewable share");
                None
            }
            Err(err) if err.escalates() => {
                return Err(CollectionFailure::new(region, Factor::Carbon, err.to_string()).into());
            }
            Err(err) => {
                warn!(region = %region.key(), zone = %zone, error = %err, "power breakdown degraded to zone table");
                None
            }
        };

        let (renewable_percentage, data_source) = match renewable {
            Some(share) => (share, self.carbon_source.name().to_string()),
            None => (
                zone_profile(&zone).renewable_percentage,
                FALLBACK_SOURCE_TAG.to_string(),
            ),
        };

        debug!(
            region = %region.key(),
            zone = %zone,
            intensity = carbon_intensity,
            renewable = renewable_percentage,
            source = %data_source,
            "carbon metrics collected"
        );

        Ok(CarbonMetrics {
            carbon_intensity,
            renewable_percentage,
            data_source,
            last_updated: Some(last_updated),
            zone,
        })
    }

    async fn cost(&self, region: &Region) -> Result<CostMetrics, CollectorError> {
        Ok(list_price_cost(region))
    }
}

/// Provider values outside what the analyzers accept are bad payloads, not caller errors.
fn checked_intensity(value: f64) -> Result<f64, UpstreamError> {
    if value.is_finite() && (0.0..=MAX_VALID_INTENSITY).contains(&value) {
        Ok(value)
    } else {
        Err(UpstreamError::Malformed(format!(
            "carbon intensity {value} g/kWh is outside 0..={MAX_VALID_INTENSITY}"
        )))
    }
}

fn checked_share(value: f64) -> Result<f64, UpstreamError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(UpstreamError::Malformed(format!(
            "renewable share {value}% is outside 0..=100"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use std::sync::Mutex;

    /// Source that replays canned results and records requested zones.
    struct ScriptedSource {
        forecast: Result<CarbonForecast, UpstreamError>,
        breakdown: Result<PowerBreakdown, UpstreamError>,
        zones: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn new(
            forecast: Result<CarbonForecast, UpstreamError>,
            breakdown: Result<PowerBreakdown, UpstreamError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                forecast,
                breakdown,
                zones: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl CarbonIntensitySource for ScriptedSource {
        fn name(&self) -> &'static str {
            "electricitymaps"
        }

        async fn forecast(&self, zone: &str) -> Result<CarbonForecast, UpstreamError> {
            self.zones.lock().expect("zones mutex").push(zone.to_string());
            self.forecast.clone()
        }

        async fn power_breakdown(&self, _zone: &str) -> Result<PowerBreakdown, UpstreamError> {
            self.breakdown.clone()
        }
    }

    fn forecast(intensity: f64) -> CarbonForecast {
        CarbonForecast {
            zone: "SE-SE3".to_string(),
            forecast: vec![ForecastPoint {
                carbon_intensity: intensity,
                datetime: Utc::now(),
            }],
            updated_at: Some(Utc::now()),
        }
    }

    fn breakdown(share: f64) -> PowerBreakdown {
        PowerBreakdown {
            renewable_percentage: Some(share),
            datetime: None,
        }
    }

    fn stockholm() -> Region {
        catalog::find("aws:eu-north-1").expect("catalog region")
    }

    #[tokio::test]
    async fn live_values_carry_source_name() {
        let source = ScriptedSource::new(Ok(forecast(31.0)), Ok(breakdown(72.0)));
        let collector = StandardCollector::new(source.clone(), ObserverConfig::default());

        let metrics = collector.carbon(&stockholm()).await.expect("carbon collected");
        assert_eq!(metrics.carbon_intensity, 31.0);
        assert_eq!(metrics.renewable_percentage, 72.0);
        assert_eq!(metrics.data_source, "electricitymaps");
        assert_eq!(metrics.zone, "SE-SE3");
        assert_eq!(*source.zones.lock().expect("zones mutex"), vec!["SE-SE3"]);
    }

    #[tokio::test]
    async fn not_found_escalates_to_collection_failure() {
        let source = ScriptedSource::new(
            Err(UpstreamError::NotFound {
                zone: "SE-SE3".to_string(),
            }),
            Ok(breakdown(72.0)),
        );
        let collector = StandardCollector::new(source, ObserverConfig::default());

        match collector.carbon(&stockholm()).await {
            Err(CollectorError::Failure(failure)) => {
                assert_eq!(failure.region, "aws:eu-north-1");
                assert_eq!(failure.factor, Factor::Carbon);
                assert!(failure.cause.as_deref().unwrap_or_default().contains("SE-SE3"));
            }
            other => panic!("expected collection failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_forecast_escalates() {
        let mut empty = forecast(0.0);
        empty.forecast.clear();
        let source = ScriptedSource::new(Ok(empty), Ok(breakdown(72.0)));
        let collector = StandardCollector::new(source, ObserverConfig::default());
        assert!(matches!(
            collector.carbon(&stockholm()).await,
            Err(CollectorError::Failure(_))
        ));
    }

    #[tokio::test]
    async fn client_errors_degrade_to_zone_table() {
        let source = ScriptedSource::new(
            Err(UpstreamError::Api {
                status: 401,
                body: "invalid token".to_string(),
            }),
            Ok(breakdown(72.0)),
        );
        let collector = StandardCollector::new(source, ObserverConfig::default());

        let metrics = collector.carbon(&stockholm()).await.expect("fallback metrics");
        assert_eq!(metrics.data_source, FALLBACK_SOURCE_TAG);
        assert_eq!(metrics.carbon_intensity, zone_profile("SE-SE3").carbon_intensity);
        assert!(metrics.last_updated.is_some());
    }

    #[tokio::test]
    async fn failed_breakdown_keeps_intensity_but_marks_fallback() {
        let source = ScriptedSource::new(
            Ok(forecast(44.0)),
            Err(UpstreamError::Api {
                status: 403,
                body: "plan does not cover power breakdown".to_string(),
            }),
        );
        let collector = StandardCollector::new(source, ObserverConfig::default());

        let metrics = collector.carbon(&stockholm()).await.expect("partial metrics");
        assert_eq!(metrics.carbon_intensity, 44.0);
        assert_eq!(
            metrics.renewable_percentage,
            zone_profile("SE-SE3").renewable_percentage
        );
        assert_eq!(metrics.data_source, FALLBACK_SOURCE_TAG);
    }

    #[tokio::test]
    async fn escalating_breakdown_errors_fail_the_region() {
        for err in [
            UpstreamError::RateLimited,
            UpstreamError::Server { status: 503 },
            UpstreamError::Timeout,
        ] {
            let source = ScriptedSource::new(Ok(forecast(44.0)), Err(err.clone()));
            let collector = StandardCollector::new(source, ObserverConfig::default());
            match collector.carbon(&stockholm()).await {
                Err(CollectorError::Failure(failure)) => {
                    assert_eq!(failure.factor, Factor::Carbon);
                }
                other => panic!("{err:?}: expected collection failure, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn implausible_intensity_degrades_to_zone_table() {
        for intensity in [1150.0, -3.0, f64::NAN] {
            let source = ScriptedSource::new(Ok(forecast(intensity)), Ok(breakdown(72.0)));
            let collector = StandardCollector::new(source, ObserverConfig::default());

            let metrics = collector.carbon(&stockholm()).await.expect("fallback metrics");
            assert_eq!(metrics.data_source, FALLBACK_SOURCE_TAG);
            assert_eq!(metrics.carbon_intensity, zone_profile("SE-SE3").carbon_intensity);
        }
    }

    #[tokio::test]
    async fn implausible_renewable_share_keeps_live_intensity() {
        let source = ScriptedSource::new(Ok(forecast(44.0)), Ok(breakdown(140.0)));
        let collector = StandardCollector::new(source, ObserverConfig::default());

        let metrics = collector.carbon(&stockholm()).await.expect("partial metrics");
        assert_eq!(metrics.carbon_intensity, 44.0);
        assert_eq!(
            metrics.renewable_percentage,
            zone_profile("SE-SE3").renewable_percentage
        );
        assert_eq!(metrics.data_source, FALLBACK_SOURCE_TAG);
    }

    #[tokio::test]
    async fn latency_and_cost_are_always_estimated() {
        let collector = StandardCollector::new(Arc::new(ZoneTableSource), ObserverConfig::default());
        let region = stockholm();
        let latency = collector.latency(&region).await.expect("latency estimate");
        let cost = collector.cost(&region).await.expect("cost estimate");
        assert_eq!(latency.source_location, GEODESIC_SOURCE_TAG);
        assert_eq!(cost.region, "aws:eu-north-1");
        assert_eq!(collector.carbon_source_name(), MOCK_SOURCE_TAG);
    }
}
