use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    normalize, Confidence, MetricValidationError, NEUTRAL_CONFIDENCE, NEUTRAL_SCORE,
};
use crate::domain::{is_mock_tag, CarbonMetrics};

const CLEANEST_G_PER_KWH: f64 = 0.0;
const DIRTIEST_G_PER_KWH: f64 = 500.0;
pub(crate) const MAX_VALID_INTENSITY: f64 = 1000.0;

const DEFAULT_TRUSTED_SOURCES: &[&str] = &[
    "electricitymaps",
    "watttime",
    "carbon-aware-sdk",
    "national-grid-eso",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarbonCategory {
    VeryClean,
    Clean,
    Moderate,
    HighCarbon,
}

impl CarbonCategory {
    /// Joint classification over the intensity band and the renewable band.
    pub fn classify(intensity: f64, renewable: f64) -> Self {
        if intensity <= 50.0 || (intensity <= 100.0 && renewable >= 70.0) {
            Self::VeryClean
        } else if intensity <= 150.0 || (intensity <= 200.0 && renewable >= 40.0) {
            Self::Clean
        } else if intensity <= 400.0 {
            Self::Moderate
        } else {
            Self::HighCarbon
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryClean => "very clean",
            Self::Clean => "clean",
            Self::Moderate => "moderate",
            Self::HighCarbon => "high carbon",
        }
    }

    const fn framing(self) -> &'static str {
        match self {
            Self::VeryClean => {
                "Running here is an exemplary choice for climate-conscious workloads."
            }
            Self::Clean => "This grid keeps the climate cost of workloads modest.",
            Self::Moderate => {
                "Workloads here carry a noticeable climate cost; flexible jobs are better scheduled when the grid is cleaner."
            }
            Self::HighCarbon => {
                "Every compute hour here burns fossil-heavy power, a climate cost that is hard to justify while cleaner grids exist."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonScore {
    pub score: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub category: CarbonCategory,
    pub renewable_percentage: f64,
}

impl CarbonScore {
    pub fn neutral() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            confidence: NEUTRAL_CONFIDENCE,
            reasoning: "Carbon data was unavailable; a neutral placeholder score is shown."
                .to_string(),
            category: CarbonCategory::Moderate,
            renewable_percentage: 0.0,
        }
    }
}

/// Scores grid carbon intensity, adjusted by renewable share.
#[derive(Debug, Clone)]
pub struct CarbonAnalyzer {
    trusted_sources: Vec<String>,
}

impl Default for CarbonAnalyzer {
    fn default() -> Self {
        Self {
            trusted_sources: DEFAULT_TRUSTED_SOURCES
                .iter()
                .map(|source| source.to_string())
                .collect(),
        }
    }
}

impl CarbonAnalyzer {
    pub fn with_trusted_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trusted_sources: sources
                .into_iter()
                .map(|source| source.into().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_trusted(&self, source: &str) -> bool {
        let source = source.trim().to_ascii_lowercase();
        self.trusted_sources.iter().any(|trusted| *trusted == source)
    }

    pub fn analyze(
        &self,
        metrics: &CarbonMetrics,
        now: DateTime<Utc>,
    ) -> Result<CarbonScore, MetricValidationError> {
        let intensity = metrics.carbon_intensity;
        let renewable = metrics.renewable_percentage;

        if !(0.0..=MAX_VALID_INTENSITY).contains(&intensity) {
            return Err(MetricValidationError::CarbonIntensityOutOfRange(intensity));
        }
        if !(0.0..=100.0).contains(&renewable) {
            return Err(MetricValidationError::RenewableOutOfRange(renewable));
        }
        if metrics.data_source.trim().is_empty() {
            return Err(MetricValidationError::MissingSource);
        }
        let last_updated = metrics
            .last_updated
            .ok_or(MetricValidationError::MissingTimestamp)?;

        let base = normalize(intensity, CLEANEST_G_PER_KWH, DIRTIEST_G_PER_KWH);
        let score = (base + renewable_adjustment(renewable)).clamp(0.0, 100.0);
        let category = CarbonCategory::classify(intensity, renewable);

        let mut confidence = Confidence::full();
        let suspicious = (intensity == 0.0 && renewable < 95.0)
            || (intensity > 600.0 && renewable > 70.0);
        if suspicious {
            confidence.penalize(0.3);
        }

        let age = now - last_updated;
        if age > Duration::hours(24) {
            confidence.penalize(0.4);
        } else if age > Duration::hours(2) {
            confidence.penalize(0.2);
        } else if age > Duration::hours(1) {
            confidence.penalize(0.1);
        }

        if !self.is_trusted(&metrics.data_source) {
            confidence.scale(0.8);
        }
        if is_mock_tag(&metrics.data_source) {
            confidence.scale(0.3);
        }
        let confidence = confidence.finish();

        let mut reasoning = format!(
            "Grid carbon intensity is {intensity:.0} gCO2/kWh with {renewable:.0}% renewable generation, rated {}. {}",
            category.label(),
            category.framing()
        );
        if suspicious {
            reasoning.push_str(" The reported generation mix looks internally inconsistent.");
        }
        if confidence >= 0.8 {
            reasoning.push_str(&format!(
                " Data confidence is high (source: {}).",
                metrics.data_source
            ));
        } else if confidence < 0.5 {
            reasoning.push_str(&format!(
                " Data confidence is low (source: {}); treat this assessment with caution.",
                metrics.data_source
            ));
        }

        Ok(CarbonScore {
            score,
            confidence,
            reasoning,
            category,
            renewable_percentage: renewable,
        })
    }
}

/// Bonus or penalty applied on top of the intensity curve, linear within each band.
fn renewable_adjustment(renewable: f64) -> f64 {
    if renewable >= 80.0 {
        10.0 + 5.0 * (renewable - 80.0) / 20.0
    } else if renewable >= 50.0 {
        3.0 + 4.0 * (renewable - 50.0) / 30.0
    } else if renewable >= 20.0 {
        -2.0 * (50.0 - renewable) / 30.0
    } else {
        -(2.0 + 8.0 * (20.0 - renewable) / 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(intensity: f64, renewable: f64, source: &str, age: Duration) -> CarbonMetrics {
        CarbonMetrics {
            carbon_intensity: intensity,
            renewable_percentage: renewable,
            data_source: source.to_string(),
            last_updated: Some(Utc::now() - age),
            zone: "SE-SE3".to_string(),
        }
    }

    #[test]
    fn clean_grid_with_high_renewables_scores_very_clean() {
        let score = CarbonAnalyzer::default()
            .analyze(
                &metrics(50.0, 90.0, "electricitymaps", Duration::zero()),
                Utc::now(),
            )
            .expect("valid metrics");

        assert!(score.score > 90.0);
        assert!(score.score <= 100.0);
        assert_eq!(score.category, CarbonCategory::VeryClean);
        assert_eq!(score.renewable_percentage, 90.0);
        assert!(score.reasoning.contains("50 gCO2/kWh"));
        assert!(score.reasoning.contains("90% renewable"));
        assert!(score.reasoning.contains("confidence is high"));
    }

    #[test]
    fn renewable_adjustment_bands() {
        assert!((renewable_adjustment(100.0) - 15.0).abs() < 1e-9);
        assert!((renewable_adjustment(80.0) - 10.0).abs() < 1e-9);
        assert!((renewable_adjustment(50.0) - 3.0).abs() < 1e-9);
        assert!(renewable_adjustment(20.0) <= 0.0);
        assert!((renewable_adjustment(0.0) + 10.0).abs() < 1e-9);
    }

    #[test]
    fn dirty_grid_is_high_carbon() {
        let score = CarbonAnalyzer::default()
            .analyze(
                &metrics(650.0, 10.0, "electricitymaps", Duration::zero()),
                Utc::now(),
            )
            .expect("valid metrics");
        assert_eq!(score.score, 0.0);
        assert_eq!(score.category, CarbonCategory::HighCarbon);
        assert!(score.reasoning.contains("hard to justify"));
    }

    #[test]
    fn data_older_than_two_hours_loses_confidence() {
        let analyzer = CarbonAnalyzer::default();
        let now = Utc::now();
        let fresh = analyzer
            .analyze(&metrics(200.0, 40.0, "electricitymaps", Duration::zero()), now)
            .expect("fresh");
        let stale = analyzer
            .analyze(
                &metrics(200.0, 40.0, "electricitymaps", Duration::minutes(150)),
                now,
            )
            .expect("stale");

        assert!(fresh.confidence - stale.confidence >= 0.19);
        assert_eq!(fresh.score, stale.score);
    }

    #[test]
    fn mock_and_untrusted_sources_are_penalized() {
        let analyzer = CarbonAnalyzer::default();
        let now = Utc::now();
        let untrusted = analyzer
            .analyze(&metrics(120.0, 60.0, "fallback:zone-table", Duration::zero()), now)
            .expect("untrusted");
        let mock = analyzer
            .analyze(&metrics(120.0, 60.0, "mock:zone-table", Duration::zero()), now)
            .expect("mock");

        assert!((untrusted.confidence - 0.8).abs() < 1e-9);
        assert!((mock.confidence - 0.24).abs() < 1e-9);
        assert!(mock.reasoning.contains("confidence is low"));
    }

    #[test]
    fn inconsistent_mix_is_suspicious() {
        let analyzer = CarbonAnalyzer::default();
        let now = Utc::now();
        let zero_without_renewables = analyzer
            .analyze(&metrics(0.0, 40.0, "electricitymaps", Duration::zero()), now)
            .expect("valid");
        let dirty_but_green = analyzer
            .analyze(&metrics(700.0, 85.0, "electricitymaps", Duration::zero()), now)
            .expect("valid");

        assert!((zero_without_renewables.confidence - 0.7).abs() < 1e-9);
        assert!((dirty_but_green.confidence - 0.7).abs() < 1e-9);
        assert!(dirty_but_green.reasoning.contains("inconsistent"));
    }

    #[test]
    fn validation_rejects_bad_inputs() {
        let analyzer = CarbonAnalyzer::default();
        let now = Utc::now();
        assert_eq!(
            analyzer.analyze(&metrics(1200.0, 10.0, "electricitymaps", Duration::zero()), now),
            Err(MetricValidationError::CarbonIntensityOutOfRange(1200.0))
        );
        assert_eq!(
            analyzer.analyze(&metrics(100.0, 120.0, "electricitymaps", Duration::zero()), now),
            Err(MetricValidationError::RenewableOutOfRange(120.0))
        );
        assert_eq!(
            analyzer.analyze(&metrics(100.0, 20.0, "  ", Duration::zero()), now),
            Err(MetricValidationError::MissingSource)
        );

        let mut missing_timestamp = metrics(100.0, 20.0, "electricitymaps", Duration::zero());
        missing_timestamp.last_updated = None;
        assert_eq!(
            analyzer.analyze(&missing_timestamp, now),
            Err(MetricValidationError::MissingTimestamp)
        );
    }

    #[test]
    fn custom_allow_list_is_case_insensitive() {
        let analyzer = CarbonAnalyzer::with_trusted_sources(["GridWatch"]);
        assert!(analyzer.is_trusted("gridwatch"));
        assert!(!analyzer.is_trusted("electricitymaps"));
    }
}
