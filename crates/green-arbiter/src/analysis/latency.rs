use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize, Confidence, NEUTRAL_CONFIDENCE, NEUTRAL_SCORE};
use crate::domain::{is_synthetic_tag, LatencyMetrics, Region};

const BEST_LATENCY_MS: f64 = 0.0;
const WORST_LATENCY_MS: f64 = 200.0;
const UNLISTED_BASELINE_MS: f64 = 150.0;
const MAX_PLAUSIBLE_MS: f64 = 1000.0;
const VARIANCE_LIMIT: f64 = 0.5;
const P95_RATIO_LIMIT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyCategory {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl LatencyCategory {
    pub fn from_baseline(latency_ms: f64) -> Self {
        if latency_ms <= 50.0 {
            Self::Excellent
        } else if latency_ms <= 100.0 {
            Self::Good
        } else if latency_ms <= 150.0 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Acceptable => "acceptable",
            Self::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyScore {
    pub score: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub category: LatencyCategory,
}

impl LatencyScore {
    pub fn neutral() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            confidence: NEUTRAL_CONFIDENCE,
            reasoning: "Latency data was unavailable; a neutral placeholder score is shown."
                .to_string(),
            category: LatencyCategory::Acceptable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaselineLatency {
    pub latency_ms: f64,
    pub description: String,
}

/// Reference round-trip latencies keyed by `provider:code`. The baseline, not the live
/// measurement, is what gets scored, so verdicts do not depend on where the evaluation runs.
#[derive(Debug, Clone, Default)]
pub struct LatencyBaselines {
    entries: HashMap<String, BaselineLatency>,
}

const STANDARD_BASELINES: &[(&str, f64, &str)] = &[
    ("aws:us-east-1", 35.0, "AWS US East (N. Virginia)"),
    ("aws:us-east-2", 45.0, "AWS US East (Ohio)"),
    ("aws:us-west-2", 70.0, "AWS US West (Oregon)"),
    ("aws:ca-central-1", 48.0, "AWS Canada (Central)"),
    ("aws:eu-west-1", 85.0, "AWS Europe (Ireland)"),
    ("aws:eu-west-3", 92.0, "AWS Europe (Paris)"),
    ("aws:eu-central-1", 98.0, "AWS Europe (Frankfurt)"),
    ("aws:eu-north-1", 110.0, "AWS Europe (Stockholm)"),
    ("aws:ap-south-1", 190.0, "AWS Asia Pacific (Mumbai)"),
    ("aws:ap-northeast-1", 155.0, "AWS Asia Pacific (Tokyo)"),
    ("aws:ap-southeast-2", 205.0, "AWS Asia Pacific (Sydney)"),
    ("aws:sa-east-1", 130.0, "AWS South America (Sao Paulo)"),
    ("gcp:us-central1", 42.0, "GCP Iowa"),
    ("gcp:europe-west1", 90.0, "GCP Belgium"),
    ("gcp:europe-north1", 118.0, "GCP Finland"),
    ("gcp:asia-east1", 175.0, "GCP Taiwan"),
    ("azure:eastus", 36.0, "Azure East US"),
    ("azure:westeurope", 88.0, "Azure West Europe"),
    ("azure:northeurope", 86.0, "Azure North Europe"),
    ("azure:swedencentral", 112.0, "Azure Sweden Central"),
    ("azure:australiaeast", 208.0, "Azure Australia East"),
];

impl LatencyBaselines {
    pub fn standard() -> Self {
        STANDARD_BASELINES
            .iter()
            .fold(Self::default(), |table, (key, latency_ms, description)| {
                table.with_entry(*key, *latency_ms, *description)
            })
    }

    pub fn with_entry(
        mut self,
        key: impl Into<String>,
        latency_ms: f64,
        description: impl Into<String>,
    ) -> Self {
        self.entries.insert(
            key.into(),
            BaselineLatency {
                latency_ms,
                description: description.into(),
            },
        );
        self
    }

    pub fn lookup(&self, region: &Region) -> Option<&BaselineLatency> {
        self.entries.get(&region.key())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct LatencyAnalyzer {
    baselines: LatencyBaselines,
}

impl LatencyAnalyzer {
    pub fn new(baselines: LatencyBaselines) -> Self {
        Self { baselines }
    }

    pub fn analyze(
        &self,
        region: &Region,
        metrics: &LatencyMetrics,
        now: DateTime<Utc>,
    ) -> LatencyScore {
        let (baseline, description, listed) = match self.baselines.lookup(region) {
            Some(entry) => (entry.latency_ms, entry.description.clone(), true),
            None => (
                UNLISTED_BASELINE_MS,
                format!("{} (unlisted region, default baseline)", region.display_name),
                false,
            ),
        };

        let score = normalize(baseline, BEST_LATENCY_MS, WORST_LATENCY_MS);
        let category = LatencyCategory::from_baseline(baseline);
        let mut confidence = Confidence::full();

        if !listed {
            confidence.penalize(0.2);
        }

        let age = now - metrics.measurement_timestamp;
        if age > Duration::hours(1) {
            confidence.penalize(0.2);
        } else if age > Duration::minutes(5) {
            confidence.penalize(0.1);
        }

        let measured = metrics.average_latency_ms;
        let plausible = measured.is_finite() && measured > 0.0 && measured <= MAX_PLAUSIBLE_MS;
        let mut variance = None;
        if plausible {
            let relative = (measured - baseline).abs() / baseline.max(1.0);
            if relative > VARIANCE_LIMIT {
                confidence.penalize(0.2);
                variance = Some(relative);
            }

            let p95 = metrics.p95_latency_ms;
            if !p95.is_finite() || p95 < measured || p95 / measured > P95_RATIO_LIMIT {
                confidence.penalize(0.15);
            }
        } else {
            confidence.penalize(0.3);
        }

        if is_synthetic_tag(&metrics.source_location) {
            confidence.penalize(0.2);
        }

        let mut reasoning = format!(
            "Baseline latency to {description} is {baseline:.0} ms, which is {}.",
            category.label()
        );
        if let Some(relative) = variance {
            reasoning.push_str(&format!(
                " The real measurement of {measured:.0} ms diverges from the baseline by {:.0}%, which reduced confidence.",
                relative * 100.0
            ));
        }
        if !plausible {
            reasoning.push_str(&format!(
                " The measured value of {measured} ms is not physically plausible and was disregarded."
            ));
        }

        LatencyScore {
            score,
            confidence: confidence.finish(),
            reasoning,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CloudProvider, Location};

    fn region(code: &str) -> Region {
        Region {
            provider: CloudProvider::Aws,
            region_code: code.to_string(),
            display_name: format!("Region {code}"),
            location: Location {
                country: "US".to_string(),
                city: None,
                latitude: 39.0,
                longitude: -77.0,
            },
        }
    }

    fn metrics(avg: f64, p95: f64, at: DateTime<Utc>, source: &str) -> LatencyMetrics {
        LatencyMetrics {
            average_latency_ms: avg,
            p95_latency_ms: p95,
            measurement_timestamp: at,
            source_location: source.to_string(),
        }
    }

    fn analyzer() -> LatencyAnalyzer {
        LatencyAnalyzer::new(
            LatencyBaselines::default()
                .with_entry("aws:fast-1", 40.0, "Fast test region")
                .with_entry("aws:mid-1", 100.0, "Mid test region")
                .with_entry("aws:far-1", 180.0, "Far test region"),
        )
    }

    #[test]
    fn scores_baseline_not_measurement() {
        let now = Utc::now();
        let analyzer = analyzer();
        let near = analyzer.analyze(&region("mid-1"), &metrics(95.0, 120.0, now, "probe:nyc"), now);
        let skewed =
            analyzer.analyze(&region("mid-1"), &metrics(240.0, 300.0, now, "probe:nyc"), now);

        assert_eq!(near.score, 50.0);
        assert_eq!(skewed.score, 50.0);
        assert_eq!(near.category, LatencyCategory::Good);
        assert_eq!(near.confidence, 1.0);
        assert!(skewed.confidence < near.confidence);
        assert!(skewed.reasoning.contains("diverges from the baseline"));
        assert!(skewed.reasoning.contains("reduced confidence"));
        assert!(near.reasoning.contains("Mid test region"));
        assert!(!near.reasoning.contains("diverges"));
    }

    #[test]
    fn categories_follow_baseline_thresholds() {
        assert_eq!(LatencyCategory::from_baseline(50.0), LatencyCategory::Excellent);
        assert_eq!(LatencyCategory::from_baseline(50.5), LatencyCategory::Good);
        assert_eq!(LatencyCategory::from_baseline(150.0), LatencyCategory::Acceptable);
        assert_eq!(LatencyCategory::from_baseline(151.0), LatencyCategory::Poor);
    }

    #[test]
    fn stale_synthetic_and_inconsistent_measurements_lose_confidence() {
        let now = Utc::now();
        let analyzer = analyzer();
        let fresh = analyzer.analyze(&region("fast-1"), &metrics(42.0, 50.0, now, "probe"), now);
        let stale = analyzer.analyze(
            &region("fast-1"),
            &metrics(42.0, 50.0, now - Duration::hours(3), "probe"),
            now,
        );
        let synthetic = analyzer.analyze(
            &region("fast-1"),
            &metrics(42.0, 50.0, now, "synthetic:geodesic-estimate"),
            now,
        );
        let spiky = analyzer.analyze(&region("fast-1"), &metrics(42.0, 130.0, now, "probe"), now);

        assert!((fresh.confidence - 1.0).abs() < 1e-9);
        assert!((stale.confidence - 0.8).abs() < 1e-9);
        assert!((synthetic.confidence - 0.8).abs() < 1e-9);
        assert!((spiky.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn implausible_measurement_is_flagged() {
        let now = Utc::now();
        let score =
            analyzer().analyze(&region("far-1"), &metrics(-5.0, 10.0, now, "probe"), now);
        assert!((score.confidence - 0.7).abs() < 1e-9);
        assert!(score.reasoning.contains("not physically plausible"));
        assert_eq!(score.category, LatencyCategory::Poor);
        assert!((score.score - 10.0).abs() < 1e-9);
    }

    #[test]
    fn unlisted_region_uses_default_baseline() {
        let now = Utc::now();
        let score =
            analyzer().analyze(&region("unknown-9"), &metrics(150.0, 160.0, now, "probe"), now);
        assert_eq!(score.score, 25.0);
        assert_eq!(score.category, LatencyCategory::Acceptable);
        assert!((score.confidence - 0.8).abs() < 1e-9);
        assert!(score.reasoning.contains("unlisted region"));
    }

    #[test]
    fn standard_table_covers_catalog() {
        let baselines = LatencyBaselines::standard();
        for region in crate::catalog::default_regions() {
            assert!(
                baselines.lookup(&region).is_some(),
                "missing baseline for {}",
                region.key()
            );
        }
    }
}
