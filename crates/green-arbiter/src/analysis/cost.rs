use serde::{Deserialize, Serialize};

use super::{Confidence, MetricValidationError, NEUTRAL_CONFIDENCE, NEUTRAL_SCORE};
use crate::domain::{is_mock_tag, CostMetrics};

const COMPUTE_WEIGHT: f64 = 0.5;
const STORAGE_WEIGHT: f64 = 0.3;
const NETWORK_WEIGHT: f64 = 0.2;

const MAX_COMPUTE_PER_HOUR: f64 = 100.0;
const MAX_STORAGE_PER_GB: f64 = 10.0;
const MAX_NETWORK_PER_GB: f64 = 10.0;

const DOMINANT_DRIVER_INDEX: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    VeryAffordable,
    Affordable,
    Moderate,
    Expensive,
}

impl CostCategory {
    pub fn from_index(index: f64) -> Self {
        if index <= 0.7 {
            Self::VeryAffordable
        } else if index <= 0.9 {
            Self::Affordable
        } else if index <= 1.2 {
            Self::Moderate
        } else {
            Self::Expensive
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryAffordable => "very affordable",
            Self::Affordable => "affordable",
            Self::Moderate => "moderate",
            Self::Expensive => "expensive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostScore {
    pub score: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub category: CostCategory,
    /// Weighted composite of the per-dimension price indices (1.0 = market baseline).
    pub relative_cost_index: f64,
}

impl CostScore {
    pub fn neutral() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            confidence: NEUTRAL_CONFIDENCE,
            reasoning: "Cost data was unavailable; a neutral placeholder score is shown."
                .to_string(),
            category: CostCategory::Moderate,
            relative_cost_index: 1.0,
        }
    }
}

/// Market-average prices every region is indexed against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBaselines {
    pub compute_per_hour: f64,
    pub storage_per_gb: f64,
    pub network_per_gb: f64,
}

impl Default for CostBaselines {
    fn default() -> Self {
        Self {
            compute_per_hour: 0.10,
            storage_per_gb: 0.023,
            network_per_gb: 0.09,
        }
    }
}

/// Logarithmic price curve: half the baseline scores 75, the baseline 50, double 25.
pub fn cost_index_score(index: f64) -> f64 {
    if index.is_nan() {
        return 0.0;
    }
    if index <= 0.0 {
        return 100.0;
    }
    (50.0 - 25.0 * index.log2()).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Default)]
pub struct CostAnalyzer {
    baselines: CostBaselines,
}

impl CostAnalyzer {
    pub fn new(baselines: CostBaselines) -> Self {
        Self { baselines }
    }

    pub fn analyze(&self, metrics: &CostMetrics) -> Result<CostScore, MetricValidationError> {
        if metrics.region.trim().is_empty() {
            return Err(MetricValidationError::MissingRegion);
        }

        let dimensions = [
            (
                "compute",
                metrics.compute_cost_per_hour,
                self.baselines.compute_per_hour,
                MAX_COMPUTE_PER_HOUR,
            ),
            (
                "storage",
                metrics.storage_cost_per_gb,
                self.baselines.storage_per_gb,
                MAX_STORAGE_PER_GB,
            ),
            (
                "network",
                metrics.network_cost_per_gb,
                self.baselines.network_per_gb,
                MAX_NETWORK_PER_GB,
            ),
        ];

        let mut indices = [0.0_f64; 3];
        for (slot, (dimension, value, baseline, ceiling)) in indices.iter_mut().zip(dimensions) {
            if !value.is_finite() || value < 0.0 {
                return Err(MetricValidationError::InvalidCost { dimension, value });
            }
            if value > ceiling {
                return Err(MetricValidationError::ImplausibleCost {
                    dimension,
                    value,
                    ceiling,
                });
            }
            *slot = value / baseline.max(f64::EPSILON);
        }

        let [compute, storage, network] = indices;
        let composite =
            compute * COMPUTE_WEIGHT + storage * STORAGE_WEIGHT + network * NETWORK_WEIGHT;
        let score = cost_index_score(composite);
        let category = CostCategory::from_index(composite);

        let mut confidence = Confidence::full();
        if !(0.1..=5.0).contains(&composite) {
            confidence.penalize(0.3);
        }
        let lowest = indices.iter().copied().fold(f64::INFINITY, f64::min);
        let highest = indices.iter().copied().fold(0.0, f64::max);
        if lowest == 0.0 {
            confidence.penalize(0.3);
        } else if highest / lowest > 3.0 {
            confidence.penalize(0.2);
        }
        if is_mock_tag(&metrics.region) {
            confidence.scale(0.5);
        }

        let mut reasoning = format!(
            "Compute runs at {compute:.2}x, storage at {storage:.2}x and network at {network:.2}x the market baseline, a composite index of {composite:.2}x ({}).",
            category.label()
        );
        let dominant = dimensions
            .iter()
            .zip(indices)
            .filter(|(_, index)| *index > DOMINANT_DRIVER_INDEX)
            .max_by(|(_, a), (_, b)| a.total_cmp(b));
        if let Some(((dimension, ..), index)) = dominant {
            reasoning.push_str(&format!(
                " {} pricing is the dominant cost driver at {index:.2}x baseline.",
                capitalize(dimension)
            ));
        }

        Ok(CostScore {
            score,
            confidence: confidence.finish(),
            reasoning,
            category,
            relative_cost_index: composite,
        })
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(compute: f64, storage: f64, network: f64) -> CostMetrics {
        CostMetrics {
            compute_cost_per_hour: compute,
            storage_cost_per_gb: storage,
            network_cost_per_gb: network,
            region: "aws:eu-north-1".to_string(),
        }
    }

    #[test]
    fn curve_anchors() {
        assert!((cost_index_score(1.0) - 50.0).abs() < 1e-9);
        assert!((cost_index_score(0.5) - 75.0).abs() < 1e-9);
        assert!((cost_index_score(2.0) - 25.0).abs() < 1e-9);
        assert_eq!(cost_index_score(4.0), 0.0);
        assert_eq!(cost_index_score(8.0), 0.0);
        assert_eq!(cost_index_score(0.05), 100.0);
        assert_eq!(cost_index_score(0.0), 100.0);
    }

    #[test]
    fn baseline_prices_score_fifty() {
        let score = CostAnalyzer::default()
            .analyze(&metrics(0.10, 0.023, 0.09))
            .expect("valid");
        assert!((score.relative_cost_index - 1.0).abs() < 1e-9);
        assert!((score.score - 50.0).abs() < 1e-9);
        assert_eq!(score.category, CostCategory::Moderate);
        assert_eq!(score.confidence, 1.0);
        assert!(score.reasoning.contains("1.00x"));
        assert!(!score.reasoning.contains("dominant"));
    }

    #[test]
    fn composite_uses_fifty_thirty_twenty_weights() {
        let score = CostAnalyzer::default()
            .analyze(&metrics(0.05, 0.023, 0.18))
            .expect("valid");
        assert!((score.relative_cost_index - (0.25 + 0.3 + 0.4)).abs() < 1e-9);
        assert_eq!(score.category, CostCategory::Moderate);
        assert!(score.reasoning.contains("Network pricing is the dominant cost driver"));
    }

    #[test]
    fn categories_follow_index_thresholds() {
        assert_eq!(CostCategory::from_index(0.7), CostCategory::VeryAffordable);
        assert_eq!(CostCategory::from_index(0.9), CostCategory::Affordable);
        assert_eq!(CostCategory::from_index(1.2), CostCategory::Moderate);
        assert_eq!(CostCategory::from_index(1.21), CostCategory::Expensive);
    }

    #[test]
    fn suspicious_inputs_reduce_confidence() {
        let analyzer = CostAnalyzer::default();
        let spread = analyzer.analyze(&metrics(0.40, 0.023, 0.09)).expect("valid");
        assert!((spread.confidence - 0.8).abs() < 1e-9);

        let zero = analyzer.analyze(&metrics(0.10, 0.0, 0.09)).expect("valid");
        assert!((zero.confidence - 0.7).abs() < 1e-9);

        let extreme = analyzer.analyze(&metrics(0.60, 0.15, 0.6)).expect("valid");
        assert!(extreme.relative_cost_index > 5.0);
        assert!((extreme.confidence - 0.7).abs() < 1e-9);

        let mut mock = metrics(0.10, 0.023, 0.09);
        mock.region = "mock-region".to_string();
        let mock = analyzer.analyze(&mock).expect("valid");
        assert!((mock.confidence - 0.5).abs() < 1e-9);

        let mut contest = metrics(0.10, 0.023, 0.09);
        contest.region = "aws:contest-1".to_string();
        let contest = analyzer.analyze(&contest).expect("valid");
        assert_eq!(contest.confidence, 1.0);
    }

    #[test]
    fn validation_rejects_negative_implausible_and_unnamed() {
        let analyzer = CostAnalyzer::default();
        assert!(matches!(
            analyzer.analyze(&metrics(-0.1, 0.023, 0.09)),
            Err(MetricValidationError::InvalidCost {
                dimension: "compute",
                ..
            })
        ));
        assert!(matches!(
            analyzer.analyze(&metrics(0.1, 12.0, 0.09)),
            Err(MetricValidationError::ImplausibleCost {
                dimension: "storage",
                ..
            })
        ));
        let mut unnamed = metrics(0.1, 0.023, 0.09);
        unnamed.region = " ".to_string();
        assert_eq!(
            analyzer.analyze(&unnamed),
            Err(MetricValidationError::MissingRegion)
        );
    }
}
