//! Per-factor analyzers. Each one turns a raw metric bundle into a clamped 0-100 score with a
//! confidence value, a category and a reasoning sentence. Analyzers hold only their reference
//! tables and never keep state between calls.

mod carbon;
mod cost;
mod latency;

pub use carbon::{CarbonAnalyzer, CarbonCategory, CarbonScore};
pub(crate) use carbon::MAX_VALID_INTENSITY;
pub use cost::{cost_index_score, CostAnalyzer, CostBaselines, CostCategory, CostScore};
pub use latency::{BaselineLatency, LatencyAnalyzer, LatencyBaselines, LatencyCategory, LatencyScore};

/// Score given to every factor when no data could be collected.
pub const NEUTRAL_SCORE: f64 = 50.0;
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 1.0;

/// Linear map from `best` (100) to `worst` (0), clamped to the score range.
pub fn normalize(value: f64, best: f64, worst: f64) -> f64 {
    if !value.is_finite() || (worst - best).abs() < f64::EPSILON {
        return 0.0;
    }
    (100.0 * (worst - value) / (worst - best)).clamp(0.0, 100.0)
}

/// Raw metric values rejected before scoring.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricValidationError {
    #[error("carbon intensity {0} g/kWh is outside 0..=1000")]
    CarbonIntensityOutOfRange(f64),
    #[error("renewable share {0}% is outside 0..=100")]
    RenewableOutOfRange(f64),
    #[error("carbon data source is missing")]
    MissingSource,
    #[error("carbon data timestamp is missing")]
    MissingTimestamp,
    #[error("{dimension} cost {value} is negative or not a number")]
    InvalidCost { dimension: &'static str, value: f64 },
    #[error("{dimension} cost {value} exceeds the plausible ceiling of {ceiling}")]
    ImplausibleCost {
        dimension: &'static str,
        value: f64,
        ceiling: f64,
    },
    #[error("cost metrics are missing a region identifier")]
    MissingRegion,
}

/// Running confidence value. Penalties subtract, scalings multiply; the result is clamped
/// once at the end.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Confidence(f64);

impl Confidence {
    pub(crate) fn full() -> Self {
        Self(MAX_CONFIDENCE)
    }

    pub(crate) fn penalize(&mut self, amount: f64) {
        self.0 -= amount;
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        self.0 *= factor;
    }

    pub(crate) fn finish(self) -> f64 {
        self.0.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_carbon_range() {
        assert_eq!(normalize(0.0, 0.0, 500.0), 100.0);
        assert_eq!(normalize(500.0, 0.0, 500.0), 0.0);
        assert_eq!(normalize(250.0, 0.0, 500.0), 50.0);
    }

    #[test]
    fn normalize_latency_range() {
        assert_eq!(normalize(0.0, 0.0, 200.0), 100.0);
        assert_eq!(normalize(200.0, 0.0, 200.0), 0.0);
        assert_eq!(normalize(100.0, 0.0, 200.0), 50.0);
    }

    #[test]
    fn normalize_clamps_out_of_range_values() {
        assert_eq!(normalize(-40.0, 0.0, 200.0), 100.0);
        assert_eq!(normalize(900.0, 0.0, 200.0), 0.0);
        assert_eq!(normalize(f64::NAN, 0.0, 200.0), 0.0);
    }

    #[test]
    fn confidence_is_clamped_after_adjustments() {
        let mut confidence = Confidence::full();
        confidence.penalize(0.95);
        confidence.scale(0.3);
        assert_eq!(confidence.finish(), MIN_CONFIDENCE);

        let mut boosted = Confidence::full();
        boosted.scale(1.5);
        assert_eq!(boosted.finish(), MAX_CONFIDENCE);

        let mut untouched_floor = Confidence::full();
        untouched_floor.penalize(0.6);
        untouched_floor.scale(0.3);
        assert!((untouched_floor.finish() - 0.12).abs() < 1e-9);
    }
}
