use serde::{Deserialize, Serialize};

use crate::analysis::{CarbonScore, CostScore, LatencyScore};
use crate::domain::Factor;

/// Any factor scoring below this floor caps the composite score.
pub const RED_CARD_FLOOR: f64 = 30.0;
/// Highest composite score allowed once the Red-Card Rule fires.
pub const OVERRIDE_CEILING: f64 = 29.0;
pub const MAX_FACTOR_WEIGHT: f64 = 0.8;
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

/// Relative importance of each factor. A value of this type has always passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct FactorWeights {
    carbon: f64,
    latency: f64,
    cost: f64,
}

#[derive(Deserialize)]
struct RawWeights {
    carbon: f64,
    latency: f64,
    cost: f64,
}

impl TryFrom<RawWeights> for FactorWeights {
    type Error = WeightsError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        FactorWeights::new(raw.carbon, raw.latency, raw.cost)
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            carbon: 0.4,
            latency: 0.4,
            cost: 0.2,
        }
    }
}

impl FactorWeights {
    pub fn new(carbon: f64, latency: f64, cost: f64) -> Result<Self, WeightsError> {
        for (factor, value) in [
            (Factor::Carbon, carbon),
            (Factor::Latency, latency),
            (Factor::Cost, cost),
        ] {
            if !value.is_finite() {
                return Err(WeightsError::NotFinite { factor });
            }
            if value < 0.0 {
                return Err(WeightsError::Negative { factor, value });
            }
            if value > MAX_FACTOR_WEIGHT {
                return Err(WeightsError::AboveCap { factor, value });
            }
        }

        let sum = carbon + latency + cost;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightsError::Sum { sum });
        }

        Ok(Self {
            carbon,
            latency,
            cost,
        })
    }

    pub fn carbon(&self) -> f64 {
        self.carbon
    }

    pub fn latency(&self) -> f64 {
        self.latency
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn weight(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Carbon => self.carbon,
            Factor::Latency => self.latency,
            Factor::Cost => self.cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightsError {
    #[error("{factor} weight must be a finite number")]
    NotFinite { factor: Factor },
    #[error("{factor} weight {value} is negative")]
    Negative { factor: Factor, value: f64 },
    #[error("{factor} weight {value} exceeds the cap of {}", MAX_FACTOR_WEIGHT)]
    AboveCap { factor: Factor, value: f64 },
    #[error("weights sum to {sum:.3}, expected 1.0 +/- {}", WEIGHT_SUM_TOLERANCE)]
    Sum { sum: f64 },
}

/// Each factor's score multiplied by its weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedBreakdown {
    pub latency: f64,
    pub carbon: f64,
    pub cost: f64,
}

impl WeightedBreakdown {
    pub fn total(&self) -> f64 {
        self.latency + self.carbon + self.cost
    }

    pub fn points(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Latency => self.latency,
            Factor::Carbon => self.carbon,
            Factor::Cost => self.cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeScore {
    pub overall_score: f64,
    pub weighted_breakdown: WeightedBreakdown,
    /// Lowest of the three factor confidences.
    pub confidence: f64,
    /// Factors that fell below the Red-Card floor, in carbon/latency/cost order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overridden_by: Vec<Factor>,
}

impl CompositeScore {
    pub fn override_triggered(&self) -> bool {
        !self.overridden_by.is_empty()
    }

    /// Placeholder used when no fair assessment was possible.
    pub fn unavailable() -> Self {
        Self {
            overall_score: 0.0,
            weighted_breakdown: WeightedBreakdown {
                latency: 0.0,
                carbon: 0.0,
                cost: 0.0,
            },
            confidence: 0.1,
            overridden_by: Vec::new(),
        }
    }
}

/// Stateless combiner bound to one weight configuration.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    weights: FactorWeights,
}

impl ScoringEngine {
    pub fn new(weights: FactorWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &FactorWeights {
        &self.weights
    }

    pub fn combine(
        &self,
        latency: &LatencyScore,
        carbon: &CarbonScore,
        cost: &CostScore,
    ) -> CompositeScore {
        combine(latency, carbon, cost, &self.weights)
    }
}

pub fn combine(
    latency: &LatencyScore,
    carbon: &CarbonScore,
    cost: &CostScore,
    weights: &FactorWeights,
) -> CompositeScore {
    let weighted_breakdown = WeightedBreakdown {
        latency: latency.score * weights.latency(),
        carbon: carbon.score * weights.carbon(),
        cost: cost.score * weights.cost(),
    };
    let weighted = weighted_breakdown.total().clamp(0.0, 100.0);

    let overridden_by: Vec<Factor> = [
        (Factor::Carbon, carbon.score),
        (Factor::Latency, latency.score),
        (Factor::Cost, cost.score),
    ]
    .into_iter()
    .filter(|(_, score)| *score < RED_CARD_FLOOR)
    .map(|(factor, _)| factor)
    .collect();

    let overall_score = if overridden_by.is_empty() {
        weighted
    } else {
        weighted.min(OVERRIDE_CEILING)
    };

    let confidence = latency
        .confidence
        .min(carbon.confidence)
        .min(cost.confidence);

    CompositeScore {
        overall_score,
        weighted_breakdown,
        confidence,
        overridden_by,
    }
}
