//! Verdicts, their narrative and the green-alternative search.

mod narrative;
mod ranking;
mod suggestion;

pub use ranking::{sort_batch, ALTERNATIVE_CARBON_TOLERANCE, BATCH_TOLERANCE};
pub use suggestion::{find_green_alternative, MIN_ALTERNATIVE_LATENCY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::{CarbonScore, CostScore, LatencyScore};
use crate::collector::CollectionFailure;
use crate::domain::{Factor, Region};
use crate::scoring::CompositeScore;

/// Composite scores below this line are a Red Card.
pub const RED_CARD_BELOW: f64 = 40.0;
/// Composite scores above this line are Play On.
pub const PLAY_ON_ABOVE: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    RedCard,
    YellowCard,
    PlayOn,
    BlueCard,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Verdict::RedCard => "Red Card",
            Verdict::YellowCard => "Yellow Card",
            Verdict::PlayOn => "Play On",
            Verdict::BlueCard => "Blue Card",
        }
    }

    pub const fn all() -> [Verdict; 4] {
        [
            Verdict::PlayOn,
            Verdict::YellowCard,
            Verdict::RedCard,
            Verdict::BlueCard,
        ]
    }

    /// Verdict for a scored region. Blue Cards never come from a score.
    pub fn from_composite(composite: &CompositeScore) -> Self {
        if composite.override_triggered() || composite.overall_score < RED_CARD_BELOW {
            Verdict::RedCard
        } else if composite.overall_score <= PLAY_ON_ABOVE {
            Verdict::YellowCard
        } else {
            Verdict::PlayOn
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefereeConfidence {
    High,
    Medium,
    Low,
}

impl RefereeConfidence {
    pub fn from_average(average: f64) -> Self {
        if average >= 0.8 {
            RefereeConfidence::High
        } else if average >= 0.6 {
            RefereeConfidence::Medium
        } else {
            RefereeConfidence::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RefereeConfidence::High => "High",
            RefereeConfidence::Medium => "Medium",
            RefereeConfidence::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictScores {
    pub latency: LatencyScore,
    pub carbon: CarbonScore,
    pub cost: CostScore,
    pub composite: CompositeScore,
}

impl VerdictScores {
    pub fn score(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Latency => self.latency.score,
            Factor::Carbon => self.carbon.score,
            Factor::Cost => self.cost.score,
        }
    }

    pub fn average_confidence(&self) -> f64 {
        (self.latency.confidence + self.carbon.confidence + self.cost.confidence) / 3.0
    }

    fn unavailable() -> Self {
        Self {
            latency: LatencyScore::neutral(),
            carbon: CarbonScore::neutral(),
            cost: CostScore::neutral(),
            composite: CompositeScore::unavailable(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    AlternativeRegion,
    OptimizationStrategy,
    NoBetterOption,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreenSuggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_region: Option<Region>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_impact: Option<String>,
}

/// Final, self-contained result for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitratorVerdict {
    pub region: Region,
    pub verdict: Verdict,
    pub reason: String,
    pub suggestion: GreenSuggestion,
    pub scores: VerdictScores,
    pub timestamp: DateTime<Utc>,
    pub referee_confidence: RefereeConfidence,
}

impl ArbitratorVerdict {
    /// Re-runs the alternative search against a batch of peers. Blue Cards keep their
    /// retry advice.
    pub fn resuggest(&mut self, pool: &[ArbitratorVerdict]) {
        if self.verdict != Verdict::BlueCard {
            self.suggestion = suggestion::suggest(&self.region, self.verdict, &self.scores, pool);
        }
    }
}

/// Builds the verdict for a scored region, searching `pool` for a greener alternative.
pub fn judge(
    region: &Region,
    scores: VerdictScores,
    pool: &[ArbitratorVerdict],
    now: DateTime<Utc>,
) -> ArbitratorVerdict {
    let verdict = Verdict::from_composite(&scores.composite);
    let referee_confidence = RefereeConfidence::from_average(scores.average_confidence());
    let reason = narrative::scored_reason(verdict, &scores, referee_confidence);
    let suggestion = suggestion::suggest(region, verdict, &scores, pool);

    ArbitratorVerdict {
        region: region.clone(),
        verdict,
        reason,
        suggestion,
        scores,
        timestamp: now,
        referee_confidence,
    }
}

/// Verdict for a region whose data could not be collected. Scoring is bypassed.
pub fn blue_card(
    region: &Region,
    failure: &CollectionFailure,
    now: DateTime<Utc>,
) -> ArbitratorVerdict {
    ArbitratorVerdict {
        region: region.clone(),
        verdict: Verdict::BlueCard,
        reason: narrative::blue_card_reason(region, failure),
        suggestion: suggestion::blue_card_suggestion(failure),
        scores: VerdictScores::unavailable(),
        timestamp: now,
        referee_confidence: RefereeConfidence::Low,
    }
}
