use crate::collector::CollectionFailure;
use crate::domain::{Factor, Region};
use crate::scoring::{CompositeScore, OVERRIDE_CEILING, RED_CARD_FLOOR};

use super::{RefereeConfidence, Verdict, VerdictScores};

const CONCERN_BELOW: f64 = 50.0;
const STRENGTH_FROM: f64 = 70.0;
const OUTSTANDING_FROM: f64 = 80.0;
const STRONG_FROM: f64 = 60.0;

fn factor_scores(scores: &VerdictScores) -> [(Factor, f64); 3] {
    Factor::ordered().map(|factor| (factor, scores.score(factor)))
}

/// Why a catastrophic factor cannot be traded off, phrased in that factor's terms.
fn red_line(factor: Factor, score: f64) -> String {
    match factor {
        Factor::Carbon => format!(
            "carbon scored {score:.0}: the grid is too carbon-intensive to justify, an ethical line no saving elsewhere can cross"
        ),
        Factor::Latency => format!(
            "latency scored {score:.0}: users would feel the delay on every request, a performance failure no saving elsewhere can offset"
        ),
        Factor::Cost => format!(
            "cost scored {score:.0}: the price premium is a financial burden that a clean grid or fast network cannot pay down"
        ),
    }
}

fn list_factors(entries: &[(Factor, f64)]) -> String {
    entries
        .iter()
        .map(|(factor, score)| format!("{factor} ({score:.0})"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn headline(verdict: Verdict, scores: &VerdictScores) -> String {
    let composite = &scores.composite;
    let factors = factor_scores(scores);

    match verdict {
        Verdict::RedCard if composite.override_triggered() => {
            let lines = composite
                .overridden_by
                .iter()
                .map(|factor| red_line(*factor, scores.score(*factor)))
                .collect::<Vec<_>>()
                .join("; ");
            format!(
                "Red Card. The Red-Card Rule fired because a factor fell below {RED_CARD_FLOOR:.0}: {lines}."
            )
        }
        Verdict::RedCard => {
            let mut weakest = factors
                .iter()
                .copied()
                .filter(|(_, score)| *score < CONCERN_BELOW)
                .collect::<Vec<_>>();
            if weakest.is_empty() {
                if let Some(lowest) = factors.iter().copied().min_by(|a, b| a.1.total_cmp(&b.1)) {
                    weakest.push(lowest);
                }
            }
            weakest.sort_by(|a, b| a.1.total_cmp(&b.1));
            format!(
                "Red Card. The composite score of {:.1} is below the playable line; weakest factors: {}.",
                composite.overall_score,
                list_factors(&weakest)
            )
        }
        Verdict::YellowCard => {
            let concerns = factors
                .iter()
                .copied()
                .filter(|(_, score)| *score < CONCERN_BELOW)
                .collect::<Vec<_>>();
            let strengths = factors
                .iter()
                .copied()
                .filter(|(_, score)| *score >= STRENGTH_FROM)
                .collect::<Vec<_>>();

            let mut text = format!(
                "Yellow Card. The composite score of {:.1} is playable with reservations.",
                composite.overall_score
            );
            if !concerns.is_empty() {
                text.push_str(&format!(" Concerns: {}.", list_factors(&concerns)));
            }
            if !strengths.is_empty() {
                text.push_str(&format!(" Strengths: {}.", list_factors(&strengths)));
            }
            if concerns.is_empty() && strengths.is_empty() {
                text.push_str(" No single factor stands out either way.");
            }
            text
        }
        Verdict::PlayOn => {
            let outstanding = factors
                .iter()
                .copied()
                .filter(|(_, score)| *score >= OUTSTANDING_FROM)
                .collect::<Vec<_>>();
            let strong = factors
                .iter()
                .copied()
                .filter(|(_, score)| (STRONG_FROM..OUTSTANDING_FROM).contains(score))
                .collect::<Vec<_>>();

            let mut text = format!(
                "Play On. The composite score of {:.1} clears every bar.",
                composite.overall_score
            );
            if !outstanding.is_empty() {
                text.push_str(&format!(" Outstanding: {}.", list_factors(&outstanding)));
            }
            if !strong.is_empty() {
                text.push_str(&format!(" Strong: {}.", list_factors(&strong)));
            }
            text
        }
        Verdict::BlueCard => "Blue Card. No fair assessment was possible.".to_string(),
    }
}

fn breakdown_line(composite: &CompositeScore) -> String {
    let points = &composite.weighted_breakdown;
    let mut line = format!(
        "Weighted breakdown: carbon {:.1} pts + latency {:.1} pts + cost {:.1} pts = {:.1}",
        points.carbon,
        points.latency,
        points.cost,
        points.total()
    );
    if composite.override_triggered() && points.total() > composite.overall_score {
        line.push_str(&format!(
            ", capped at {OVERRIDE_CEILING:.0} by the Red-Card Rule"
        ));
    }
    line.push('.');
    line
}

fn confidence_line(referee: RefereeConfidence, average: f64) -> String {
    format!(
        "Referee Confidence: {} (average factor confidence {average:.2}).",
        referee.label()
    )
}

pub(crate) fn scored_reason(
    verdict: Verdict,
    scores: &VerdictScores,
    referee: RefereeConfidence,
) -> String {
    [
        headline(verdict, scores),
        breakdown_line(&scores.composite),
        confidence_line(referee, scores.average_confidence()),
    ]
    .join("\n")
}

pub(crate) fn blue_card_reason(region: &Region, failure: &CollectionFailure) -> String {
    let cause = failure
        .cause
        .as_deref()
        .unwrap_or("the data source gave no reason");
    [
        format!(
            "Blue Card. {} data for {} could not be collected ({cause}), so no fair assessment is possible and no score is given.",
            failure.factor,
            region.display_name
        ),
        format!("Referee Confidence: {}.", RefereeConfidence::Low.label()),
    ]
    .join("\n")
}
