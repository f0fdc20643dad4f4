use crate::collector::CollectionFailure;
use crate::domain::{Factor, Region};

use super::ranking::{alternative_precedes, insertion_sort_by};
use super::{ArbitratorVerdict, GreenSuggestion, SuggestionKind, Verdict, VerdictScores};

/// Alternatives must stay at least this usable on latency.
pub const MIN_ALTERNATIVE_LATENCY: f64 = 50.0;

/// Best greener region in `pool`: strictly higher carbon score, latency score of at least
/// [`MIN_ALTERNATIVE_LATENCY`], never the region itself and never a Blue Card.
pub fn find_green_alternative<'a>(
    region: &Region,
    scores: &VerdictScores,
    pool: &'a [ArbitratorVerdict],
) -> Option<&'a ArbitratorVerdict> {
    let key = region.key();
    let mut candidates = pool
        .iter()
        .filter(|candidate| candidate.verdict != Verdict::BlueCard)
        .filter(|candidate| candidate.region.key() != key)
        .filter(|candidate| candidate.scores.carbon.score > scores.carbon.score)
        .filter(|candidate| candidate.scores.latency.score >= MIN_ALTERNATIVE_LATENCY)
        .collect::<Vec<_>>();

    insertion_sort_by(&mut candidates, |a, b| alternative_precedes(a, b));
    candidates.into_iter().next()
}

pub(crate) fn suggest(
    region: &Region,
    verdict: Verdict,
    scores: &VerdictScores,
    pool: &[ArbitratorVerdict],
) -> GreenSuggestion {
    match find_green_alternative(region, scores, pool) {
        Some(alternative) => alternative_suggestion(scores, alternative),
        None if verdict == Verdict::PlayOn => GreenSuggestion {
            kind: SuggestionKind::NoBetterOption,
            description: format!(
                "No greener region with acceptable latency was found; {} is already a strong pick.",
                region.display_name
            ),
            alternative_region: None,
            expected_impact: None,
        },
        None => optimization_strategy(scores),
    }
}

fn alternative_suggestion(
    scores: &VerdictScores,
    alternative: &ArbitratorVerdict,
) -> GreenSuggestion {
    let carbon_gain = alternative.scores.carbon.score - scores.carbon.score;
    let latency_delta = alternative.scores.latency.score - scores.latency.score;

    GreenSuggestion {
        kind: SuggestionKind::AlternativeRegion,
        description: format!(
            "Move to {} ({}), whose grid is rated {} with {:.0}% renewable generation.",
            alternative.region.display_name,
            alternative.region.key(),
            alternative.scores.carbon.category.label(),
            alternative.scores.carbon.renewable_percentage
        ),
        alternative_region: Some(alternative.region.clone()),
        expected_impact: Some(format!(
            "Carbon score +{carbon_gain:.0} ({:.0} -> {:.0}); latency score {latency_delta:+.0}.",
            scores.carbon.score, alternative.scores.carbon.score
        )),
    }
}

fn optimization_strategy(scores: &VerdictScores) -> GreenSuggestion {
    let weakest = Factor::ordered()
        .into_iter()
        .min_by(|a, b| scores.score(*a).total_cmp(&scores.score(*b)))
        .unwrap_or(Factor::Carbon);

    let (description, impact) = match weakest {
        Factor::Carbon => (
            "Shift flexible and batch workloads to hours when the grid runs on more renewable supply, and pin only latency-critical services here.",
            "Carbon-aware scheduling typically trims emissions of deferrable work by 10-30%.",
        ),
        Factor::Latency => (
            "Serve latency-sensitive traffic from an edge cache or a closer region and keep asynchronous work here.",
            "Edge caching usually removes most of the round trip for cacheable requests.",
        ),
        Factor::Cost => (
            "Right-size instances and move steady workloads onto committed-use or spot capacity.",
            "Commitment discounts commonly cut compute spend by 30-60%.",
        ),
    };

    GreenSuggestion {
        kind: SuggestionKind::OptimizationStrategy,
        description: description.to_string(),
        alternative_region: None,
        expected_impact: Some(impact.to_string()),
    }
}

pub(crate) fn blue_card_suggestion(failure: &CollectionFailure) -> GreenSuggestion {
    GreenSuggestion {
        kind: SuggestionKind::OptimizationStrategy,
        description: format!(
            "Retry once the {} feed recovers, or evaluate an alternative region with complete data.",
            failure.factor
        ),
        alternative_region: None,
        expected_impact: None,
    }
}
