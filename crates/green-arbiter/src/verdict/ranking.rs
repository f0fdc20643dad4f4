//! Tolerance-aware orderings. Scores within a tolerance band are ties, which makes the
//! comparison non-transitive, so the slices are ordered with an insertion sort that only moves
//! an element past neighbours it strictly precedes.

use super::ArbitratorVerdict;

/// Carbon points within which two alternatives count as equally green.
pub const ALTERNATIVE_CARBON_TOLERANCE: f64 = 5.0;
/// Points within which two batch results tie on a sort key.
pub const BATCH_TOLERANCE: f64 = 1.0;

pub(crate) fn insertion_sort_by<T>(items: &mut [T], precedes: impl Fn(&T, &T) -> bool) {
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && precedes(&items[j], &items[j - 1]) {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// `Some(true)` when `a` is higher than `b` by more than `tolerance`, `Some(false)` when lower,
/// `None` when they tie.
fn outranks(a: f64, b: f64, tolerance: f64) -> Option<bool> {
    let diff = a - b;
    if diff > tolerance {
        Some(true)
    } else if diff < -tolerance {
        Some(false)
    } else {
        None
    }
}

/// Greener first; near-equal carbon falls back to better latency.
pub(crate) fn alternative_precedes(a: &ArbitratorVerdict, b: &ArbitratorVerdict) -> bool {
    outranks(
        a.scores.carbon.score,
        b.scores.carbon.score,
        ALTERNATIVE_CARBON_TOLERANCE,
    )
    .unwrap_or(a.scores.latency.score > b.scores.latency.score)
}

/// Carbon, then composite, then latency, all descending.
pub(crate) fn batch_precedes(a: &ArbitratorVerdict, b: &ArbitratorVerdict) -> bool {
    outranks(a.scores.carbon.score, b.scores.carbon.score, BATCH_TOLERANCE)
        .or_else(|| {
            outranks(
                a.scores.composite.overall_score,
                b.scores.composite.overall_score,
                BATCH_TOLERANCE,
            )
        })
        .unwrap_or(a.scores.latency.score > b.scores.latency.score)
}

pub fn sort_batch(verdicts: &mut [ArbitratorVerdict]) {
    insertion_sort_by(verdicts, batch_precedes);
}
