//! Plain-text and structured summaries of a batch of verdicts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scoring::FactorWeights;
use crate::verdict::{ArbitratorVerdict, Verdict};

#[derive(Debug, Clone, Serialize)]
pub struct VerdictCount {
    pub verdict: Verdict,
    pub verdict_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionLine {
    pub region: String,
    pub display_name: String,
    pub verdict: Verdict,
    pub verdict_label: &'static str,
    pub composite: f64,
    pub carbon: f64,
    pub latency: f64,
    pub cost: f64,
    pub referee_confidence: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub verdict_counts: Vec<VerdictCount>,
    pub regions: Vec<RegionLine>,
}

impl ReportSummary {
    pub fn from_verdicts(verdicts: &[ArbitratorVerdict]) -> Self {
        let verdict_counts = Verdict::all()
            .into_iter()
            .map(|verdict| VerdictCount {
                verdict,
                verdict_label: verdict.label(),
                count: verdicts
                    .iter()
                    .filter(|entry| entry.verdict == verdict)
                    .count(),
            })
            .collect();

        let regions = verdicts
            .iter()
            .map(|entry| RegionLine {
                region: entry.region.key(),
                display_name: entry.region.display_name.clone(),
                verdict: entry.verdict,
                verdict_label: entry.verdict.label(),
                composite: entry.scores.composite.overall_score,
                carbon: entry.scores.carbon.score,
                latency: entry.scores.latency.score,
                cost: entry.scores.cost.score,
                referee_confidence: entry.referee_confidence.label(),
            })
            .collect();

        Self {
            total: verdicts.len(),
            verdict_counts,
            regions,
        }
    }
}

fn percent(weight: f64) -> String {
    format!("{:.0}%", weight * 100.0)
}

/// Renders a deterministic text report. The same inputs always produce the same text.
pub fn render_report(
    verdicts: &[ArbitratorVerdict],
    title: &str,
    weights: &FactorWeights,
    generated_at: DateTime<Utc>,
) -> String {
    let summary = ReportSummary::from_verdicts(verdicts);
    let mut lines = vec![
        title.to_string(),
        "=".repeat(title.chars().count().max(1)),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        format!(
            "Weights: carbon {} | latency {} | cost {}",
            percent(weights.carbon()),
            percent(weights.latency()),
            percent(weights.cost())
        ),
        format!("Regions evaluated: {}", summary.total),
        format!(
            "Verdicts: {}",
            summary
                .verdict_counts
                .iter()
                .map(|entry| format!("{} {}", entry.verdict_label, entry.count))
                .collect::<Vec<_>>()
                .join(" | ")
        ),
        String::new(),
    ];

    if summary.regions.is_empty() {
        lines.push("No regions were evaluated.".to_string());
    } else {
        lines.push("Regions:".to_string());
        for entry in &summary.regions {
            lines.push(format!(
                "- [{}] {} ({}): composite {:.1} | carbon {:.0} | latency {:.0} | cost {:.0} | confidence {}",
                entry.verdict_label,
                entry.display_name,
                entry.region,
                entry.composite,
                entry.carbon,
                entry.latency,
                entry.cost,
                entry.referee_confidence
            ));
        }
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}
