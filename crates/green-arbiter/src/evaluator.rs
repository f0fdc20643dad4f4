use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::analysis::{
    CarbonAnalyzer, CostAnalyzer, CostBaselines, LatencyAnalyzer, LatencyBaselines,
    MetricValidationError,
};
use crate::collector::{CollectionFailure, CollectorError, MetricCollector, StandardCollector, UpstreamError};
use crate::config::AppConfig;
use crate::domain::Region;
use crate::report;
use crate::scoring::{FactorWeights, ScoringEngine};
use crate::verdict::{self, sort_batch, ArbitratorVerdict, Verdict, VerdictScores};

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("metrics for {region} failed validation: {source}")]
    Validation {
        region: String,
        #[source]
        source: MetricValidationError,
    },
    #[error(transparent)]
    Collector(#[from] CollectorError),
}

/// Current weights and the components wired into an [`Evaluator`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub weights: FactorWeights,
    pub components: Vec<&'static str>,
}

/// Entry point of the pipeline: collect, analyze, score and judge.
pub struct Evaluator {
    collector: Arc<dyn MetricCollector>,
    latency: LatencyAnalyzer,
    carbon: CarbonAnalyzer,
    cost: CostAnalyzer,
    engine: ScoringEngine,
}

impl Evaluator {
    /// Evaluator with the standard latency and cost baselines.
    pub fn new(collector: Arc<dyn MetricCollector>, weights: FactorWeights) -> Self {
        Self {
            collector,
            latency: LatencyAnalyzer::new(LatencyBaselines::standard()),
            carbon: CarbonAnalyzer::default(),
            cost: CostAnalyzer::new(CostBaselines::default()),
            engine: ScoringEngine::new(weights),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        let collector = StandardCollector::from_config(config)?;
        Ok(Self::new(Arc::new(collector), config.weights))
    }

    pub fn with_latency_baselines(mut self, baselines: LatencyBaselines) -> Self {
        self.latency = LatencyAnalyzer::new(baselines);
        self
    }

    pub fn with_cost_baselines(mut self, baselines: CostBaselines) -> Self {
        self.cost = CostAnalyzer::new(baselines);
        self
    }

    pub fn with_carbon_analyzer(mut self, analyzer: CarbonAnalyzer) -> Self {
        self.carbon = analyzer;
        self
    }

    pub fn weights(&self) -> &FactorWeights {
        self.engine.weights()
    }

    /// Replaces the weights for subsequent evaluations.
    pub fn configure_weights(&mut self, weights: FactorWeights) {
        info!(
            carbon = weights.carbon(),
            latency = weights.latency(),
            cost = weights.cost(),
            "factor weights reconfigured"
        );
        self.engine = ScoringEngine::new(weights);
    }

    /// Evaluates a single region. With no peers to compare against, the suggestion is an
    /// optimization strategy or "no better option".
    pub async fn evaluate_one(&self, region: &Region) -> Result<ArbitratorVerdict, EvaluationError> {
        self.assess(region).await
    }

    /// Evaluates every region concurrently, proposes greener peers from the batch and sorts the
    /// result greenest first. Any region that fails with an error aborts the batch with the
    /// first such error in input order.
    pub async fn evaluate_many(
        &self,
        regions: &[Region],
    ) -> Result<Vec<ArbitratorVerdict>, EvaluationError> {
        info!(regions = regions.len(), "evaluating region batch");
        let results = join_all(regions.iter().map(|region| self.assess(region))).await;

        let mut verdicts = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (region, result) in regions.iter().zip(results) {
            match result {
                Ok(verdict) => verdicts.push(verdict),
                Err(err) => {
                    error!(region = %region.key(), error = %err, "region evaluation failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let pool: Vec<ArbitratorVerdict> = verdicts
            .iter()
            .filter(|verdict| verdict.verdict != Verdict::BlueCard)
            .cloned()
            .collect();
        for verdict in &mut verdicts {
            verdict.resuggest(&pool);
        }
        sort_batch(&mut verdicts);

        info!(
            regions = verdicts.len(),
            blue_cards = verdicts.len() - pool.len(),
            "region batch evaluated"
        );
        Ok(verdicts)
    }

    pub fn format_report(&self, verdicts: &[ArbitratorVerdict], title: &str) -> String {
        self.format_report_at(verdicts, title, Utc::now())
    }

    pub fn format_report_at(
        &self,
        verdicts: &[ArbitratorVerdict],
        title: &str,
        generated_at: DateTime<Utc>,
    ) -> String {
        report::render_report(verdicts, title, self.weights(), generated_at)
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            weights: *self.weights(),
            components: vec![
                self.collector.name(),
                "latency-analyzer",
                "carbon-analyzer",
                "cost-analyzer",
                "scoring-engine",
                "verdict-generator",
            ],
        }
    }

    async fn assess(&self, region: &Region) -> Result<ArbitratorVerdict, EvaluationError> {
        let (latency, carbon, cost) = tokio::join!(
            self.collector.latency(region),
            self.collector.carbon(region),
            self.collector.cost(region),
        );
        let now = Utc::now();

        let (carbon, latency, cost) = match (settle(carbon)?, settle(latency)?, settle(cost)?) {
            (Ok(carbon), Ok(latency), Ok(cost)) => (carbon, latency, cost),
            (Err(failure), _, _) | (_, Err(failure), _) | (_, _, Err(failure)) => {
                warn!(region = %region.key(), factor = %failure.factor, error = %failure, "issuing blue card");
                return Ok(verdict::blue_card(region, &failure, now));
            }
        };

        let validation = |source| EvaluationError::Validation {
            region: region.key(),
            source,
        };
        let latency = self.latency.analyze(region, &latency, now);
        let carbon = self.carbon.analyze(&carbon, now).map_err(validation)?;
        let cost = self.cost.analyze(&cost).map_err(validation)?;
        debug!(
            region = %region.key(),
            latency = latency.score,
            carbon = carbon.score,
            cost = cost.score,
            "factor scores computed"
        );

        let composite = self.engine.combine(&latency, &carbon, &cost);
        let verdict = verdict::judge(
            region,
            VerdictScores {
                latency,
                carbon,
                cost,
                composite,
            },
            &[],
            now,
        );
        debug!(
            region = %region.key(),
            verdict = verdict.verdict.label(),
            composite = verdict.scores.composite.overall_score,
            "verdict issued"
        );
        Ok(verdict)
    }
}

/// Separates a region-level failure (Blue Card) from a fault that aborts the evaluation.
fn settle<T>(
    result: Result<T, CollectorError>,
) -> Result<Result<T, CollectionFailure>, EvaluationError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(CollectorError::Failure(failure)) => Ok(Err(failure)),
        Err(fault) => Err(EvaluationError::Collector(fault)),
    }
}
