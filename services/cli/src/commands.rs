use std::path::PathBuf;

use clap::Args;
use green_arbiter::catalog;
use green_arbiter::collector::MOCK_SOURCE_TAG;
use green_arbiter::config::{AppConfig, ConfigError};
use green_arbiter::domain::Region;
use green_arbiter::error::AppError;
use green_arbiter::scoring::FactorWeights;
use green_arbiter::verdict::ArbitratorVerdict;
use green_arbiter::Evaluator;
use serde::Serialize;
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct RegionArgs {
    /// Catalog keys such as aws:eu-north-1. Defaults to the whole catalog.
    pub(crate) keys: Vec<String>,
    /// CSV file with provider,region_code,display_name,country,city,latitude,longitude
    #[arg(long, conflicts_with = "keys")]
    pub(crate) regions_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct WeightArgs {
    /// Carbon weight (0-0.8); requires --latency and --cost
    #[arg(long, requires_all = ["latency", "cost"])]
    pub(crate) carbon: Option<f64>,
    /// Latency weight (0-0.8); requires --carbon and --cost
    #[arg(long, requires_all = ["carbon", "cost"])]
    pub(crate) latency: Option<f64>,
    /// Cost weight (0-0.8); requires --carbon and --latency
    #[arg(long, requires_all = ["carbon", "latency"])]
    pub(crate) cost: Option<f64>,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    #[command(flatten)]
    pub(crate) regions: RegionArgs,
    #[command(flatten)]
    pub(crate) weights: WeightArgs,
    /// Print verdicts as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    #[command(flatten)]
    pub(crate) regions: RegionArgs,
    #[command(flatten)]
    pub(crate) weights: WeightArgs,
    /// Report heading
    #[arg(long, default_value = "Green Arbiter Region Report")]
    pub(crate) title: String,
}

#[derive(Serialize)]
struct HealthView {
    status: &'static str,
    environment: String,
    carbon_source: &'static str,
    weights: FactorWeights,
    components: Vec<&'static str>,
}

pub(crate) async fn run_evaluate(config: &AppConfig, args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        regions,
        weights,
        json,
    } = args;

    let regions = load_regions(regions)?;
    let evaluator = build_evaluator(config, weights)?;
    let verdicts = evaluator.evaluate_many(&regions).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
    } else {
        for verdict in &verdicts {
            render_verdict(verdict);
        }
    }
    Ok(())
}

pub(crate) async fn run_report(config: &AppConfig, args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        regions,
        weights,
        title,
    } = args;

    let regions = load_regions(regions)?;
    let evaluator = build_evaluator(config, weights)?;
    let verdicts = evaluator.evaluate_many(&regions).await?;
    print!("{}", evaluator.format_report(&verdicts, &title));
    Ok(())
}

pub(crate) fn run_health(config: &AppConfig) -> Result<(), AppError> {
    let evaluator = Evaluator::from_config(config)?;
    let health = evaluator.health();
    let view = HealthView {
        status: health.status,
        environment: format!("{:?}", config.environment).to_ascii_lowercase(),
        carbon_source: if config.carbon_api.api_key.is_some() {
            "electricitymaps"
        } else {
            MOCK_SOURCE_TAG
        },
        weights: health.weights,
        components: health.components,
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn load_regions(args: RegionArgs) -> Result<Vec<Region>, AppError> {
    let regions = match (args.regions_csv, args.keys.is_empty()) {
        (Some(path), _) => catalog::regions_from_path(path)?,
        (None, false) => catalog::resolve_keys(&args.keys)?,
        (None, true) => catalog::default_regions(),
    };
    info!(regions = regions.len(), "regions loaded");
    Ok(regions)
}

fn build_evaluator(config: &AppConfig, weights: WeightArgs) -> Result<Evaluator, AppError> {
    let mut evaluator = Evaluator::from_config(config)?;
    if let (Some(carbon), Some(latency), Some(cost)) = (weights.carbon, weights.latency, weights.cost)
    {
        let weights = FactorWeights::new(carbon, latency, cost).map_err(ConfigError::InvalidWeights)?;
        evaluator.configure_weights(weights);
    }
    Ok(evaluator)
}

fn render_verdict(verdict: &ArbitratorVerdict) {
    let scores = &verdict.scores;
    println!(
        "[{}] {} | composite {:.1} | referee confidence {}",
        verdict.verdict.label(),
        verdict.region,
        scores.composite.overall_score,
        verdict.referee_confidence.label()
    );
    println!(
        "  carbon {:.0} ({}) | latency {:.0} ({}) | cost {:.0} ({})",
        scores.carbon.score,
        scores.carbon.category.label(),
        scores.latency.score,
        scores.latency.category.label(),
        scores.cost.score,
        scores.cost.category.label()
    );
    for line in verdict.reason.lines() {
        println!("  {line}");
    }
    println!("  Suggestion: {}", verdict.suggestion.description);
    if let Some(impact) = &verdict.suggestion.expected_impact {
        println!("  Expected impact: {impact}");
    }
    println!();
}
