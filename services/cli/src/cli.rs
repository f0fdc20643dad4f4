use crate::commands::{run_evaluate, run_health, run_report, EvaluateArgs, ReportArgs};
use clap::{Parser, Subcommand};
use green_arbiter::config::AppConfig;
use green_arbiter::error::AppError;
use green_arbiter::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "green-arbiter",
    about = "Referee verdicts for cloud regions scored on latency, carbon intensity and cost",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate regions and print one verdict per region
    Evaluate(EvaluateArgs),
    /// Evaluate regions and print the summary report
    Report(ReportArgs),
    /// Print the active weights and pipeline components
    Health,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Evaluate(args) => run_evaluate(&config, args).await,
        Command::Report(args) => run_report(&config, args).await,
        Command::Health => run_health(&config),
    }
}
