mod cli;
mod commands;

use green_arbiter::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
