mod access;
mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use workpass::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
