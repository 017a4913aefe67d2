use anyhow::Result;
use clap::Parser;
use tracing::info;

use flight_delay::{config::ServiceConfig, logging};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Arguments first so `--help` works even with a broken environment.
    let cli = Cli::parse();
    let config = ServiceConfig::from_env()?;
    logging::init(config.json_logs)?;
    info!(version = env!("CARGO_PKG_VERSION"), "flight_delay starting up");

    cli::run(cli, config).await
}
