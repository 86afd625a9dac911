//! apiheal CLI entry point.

use anyhow::Context;
use clap::Parser;

use apiheal::cli::{build_pipeline, commands, handle_error, Cli};
use apiheal::infrastructure::config::ConfigLoader;
use apiheal::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json_mode);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    let log_config = LogConfig::try_from(&config.logging)?;
    let _logger = LoggerImpl::init(&log_config).context("Failed to initialize logging")?;

    let pipeline = build_pipeline(&config, cli.user.as_deref(), cli.offline, cli.recover).await?;
    commands::dispatch(cli.command, &pipeline, cli.json).await
}
