//! Command handlers, one module per area.

pub mod generate;
pub mod insights;
pub mod project;
pub mod run;
pub mod session;

use anyhow::Result;

use crate::application::Pipeline;
use crate::cli::types::Commands;

pub async fn dispatch(command: Commands, pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    match command {
        Commands::Status => project::status(pipeline, json_mode).await,
        Commands::Upload { file } => project::upload(pipeline, &file, json_mode).await,
        Commands::Clone { url, token } => project::clone(pipeline, url, token, json_mode).await,
        Commands::Generate { base_url, force } => {
            generate::generate(pipeline, base_url, force, json_mode).await
        }
        Commands::Tick => generate::tick(pipeline, json_mode).await,
        Commands::Run => run::run(pipeline, json_mode).await,
        Commands::Failures => run::failures(pipeline, json_mode).await,
        Commands::Heal {
            target,
            failure,
            retest,
        } => run::heal(pipeline, target, failure, retest, json_mode).await,
        Commands::History => insights::history(pipeline, json_mode).await,
        Commands::Stats => insights::stats(pipeline, json_mode).await,
        Commands::ClearLog => generate::clear_log(pipeline, json_mode).await,
        Commands::Logout => session::logout(pipeline, json_mode).await,
    }
}
