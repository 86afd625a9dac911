//! Builds the [`Pipeline`] a command runs against.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::http::HttpPipelineBackend;
use crate::adapters::mock::MockBackend;
use crate::adapters::sqlite::{initialize_database, SqliteStateRepository};
use crate::application::Pipeline;
use crate::domain::models::{Config, UserId, WorkflowState};
use crate::domain::ports::PipelineBackend;

/// Open the state database, pick the backend and sign in.
///
/// `--offline` swaps the remote service for the built-in demo backend;
/// workflow state is persisted either way. Stages another process left in
/// progress are only settled with `--recover`, since that process may still
/// be waiting on the backend.
pub async fn build_pipeline(
    config: &Config,
    user: Option<&str>,
    offline: bool,
    recover: bool,
) -> Result<Pipeline> {
    let pool = initialize_database(&config.database)
        .await
        .with_context(|| format!("Failed to open workflow state database at {}", config.database.path))?;
    let repository = Arc::new(SqliteStateRepository::new(pool));

    let backend: Arc<dyn PipelineBackend> = if offline {
        Arc::new(MockBackend::new())
    } else {
        Arc::new(
            HttpPipelineBackend::new(&config.backend)
                .context("Failed to create pipeline backend client")?,
        )
    };

    let defaults = WorkflowState::with_target_base_url(&config.generation.default_target_base_url);
    let pipeline = Pipeline::new(repository, backend, defaults);

    if let Some(user) = user {
        pipeline.sign_in(UserId::new(user)?).await;
        if recover {
            pipeline.recover_interrupted().await;
        }
    }
    Ok(pipeline)
}
