//! Test generation commands.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::application::Pipeline;
use crate::cli::output::{create_spinner, output, styled_stage, CommandOutput, ProgressBarExt};
use crate::domain::models::GenerationStage;
use crate::services::GenerationOutcome;

#[derive(Debug, Serialize)]
pub struct GenerationOutput {
    pub stage: GenerationStage,
    pub test_file_path: Option<String>,
    pub message: Option<String>,
    pub log: Vec<String>,
}

impl From<&GenerationOutcome> for GenerationOutput {
    fn from(outcome: &GenerationOutcome) -> Self {
        let (test_file_path, message) = match outcome {
            GenerationOutcome::Success { test_file_path } => (test_file_path.clone(), None),
            GenerationOutcome::Quota { message } | GenerationOutcome::Error { message } => {
                (None, Some(message.clone()))
            }
        };
        Self {
            stage: outcome.stage(),
            test_file_path,
            message,
            log: outcome.log_lines(),
        }
    }
}

impl CommandOutput for GenerationOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Generation: {}", styled_stage(self.stage.as_str()))];
        lines.extend(self.log.iter().map(|line| format!("  {line}")));
        if self.stage == GenerationStage::Quota {
            lines.push(
                "Usage limit reached. Ingest a new project or retry later with --force.".to_string(),
            );
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct TickOutput {
    pub triggered: bool,
    pub generation: Option<GenerationOutput>,
}

impl CommandOutput for TickOutput {
    fn to_human(&self) -> String {
        match &self.generation {
            Some(generation) => generation.to_human(),
            None => "No automatic generation pending.".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClearLogOutput {
    pub success: bool,
    pub message: String,
}

impl CommandOutput for ClearLogOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

fn finish(spinner: &indicatif::ProgressBar, outcome: &GenerationOutcome) {
    match outcome {
        GenerationOutcome::Success { .. } => spinner.finish_success("Test suite generated"),
        GenerationOutcome::Quota { .. } => spinner.finish_warning("Usage limit reached"),
        GenerationOutcome::Error { .. } => spinner.finish_error("Generation failed"),
    }
}

/// Start generation now.
///
/// A `quota` stage is only retried with `force`.
pub async fn generate(
    pipeline: &Pipeline,
    base_url: Option<String>,
    force: bool,
    json_mode: bool,
) -> Result<()> {
    let state = pipeline.state().await;
    if state.generation_stage == GenerationStage::Quota && !force {
        bail!("The last generation hit the usage limit. Ingest a new project or pass --force to retry.");
    }

    let spinner = create_spinner("Generating test suite...", json_mode);
    let outcome = match pipeline.generate(base_url).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    finish(&spinner, &outcome);

    output(&GenerationOutput::from(&outcome), json_mode);
    Ok(())
}

/// Fire the pending auto-generate signal, if armed.
pub async fn run_tick(pipeline: &Pipeline, json_mode: bool) -> Result<TickOutput> {
    if !pipeline.state().await.auto_generate_ready() {
        return Ok(TickOutput {
            triggered: false,
            generation: None,
        });
    }

    let spinner = create_spinner("Generating test suite for the new project...", json_mode);
    let outcome = match pipeline.tick().await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    match &outcome {
        Some(outcome) => finish(&spinner, outcome),
        None => spinner.finish_and_clear(),
    }

    Ok(TickOutput {
        triggered: outcome.is_some(),
        generation: outcome.as_ref().map(GenerationOutput::from),
    })
}

pub async fn tick(pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let result = run_tick(pipeline, json_mode).await?;
    output(&result, json_mode);
    Ok(())
}

pub async fn clear_log(pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    pipeline.generation().clear_log().await;
    output(
        &ClearLogOutput {
            success: true,
            message: "Generation log cleared.".to_string(),
        },
        json_mode,
    );
    Ok(())
}
