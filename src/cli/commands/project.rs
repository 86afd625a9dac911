//! Project status and ingestion commands.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use super::generate::{run_tick, GenerationOutput};
use crate::application::Pipeline;
use crate::cli::output::{
    create_spinner, output, styled_stage, table::format_score, CommandOutput, ProgressBarExt,
    TableFormatter,
};
use crate::domain::errors::CoordinatorError;
use crate::domain::models::{Endpoint, IngestionReport, StageAxis, UploadFile, WorkflowState};

/// Generation log lines shown in human status output.
const LOG_TAIL_LEN: usize = 10;

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub user: Option<String>,
    pub state: WorkflowState,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let state = &self.state;
        let mut lines = vec![match &self.user {
            Some(user) => format!("User: {user}"),
            None => "Not signed in (pass --user or set APIHEAL_USER).".to_string(),
        }];

        lines.push(format!(
            "Project: {}",
            state.project_name.as_deref().unwrap_or("none")
        ));
        if !state.github_url.is_empty() {
            lines.push(format!("Repository: {}", state.github_url));
        }
        lines.push(format!("Target base URL: {}", state.target_base_url));
        lines.push(String::new());

        for axis in [StageAxis::Upload, StageAxis::Generation, StageAxis::Execution] {
            lines.push(format!(
                "{:<11} {}",
                format!("{}:", capitalize(axis.as_str())),
                styled_stage(state.stage_label(axis))
            ));
        }
        if let Some(result) = &state.last_execution_result {
            lines.push(format!(
                "Last run: score {}, {} passed, {} failed, {} errors",
                format_score(result.score),
                result.summary.passed,
                result.summary.failed,
                result.summary.error
            ));
        }
        if state.auto_generate_requested {
            lines.push("Automatic generation pending; run `apiheal tick`.".to_string());
        }

        if !state.endpoints.is_empty() {
            lines.push(format!("\nEndpoints ({}):", state.endpoints.len()));
            lines.push(TableFormatter::new().format_endpoints(&state.endpoints));
        }

        if !state.generation_log.is_empty() {
            lines.push("\nGeneration log:".to_string());
            let skip = state.generation_log.len().saturating_sub(LOG_TAIL_LEN);
            lines.extend(
                state.generation_log[skip..]
                    .iter()
                    .map(|line| format!("  {line}")),
            );
        }

        lines.join("\n")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[derive(Debug, Serialize)]
pub struct IngestOutput {
    pub project_name: String,
    pub endpoints: Vec<Endpoint>,
    pub upload_path: Option<String>,
    pub generation: Option<GenerationOutput>,
}

impl IngestOutput {
    fn new(report: IngestionReport, generation: Option<GenerationOutput>) -> Self {
        Self {
            project_name: report.project_name,
            endpoints: report.endpoints,
            upload_path: report.upload_path,
            generation,
        }
    }
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Project '{}' ingested: {} endpoint(s) discovered.",
            self.project_name,
            self.endpoints.len()
        )];
        if !self.endpoints.is_empty() {
            lines.push(TableFormatter::new().format_endpoints(&self.endpoints));
        }
        if let Some(generation) = &self.generation {
            lines.push(String::new());
            lines.push(generation.to_human());
        }
        lines.join("\n")
    }
}

pub async fn status(pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let (user, state) = pipeline.store().snapshot().await;
    output(
        &StatusOutput {
            user: user.map(String::from),
            state,
        },
        json_mode,
    );
    Ok(())
}

pub async fn upload(pipeline: &Pipeline, path: &Path, json_mode: bool) -> Result<()> {
    let file = UploadFile::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let spinner = create_spinner(format!("Uploading {}...", file.file_name), json_mode);
    let result = pipeline.ingest_file(file).await;
    finish_ingestion(pipeline, &spinner, result, json_mode).await
}

pub async fn clone(
    pipeline: &Pipeline,
    url: String,
    token: Option<String>,
    json_mode: bool,
) -> Result<()> {
    let spinner = create_spinner(format!("Cloning {url}..."), json_mode);
    let result = pipeline.ingest_repository(url, token).await;
    finish_ingestion(pipeline, &spinner, result, json_mode).await
}

/// Report the ingestion and let the raised auto-generate signal fire.
async fn finish_ingestion(
    pipeline: &Pipeline,
    spinner: &indicatif::ProgressBar,
    result: Result<IngestionReport, CoordinatorError>,
    json_mode: bool,
) -> Result<()> {
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    spinner.finish_success(format!("Discovered {} endpoint(s)", report.endpoints.len()));

    let tick = run_tick(pipeline, json_mode).await?;
    output(&IngestOutput::new(report, tick.generation), json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ExecutionResult, TestSummary};

    #[test]
    fn test_status_human_signed_out() {
        let out = StatusOutput {
            user: None,
            state: WorkflowState::default(),
        };
        let human = out.to_human();
        assert!(human.contains("Not signed in"));
        assert!(human.contains("Project: none"));
        assert!(human.contains("idle"));
    }

    #[test]
    fn test_status_human_with_result() {
        let state = WorkflowState {
            project_name: Some("shop.zip".to_string()),
            endpoints: vec![Endpoint::new("GET", "/api/products")],
            auto_generate_requested: true,
            last_execution_result: Some(ExecutionResult {
                score: -3.0,
                summary: TestSummary::new(2, 1, 0),
                ..ExecutionResult::default()
            }),
            ..WorkflowState::default()
        };
        let out = StatusOutput {
            user: Some("alice".to_string()),
            state,
        };
        let human = out.to_human();
        assert!(human.contains("User: alice"));
        assert!(human.contains("score -3.00, 2 passed, 1 failed"));
        assert!(human.contains("apiheal tick"));
        assert!(human.contains("/api/products"));
    }

    #[test]
    fn test_status_json_keeps_state_fields() {
        let out = StatusOutput {
            user: Some("alice".to_string()),
            state: WorkflowState::default(),
        };
        let json = out.to_json();
        assert_eq!(json["user"], "alice");
        assert_eq!(json["state"]["generation_stage"], "idle");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("upload"), "Upload");
        assert_eq!(capitalize(""), "");
    }
}
