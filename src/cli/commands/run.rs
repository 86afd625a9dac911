//! Test execution, triage and healing commands.

use anyhow::Result;
use serde::Serialize;

use crate::application::Pipeline;
use crate::cli::output::{
    create_spinner, output, styled_stage, table::format_score, CommandOutput, ProgressBarExt,
    TableFormatter,
};
use crate::cli::types::HealTarget;
use crate::domain::models::{ExecutionResult, ExecutionStage, HealingResult, HealingScope};
use crate::services::{ExecutionOutcome, HealingOutcome, TriageView};

#[derive(Debug, Serialize)]
pub struct ExecutionOutput {
    pub stage: ExecutionStage,
    pub result: Option<ExecutionResult>,
    pub message: Option<String>,
    pub console: Vec<String>,
}

impl ExecutionOutput {
    fn new(outcome: ExecutionOutcome, console: Vec<String>) -> Self {
        let stage = outcome.stage();
        let (result, message) = match outcome {
            ExecutionOutcome::Completed(result) => (Some(result), None),
            ExecutionOutcome::Failed { message } => (None, Some(message)),
        };
        Self {
            stage,
            result,
            message,
            console,
        }
    }
}

impl CommandOutput for ExecutionOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Execution: {}", styled_stage(self.stage.as_str()))];
        lines.extend(self.console.iter().map(|line| format!("  {line}")));

        if let Some(result) = &self.result {
            lines.push(format!(
                "Score: {}  Passed: {}  Failed: {}  Errors: {}",
                format_score(result.score),
                result.summary.passed,
                result.summary.failed,
                result.summary.error
            ));
            if !result.failures.is_empty() {
                lines.push(TableFormatter::new().format_failures(&result.failures));
                lines.push("Run `apiheal heal test` to repair the suite.".to_string());
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct FailuresOutput {
    pub view: TriageView,
}

impl CommandOutput for FailuresOutput {
    fn to_human(&self) -> String {
        match &self.view {
            TriageView::Failures(failures) => format!(
                "{} failing test(s):\n{}",
                failures.len(),
                TableFormatter::new().format_failures(failures)
            ),
            TriageView::RawLog(lines) => {
                let mut out = vec!["No structured failures; raw log:".to_string()];
                out.extend(lines.iter().map(|line| format!("  {line}")));
                out.join("\n")
            }
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.view).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct HealOutput {
    pub scope: HealingScope,
    pub result: HealingResult,
    pub retest_offered: bool,
    pub retest: Option<ExecutionOutput>,
}

impl CommandOutput for HealOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match &self.result {
            HealingResult::Healed {
                applied_fix,
                explanation,
                recommendation,
            } => {
                lines.push(match self.scope {
                    HealingScope::Test => "Test file healed.".to_string(),
                    HealingScope::Code => "Code diagnosis ready.".to_string(),
                });
                if let Some(explanation) = explanation {
                    lines.push(format!("\nExplanation:\n{explanation}"));
                }
                if let Some(recommendation) = recommendation {
                    lines.push(format!("\nRecommendation:\n{recommendation}"));
                }
                lines.push(format!("\nFix:\n{applied_fix}"));
            }
            HealingResult::Failed { reason } => {
                lines.push(format!("Healing failed: {reason}"));
            }
        }

        match &self.retest {
            Some(retest) => {
                lines.push(String::new());
                lines.push(retest.to_human());
            }
            None if self.retest_offered => {
                lines.push("\nRun `apiheal run` to verify the fix.".to_string());
            }
            None => {}
        }
        lines.join("\n")
    }
}

async fn execute_suite(pipeline: &Pipeline, json_mode: bool) -> Result<ExecutionOutput> {
    let spinner = create_spinner("Running test suite...", json_mode);
    let outcome = match pipeline.run_tests().await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    match &outcome {
        ExecutionOutcome::Completed(result) if result.summary.has_problems() => {
            spinner.finish_warning("Suite finished with failures");
        }
        ExecutionOutcome::Completed(_) => spinner.finish_success("Suite passed"),
        ExecutionOutcome::Failed { .. } => spinner.finish_error("Execution failed"),
    }

    let console = pipeline.execution().console_log().await;
    Ok(ExecutionOutput::new(outcome, console))
}

pub async fn run(pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let result = execute_suite(pipeline, json_mode).await?;
    output(&result, json_mode);
    Ok(())
}

pub async fn failures(pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let view = pipeline.triage().await?;
    output(&FailuresOutput { view }, json_mode);
    Ok(())
}

pub async fn heal(
    pipeline: &Pipeline,
    target: HealTarget,
    failure: Option<String>,
    retest: bool,
    json_mode: bool,
) -> Result<()> {
    let scope = HealingScope::from(target);
    let message = match scope {
        HealingScope::Test => "Healing test file...",
        HealingScope::Code => "Diagnosing application code...",
    };

    let spinner = create_spinner(message, json_mode);
    let outcome = match pipeline.heal_selected(scope, failure.as_deref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    if outcome.result.is_ok() {
        spinner.finish_success("Agent answered");
    } else {
        spinner.finish_error("Healing failed");
    }

    let HealingOutcome {
        scope,
        result,
        retest_offered,
    } = outcome;
    let retest = if retest && retest_offered {
        Some(execute_suite(pipeline, json_mode).await?)
    } else {
        None
    };

    output(
        &HealOutput {
            scope,
            result,
            retest_offered,
            retest,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Failure, TestSummary};

    #[test]
    fn test_execution_output_failed() {
        let out = ExecutionOutput::new(
            ExecutionOutcome::Failed {
                message: "No test file found".to_string(),
            },
            vec!["Execution error: No test file found".to_string()],
        );
        assert_eq!(out.stage, ExecutionStage::Error);
        assert!(out.result.is_none());
        assert!(out.to_human().contains("Execution error: No test file found"));
    }

    #[test]
    fn test_execution_output_suggests_heal() {
        let result = ExecutionResult {
            score: -3.0,
            summary: TestSummary::new(2, 1, 0),
            failures: vec![Failure::new("test_create_order", "assert 500 == 201")],
            ..ExecutionResult::default()
        };
        let out = ExecutionOutput::new(ExecutionOutcome::Completed(result), Vec::new());
        let human = out.to_human();
        assert!(human.contains("Passed: 2"));
        assert!(human.contains("apiheal heal test"));
    }

    #[test]
    fn test_failures_output_json_shape() {
        let out = FailuresOutput {
            view: TriageView::RawLog(vec!["No logs available.".to_string()]),
        };
        let json = out.to_json();
        assert_eq!(json["kind"], "raw_log");
        assert_eq!(json["items"][0], "No logs available.");
    }

    #[test]
    fn test_heal_output_failed() {
        let out = HealOutput {
            scope: HealingScope::Test,
            result: HealingResult::failed("No test file"),
            retest_offered: false,
            retest: None,
        };
        let human = out.to_human();
        assert!(human.contains("Healing failed: No test file"));
        assert!(!human.contains("apiheal run"));
    }

    #[test]
    fn test_heal_output_offers_retest() {
        let out = HealOutput {
            scope: HealingScope::Test,
            result: HealingResult::Healed {
                applied_fix: "def test_ok(): pass".to_string(),
                explanation: Some("Fixed the status code".to_string()),
                recommendation: None,
            },
            retest_offered: true,
            retest: None,
        };
        let human = out.to_human();
        assert!(human.contains("Test file healed."));
        assert!(human.contains("def test_ok(): pass"));
        assert!(human.contains("apiheal run"));
    }
}
