//! History and dashboard commands.

use anyhow::Result;
use serde::Serialize;

use crate::application::Pipeline;
use crate::cli::output::{
    create_spinner, output, table::format_score, CommandOutput, ProgressBarExt, TableFormatter,
};
use crate::domain::models::{ActivityKind, RunRecord};
use crate::services::{InsightsError, Overview};

#[derive(Debug, Serialize)]
pub struct HistoryOutput {
    pub runs: Vec<RunRecord>,
    pub total: usize,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.runs.is_empty() {
            return "No test runs recorded yet.".to_string();
        }
        format!(
            "{} run(s), newest first:\n{}",
            self.total,
            TableFormatter::new().format_history(&self.runs)
        )
    }
}

#[derive(Debug, Serialize)]
pub struct StatsOutput {
    #[serde(flatten)]
    pub overview: Overview,
}

impl CommandOutput for StatsOutput {
    fn to_human(&self) -> String {
        let Overview {
            stats,
            analytics,
            recent_activity,
            ..
        } = &self.overview;

        let mut lines = vec![
            format!("Total runs:      {}", stats.total_runs),
            format!("Passed runs:     {}", stats.passed_runs),
            format!("Average score:   {}", format_score(stats.avg_score)),
            format!("Active projects: {}", stats.active_projects),
            format!("Pass rate:       {:.1}%", analytics.pass_rate),
            format!(
                "Distribution:    {} passed / {} failed",
                analytics.passed_runs,
                analytics.failed_runs()
            ),
        ];

        if !analytics.trend.is_empty() {
            lines.push("\nDaily trend:".to_string());
            lines.push(TableFormatter::new().format_trend(&analytics.trend));
        }

        if !recent_activity.is_empty() {
            lines.push("\nRecent activity:".to_string());
            for entry in recent_activity {
                let marker = match entry.kind {
                    ActivityKind::Success => console::style("✓").green(),
                    ActivityKind::Warning => console::style("!").yellow(),
                };
                lines.push(format!("  {marker} {} ({})", entry.message, entry.timestamp));
            }
        }

        lines.join("\n")
    }
}

async fn with_spinner<T, F>(message: &str, json_mode: bool, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T, InsightsError>>,
{
    let spinner = create_spinner(message, json_mode);
    match fut.await {
        Ok(value) => {
            spinner.finish_and_clear();
            Ok(value)
        }
        Err(e) => {
            spinner.finish_error("Request failed");
            Err(e.into())
        }
    }
}

pub async fn history(pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let runs = with_spinner(
        "Fetching run history...",
        json_mode,
        pipeline.insights().fetch_history(),
    )
    .await?;
    output(
        &HistoryOutput {
            total: runs.len(),
            runs,
        },
        json_mode,
    );
    Ok(())
}

pub async fn stats(pipeline: &Pipeline, json_mode: bool) -> Result<()> {
    let overview = with_spinner(
        "Fetching dashboard statistics...",
        json_mode,
        pipeline.insights().overview(),
    )
    .await?;
    output(&StatsOutput { overview }, json_mode);
    Ok(())
}
