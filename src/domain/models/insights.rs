//! Run history and dashboard statistics.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::execution::TestSummary;

/// Pass/fail verdict recorded for a historical run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    #[serde(other)]
    Failed,
}

/// One entry of the remote run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub status: RunStatus,
    #[serde(default)]
    pub project_name: String,
    /// ISO-8601 timestamp as reported by the backend (timezone optional).
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub summary: TestSummary,
    #[serde(default)]
    pub test_file: Option<String>,
}

impl RunRecord {
    /// Calendar day of the run, if the timestamp parses.
    pub fn run_date(&self) -> Option<NaiveDate> {
        parse_timestamp(&self.timestamp).map(|dt| dt.date())
    }
}

/// Accepts RFC 3339 or a naive ISO-8601 datetime.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

/// Aggregate counters reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    pub total_runs: u64,
    pub passed_runs: u64,
    pub avg_score: f64,
    pub active_projects: u64,
}

/// Passed/failed runs on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub passed: u64,
    pub failed: u64,
}

/// Client-side analytics derived from the run history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_runs: u64,
    pub passed_runs: u64,
    /// Percentage in `0.0..=100.0`.
    pub pass_rate: f64,
    pub avg_score: f64,
    /// Ascending by date. Runs with unparseable timestamps are left out.
    pub trend: Vec<DailyTrend>,
}

impl AnalyticsSummary {
    #[allow(clippy::cast_precision_loss)]
    pub fn from_history(history: &[RunRecord]) -> Self {
        let total_runs = history.len() as u64;
        let passed_runs = history
            .iter()
            .filter(|r| r.status == RunStatus::Passed)
            .count() as u64;

        let pass_rate = if total_runs > 0 {
            (passed_runs as f64 / total_runs as f64) * 100.0
        } else {
            0.0
        };

        let avg_score = if history.is_empty() {
            0.0
        } else {
            history.iter().map(|r| r.score).sum::<f64>() / history.len() as f64
        };

        let mut by_day: BTreeMap<NaiveDate, DailyTrend> = BTreeMap::new();
        for record in history {
            let Some(date) = record.run_date() else {
                continue;
            };
            let entry = by_day.entry(date).or_insert(DailyTrend {
                date,
                passed: 0,
                failed: 0,
            });
            match record.status {
                RunStatus::Passed => entry.passed += 1,
                RunStatus::Failed => entry.failed += 1,
            }
        }

        Self {
            total_runs,
            passed_runs,
            pass_rate,
            avg_score,
            trend: by_day.into_values().collect(),
        }
    }

    pub const fn failed_runs(&self) -> u64 {
        self.total_runs - self.passed_runs
    }
}

/// Severity of an activity feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Success,
    Warning,
}

/// One line of the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub message: String,
    pub timestamp: String,
}

impl From<&RunRecord> for ActivityEntry {
    fn from(record: &RunRecord) -> Self {
        let (kind, verdict) = match record.status {
            RunStatus::Passed => (ActivityKind::Success, "passed"),
            RunStatus::Failed => (ActivityKind::Warning, "failed"),
        };
        Self {
            kind,
            message: format!("Test run {verdict}: {}", record.project_name),
            timestamp: record.timestamp.clone(),
        }
    }
}
