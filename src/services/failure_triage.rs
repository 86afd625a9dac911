//! Structured failures or raw log, whichever the run produced.

use serde::Serialize;

use crate::domain::models::{ExecutionResult, Failure, HealingEvidence};

pub const NO_LOGS_PLACEHOLDER: &str = "No logs available.";

/// What to show (and heal from) for a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum TriageView {
    Failures(Vec<Failure>),
    RawLog(Vec<String>),
}

impl TriageView {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Failures(_))
    }
}

impl From<TriageView> for HealingEvidence {
    fn from(view: TriageView) -> Self {
        match view {
            TriageView::Failures(failures) => Self::Failures(failures),
            TriageView::RawLog(lines) => Self::RawLog(lines),
        }
    }
}

/// Prefer per-test failure records; fall back to the raw log, then to a
/// placeholder line.
pub fn triage(result: &ExecutionResult) -> TriageView {
    if !result.failures.is_empty() {
        return TriageView::Failures(result.failures.clone());
    }
    if !result.raw_log.is_empty() {
        return TriageView::RawLog(result.raw_log.clone());
    }
    TriageView::RawLog(vec![NO_LOGS_PLACEHOLDER.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_log_fallback() {
        let result = ExecutionResult {
            raw_log: vec!["a".to_string(), "b".to_string()],
            ..ExecutionResult::default()
        };
        assert_eq!(
            triage(&result),
            TriageView::RawLog(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_failures_win_over_raw_log() {
        let f1 = Failure::new("test_orders", "assert 500 == 201");
        let result = ExecutionResult {
            failures: vec![f1.clone()],
            raw_log: vec!["anything".to_string()],
            ..ExecutionResult::default()
        };
        let view = triage(&result);
        assert!(view.is_structured());
        assert_eq!(view, TriageView::Failures(vec![f1]));
    }

    #[test]
    fn test_placeholder_when_empty() {
        assert_eq!(
            triage(&ExecutionResult::default()),
            TriageView::RawLog(vec![NO_LOGS_PLACEHOLDER.to_string()])
        );
    }
}
