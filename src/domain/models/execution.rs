//! Test execution results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shown when a failure carries neither a message nor a traceback.
pub const NO_FAILURE_DETAIL: &str = "No detailed error message available.";

/// Shown in place of a missing source location.
pub const UNKNOWN_SOURCE_FILE: &str = "Unknown File";

/// Pass/fail/error counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSummary {
    pub passed: u32,
    pub failed: u32,
    pub error: u32,
}

impl TestSummary {
    pub const fn new(passed: u32, failed: u32, error: u32) -> Self {
        Self {
            passed,
            failed,
            error,
        }
    }

    pub const fn total(&self) -> u32 {
        self.passed + self.failed + self.error
    }

    /// Whether anything failed or errored.
    pub const fn has_problems(&self) -> bool {
        self.failed > 0 || self.error > 0
    }
}

/// One structured per-test failure record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub test_id: String,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    /// Full traceback, when the executor captured one.
    #[serde(default)]
    pub long_repr: Option<String>,
}

impl Failure {
    pub fn new(test_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            source_file: None,
            line: None,
            message: Some(message.into()),
            long_repr: None,
        }
    }

    #[must_use]
    pub fn at(mut self, source_file: impl Into<String>, line: Option<u32>) -> Self {
        self.source_file = Some(source_file.into());
        self.line = line;
        self
    }

    /// Message, else traceback, else a fixed placeholder.
    pub fn display_message(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .or_else(|| self.long_repr.as_deref().filter(|r| !r.is_empty()))
            .unwrap_or(NO_FAILURE_DETAIL)
    }

    /// `file:line`, `file`, or the unknown-file placeholder.
    pub fn location(&self) -> String {
        match (self.source_file.as_deref(), self.line) {
            (Some(file), Some(line)) => format!("{file}:{line}"),
            (Some(file), None) => file.to_string(),
            (None, _) => UNKNOWN_SOURCE_FILE.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.test_id, self.location(), self.display_message())
    }
}

/// Structured outcome of a test run.
///
/// Failing tests are part of a result, not an execution error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionResult {
    pub score: f64,
    pub summary: TestSummary,
    pub failures: Vec<Failure>,
    pub raw_log: Vec<String>,
    pub test_file_handle: Option<String>,
}

impl ExecutionResult {
    /// Look up a failure by its test identifier.
    pub fn find_failure(&self, test_id: &str) -> Option<&Failure> {
        self.failures.iter().find(|f| f.test_id == test_id)
    }

    /// Raw log as one newline-joined block.
    pub fn raw_log_text(&self) -> String {
        self.raw_log.join("\n")
    }
}
