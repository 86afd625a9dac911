//! JSON shapes exchanged with the pipeline backend.
//!
//! The backend is loose about types (line numbers arrive as strings or
//! integers, logs as a string or an array) so decoding is lenient and every
//! DTO converts into a domain type in one place.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::errors::{BackendError, BackendResult};
use crate::domain::models::{
    DashboardStats, Diagnosis, Endpoint, ExecutionResult, Failure, GenerationReceipt,
    IngestionReport, RunRecord, TestHealReport, TestSummary,
};

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub base_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct HealTestRequest<'a> {
    pub test_file: &'a str,
    pub failure_logs: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DiagnoseRequest<'a> {
    pub source_file: Option<&'a str>,
    pub error_logs: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EndpointDto {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct IngestResponse {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub endpoints_data: Vec<EndpointDto>,
    #[serde(default)]
    pub upload_path: Option<String>,
}

impl From<IngestResponse> for IngestionReport {
    fn from(dto: IngestResponse) -> Self {
        Self {
            project_name: dto.project_name,
            endpoints: dto
                .endpoints_data
                .into_iter()
                .map(|e| Endpoint::new(e.method, e.path))
                .collect(),
            upload_path: dto.upload_path,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub test_file_path: Option<String>,
}

impl From<GenerateResponse> for GenerationReceipt {
    fn from(dto: GenerateResponse) -> Self {
        Self {
            test_file_path: dto.test_file_path.filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunTestsResponse {
    pub results: RunResults,
}

#[derive(Debug, Deserialize)]
pub struct RunResults {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reward: f64,
    #[serde(default)]
    pub summary: TestSummary,
    #[serde(default)]
    pub failures: Vec<FailureDto>,
    #[serde(default, deserialize_with = "lines_from_string_or_array")]
    pub logs: Vec<String>,
    #[serde(default)]
    pub test_file: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FailureDto {
    #[serde(default)]
    pub nodeid: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default, deserialize_with = "line_from_string_or_int")]
    pub line: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub longrepr: Option<String>,
}

impl From<FailureDto> for Failure {
    fn from(dto: FailureDto) -> Self {
        Self {
            test_id: dto.nodeid,
            source_file: dto.file.filter(|f| !f.is_empty()),
            line: dto.line,
            message: dto.message,
            long_repr: dto.longrepr,
        }
    }
}

impl From<RunTestsResponse> for ExecutionResult {
    /// The executor reports its own failures (missing test file, crashed
    /// runner) as `status: "error"` inside a 2xx body. That is still a
    /// result: the summary carries the error count and the logs are kept
    /// for triage, with the message leading them when the logs omit it.
    fn from(dto: RunTestsResponse) -> Self {
        let results = dto.results;
        let mut raw_log = results.logs;
        if results.status.as_deref() == Some("error") {
            if let Some(message) = results.message.filter(|m| !m.trim().is_empty()) {
                if !raw_log.iter().any(|line| line.contains(message.as_str())) {
                    raw_log.insert(0, message);
                }
            }
        }

        Self {
            score: results.reward,
            summary: results.summary,
            failures: results.failures.into_iter().map(Into::into).collect(),
            raw_log,
            test_file_handle: results.test_file,
        }
    }
}

/// Either `{status, message, fixed_code}` or an error marker.
#[derive(Debug, Deserialize)]
pub struct HealTestResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub fixed_code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TryFrom<HealTestResponse> for TestHealReport {
    type Error = BackendError;

    fn try_from(dto: HealTestResponse) -> BackendResult<Self> {
        if let Some(error) = dto.error {
            return Err(BackendError::Payload(error));
        }
        if dto.status.as_deref() == Some("error") {
            return Err(BackendError::Payload(dto.message.unwrap_or_default()));
        }
        match dto.fixed_code {
            Some(fixed_code) => Ok(Self {
                message: dto.message.unwrap_or_default(),
                fixed_code,
            }),
            None => Err(BackendError::Decode("missing fixed_code".to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiagnoseResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub analysis: Option<Diagnosis>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TryFrom<DiagnoseResponse> for Diagnosis {
    type Error = BackendError;

    fn try_from(dto: DiagnoseResponse) -> BackendResult<Self> {
        if let Some(error) = dto.error {
            return Err(BackendError::Payload(error));
        }
        if dto.status.as_deref() == Some("error") {
            return Err(BackendError::Payload(dto.message.unwrap_or_default()));
        }
        dto.analysis
            .ok_or_else(|| BackendError::Decode("missing analysis".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryEntryDto>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryEntryDto {
    pub status: crate::domain::models::RunStatus,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub reward: f64,
    #[serde(default)]
    pub summary: TestSummary,
    #[serde(default)]
    pub test_file: Option<String>,
}

impl From<HistoryEntryDto> for RunRecord {
    fn from(dto: HistoryEntryDto) -> Self {
        Self {
            status: dto.status,
            project_name: dto.project_name,
            timestamp: dto.timestamp,
            score: dto.reward,
            summary: dto.summary,
            test_file: dto.test_file,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatsResponse {
    pub total_runs: u64,
    pub passed_runs: u64,
    pub avg_reward: f64,
    pub active_projects: u64,
}

impl From<StatsResponse> for DashboardStats {
    fn from(dto: StatsResponse) -> Self {
        Self {
            total_runs: dto.total_runs,
            passed_runs: dto.passed_runs,
            avg_score: dto.avg_reward,
            active_projects: dto.active_projects,
        }
    }
}

fn lines_from_string_or_array<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Logs {
        Text(String),
        Lines(Vec<String>),
        Missing(()),
    }

    Ok(match Logs::deserialize(deserializer)? {
        Logs::Text(text) => text.lines().map(str::to_string).collect(),
        Logs::Lines(lines) => lines,
        Logs::Missing(()) => Vec::new(),
    })
}

fn line_from_string_or_int<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Line {
        Int(u32),
        Text(String),
        Missing(()),
    }

    Ok(match Line::deserialize(deserializer)? {
        Line::Int(n) => Some(n),
        Line::Text(s) => s.trim().parse().ok(),
        Line::Missing(()) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_results_accept_string_logs_and_string_lines() {
        let body = r#"{
            "status": "Execution Complete",
            "results": {
                "status": "failure",
                "reward": 0.66,
                "summary": {"passed": 2, "failed": 1, "error": 0},
                "failures": [{"nodeid": "test_api.py::test_orders", "file": "test_api.py", "line": "17", "message": "assert 500 == 201"}],
                "logs": "collected 3 items\n1 failed, 2 passed",
                "test_file": "tests/generated/test_shop.py"
            }
        }"#;
        let dto: RunTestsResponse = serde_json::from_str(body).unwrap();
        let result = ExecutionResult::from(dto);

        assert_eq!(result.summary, TestSummary::new(2, 1, 0));
        assert_eq!(result.failures[0].line, Some(17));
        assert_eq!(result.raw_log.len(), 2);
        assert_eq!(result.test_file_handle.as_deref(), Some("tests/generated/test_shop.py"));
    }

    #[test]
    fn test_run_results_accept_array_logs_and_null_line() {
        let body = r#"{"results": {"reward": 1.0, "logs": ["a", "b", "c"], "failures": [{"nodeid": "x", "line": null}]}}"#;
        let dto: RunTestsResponse = serde_json::from_str(body).unwrap();
        let result = ExecutionResult::from(dto);
        assert_eq!(result.raw_log, vec!["a", "b", "c"]);
        assert_eq!(result.failures[0].line, None);
    }

    #[test]
    fn test_run_results_error_status_is_still_a_result() {
        let body = r#"{"results": {"status": "error", "message": "Test file not found", "summary": {"passed": 0, "failed": 0, "error": 1}, "logs": "File does not exist.", "failures": []}}"#;
        let dto: RunTestsResponse = serde_json::from_str(body).unwrap();
        let result = ExecutionResult::from(dto);

        assert_eq!(result.summary, TestSummary::new(0, 0, 1));
        assert!(result.failures.is_empty());
        assert_eq!(result.raw_log, vec!["Test file not found", "File does not exist."]);
    }

    #[test]
    fn test_run_results_error_message_not_duplicated() {
        let body = r#"{"results": {"status": "error", "message": "pytest crashed", "logs": ["pytest crashed: exit code 4"]}}"#;
        let dto: RunTestsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(ExecutionResult::from(dto).raw_log, vec!["pytest crashed: exit code 4"]);
    }

    #[test]
    fn test_heal_response_error_marker() {
        let dto: HealTestResponse =
            serde_json::from_str(r#"{"status": "error", "message": "Healing failed: timeout"}"#).unwrap();
        assert!(matches!(
            TestHealReport::try_from(dto),
            Err(BackendError::Payload(m)) if m == "Healing failed: timeout"
        ));
    }

    #[test]
    fn test_diagnosis_accepts_structured_and_text() {
        let structured: DiagnoseResponse = serde_json::from_str(
            r#"{"status": "success", "analysis": {"explanation": "e", "recommendation": "r", "solution": "s"}}"#,
        )
        .unwrap();
        assert!(matches!(
            Diagnosis::try_from(structured).unwrap(),
            Diagnosis::Structured { .. }
        ));

        let text: DiagnoseResponse =
            serde_json::from_str(r#"{"analysis": "null check missing"}"#).unwrap();
        assert_eq!(
            Diagnosis::try_from(text).unwrap(),
            Diagnosis::Text("null check missing".to_string())
        );
    }

    #[test]
    fn test_partial_structured_diagnosis_decodes() {
        let dto: DiagnoseResponse = serde_json::from_str(
            r#"{"status": "diagnosed", "analysis": {"explanation": "null deref in checkout", "solution": "add guard"}}"#,
        )
        .unwrap();
        assert_eq!(
            Diagnosis::try_from(dto).unwrap(),
            Diagnosis::Structured {
                explanation: Some("null deref in checkout".to_string()),
                recommendation: None,
                solution: Some("add guard".to_string()),
            }
        );
    }

    #[test]
    fn test_history_maps_reward_to_score() {
        let dto: HistoryResponse = serde_json::from_str(
            r#"{"history": [{"status": "passed", "project_name": "shop.zip", "timestamp": "2024-05-01T10:00:00", "reward": 1.0}]}"#,
        )
        .unwrap();
        let records: Vec<RunRecord> = dto.history.into_iter().map(Into::into).collect();
        assert_eq!(records[0].score, 1.0);
    }
}
