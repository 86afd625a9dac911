//! Scripted pipeline backend for tests and `--offline` sessions.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use crate::domain::errors::{BackendError, BackendResult};
use crate::domain::models::{
    DashboardStats, Diagnosis, Endpoint, ExecutionResult, Failure, GenerationReceipt,
    IngestionReport, RepositoryRequest, RunRecord, RunStatus, TestHealReport, TestSummary,
    UploadFile, UserId,
};
use crate::domain::ports::PipelineBackend;

/// Backend operations, used to script responses and gate calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    IngestFile,
    IngestRepository,
    Generate,
    Run,
    HealTest,
    Diagnose,
    History,
    Stats,
    Logout,
}

/// A call observed by the mock, with the arguments that matter to tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    IngestFile { user: String, file_name: String },
    IngestRepository { user: String, github_url: String, has_token: bool },
    Generate { user: String, target_base_url: String },
    Run { user: String },
    HealTest { user: String, test_file: String, failure_logs: String },
    Diagnose { user: String, source_file: Option<String>, error_logs: String },
    History { user: String },
    Stats { user: String },
    Logout { user: String },
}

impl MockCall {
    pub const fn op(&self) -> MockOp {
        match self {
            Self::IngestFile { .. } => MockOp::IngestFile,
            Self::IngestRepository { .. } => MockOp::IngestRepository,
            Self::Generate { .. } => MockOp::Generate,
            Self::Run { .. } => MockOp::Run,
            Self::HealTest { .. } => MockOp::HealTest,
            Self::Diagnose { .. } => MockOp::Diagnose,
            Self::History { .. } => MockOp::History,
            Self::Stats { .. } => MockOp::Stats,
            Self::Logout { .. } => MockOp::Logout,
        }
    }
}

#[derive(Default)]
struct Script {
    ingestions: VecDeque<BackendResult<IngestionReport>>,
    generations: VecDeque<BackendResult<GenerationReceipt>>,
    runs: VecDeque<BackendResult<ExecutionResult>>,
    heals: VecDeque<BackendResult<TestHealReport>>,
    diagnoses: VecDeque<BackendResult<Diagnosis>>,
    histories: VecDeque<BackendResult<Vec<RunRecord>>>,
    stats: VecDeque<BackendResult<DashboardStats>>,
}

/// Pipeline backend that answers from per-operation queues.
///
/// An empty queue falls back to a demo response: a three-endpoint shop
/// project whose suite passes two tests and fails one.
#[derive(Clone, Default)]
pub struct MockBackend {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    gates: Arc<Mutex<HashMap<MockOp, Arc<Notify>>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_ingestion(&self, response: BackendResult<IngestionReport>) {
        self.script.lock().await.ingestions.push_back(response);
    }

    pub async fn push_generation(&self, response: BackendResult<GenerationReceipt>) {
        self.script.lock().await.generations.push_back(response);
    }

    pub async fn push_run(&self, response: BackendResult<ExecutionResult>) {
        self.script.lock().await.runs.push_back(response);
    }

    pub async fn push_heal(&self, response: BackendResult<TestHealReport>) {
        self.script.lock().await.heals.push_back(response);
    }

    pub async fn push_diagnosis(&self, response: BackendResult<Diagnosis>) {
        self.script.lock().await.diagnoses.push_back(response);
    }

    pub async fn push_history(&self, response: BackendResult<Vec<RunRecord>>) {
        self.script.lock().await.histories.push_back(response);
    }

    pub async fn push_stats(&self, response: BackendResult<DashboardStats>) {
        self.script.lock().await.stats.push_back(response);
    }

    /// Hold calls to `op` until the returned handle is notified.
    ///
    /// Each `notify_one` releases one call, before or after it arrives.
    pub async fn gate(&self, op: MockOp) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().await.insert(op, Arc::clone(&notify));
        notify
    }

    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self, op: MockOp) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.op() == op)
            .count()
    }

    async fn record(&self, call: MockCall) {
        let op = call.op();
        self.calls.lock().await.push(call);
        let gate = self.gates.lock().await.get(&op).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    /// Demo ingestion report.
    pub fn demo_ingestion(project_name: &str) -> IngestionReport {
        IngestionReport {
            project_name: project_name.to_string(),
            endpoints: vec![
                Endpoint::new("GET", "/api/products"),
                Endpoint::new("POST", "/api/orders"),
                Endpoint::new("GET", "/api/orders/:id"),
            ],
            upload_path: Some(format!("storage/uploads/{project_name}")),
        }
    }

    /// Demo run: two passes, one failure.
    pub fn demo_execution() -> ExecutionResult {
        ExecutionResult {
            score: -3.0,
            summary: TestSummary::new(2, 1, 0),
            failures: vec![Failure::new(
                "tests/generated/test_shop.py::test_create_order",
                "assert 500 == 201",
            )
            .at("tests/generated/test_shop.py", Some(27))],
            raw_log: vec![
                "collected 3 items".to_string(),
                "tests/generated/test_shop.py ..F".to_string(),
                "1 failed, 2 passed".to_string(),
            ],
            test_file_handle: Some("tests/generated/test_shop.py".to_string()),
        }
    }
}

#[async_trait]
impl PipelineBackend for MockBackend {
    async fn ingest_file(&self, user: &UserId, file: UploadFile) -> BackendResult<IngestionReport> {
        self.record(MockCall::IngestFile {
            user: user.to_string(),
            file_name: file.file_name.clone(),
        })
        .await;
        let scripted = self.script.lock().await.ingestions.pop_front();
        scripted.unwrap_or_else(|| Ok(Self::demo_ingestion(&file.file_name)))
    }

    async fn ingest_repository(
        &self,
        user: &UserId,
        request: RepositoryRequest,
    ) -> BackendResult<IngestionReport> {
        self.record(MockCall::IngestRepository {
            user: user.to_string(),
            github_url: request.github_url.clone(),
            has_token: request.token.is_some(),
        })
        .await;
        let scripted = self.script.lock().await.ingestions.pop_front();
        scripted.unwrap_or_else(|| {
            let repo = request
                .github_url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or("repository")
                .trim_end_matches(".git")
                .to_string();
            Ok(Self::demo_ingestion(&format!("{repo}.zip")))
        })
    }

    async fn generate_tests(
        &self,
        user: &UserId,
        target_base_url: &str,
    ) -> BackendResult<GenerationReceipt> {
        self.record(MockCall::Generate {
            user: user.to_string(),
            target_base_url: target_base_url.to_string(),
        })
        .await;
        let scripted = self.script.lock().await.generations.pop_front();
        scripted.unwrap_or_else(|| {
            Ok(GenerationReceipt {
                test_file_path: Some("tests/generated/test_shop.py".to_string()),
            })
        })
    }

    async fn run_tests(&self, user: &UserId) -> BackendResult<ExecutionResult> {
        self.record(MockCall::Run {
            user: user.to_string(),
        })
        .await;
        let scripted = self.script.lock().await.runs.pop_front();
        scripted.unwrap_or_else(|| Ok(Self::demo_execution()))
    }

    async fn heal_test(
        &self,
        user: &UserId,
        test_file: &str,
        failure_logs: &str,
    ) -> BackendResult<TestHealReport> {
        self.record(MockCall::HealTest {
            user: user.to_string(),
            test_file: test_file.to_string(),
            failure_logs: failure_logs.to_string(),
        })
        .await;
        let scripted = self.script.lock().await.heals.pop_front();
        scripted.unwrap_or_else(|| {
            Ok(TestHealReport {
                message: "Test healed successfully".to_string(),
                fixed_code: "def test_create_order(client):\n    assert client.post('/api/orders').status_code in (201, 500)\n".to_string(),
            })
        })
    }

    async fn diagnose_code(
        &self,
        user: &UserId,
        source_file: Option<&str>,
        error_logs: &str,
    ) -> BackendResult<Diagnosis> {
        self.record(MockCall::Diagnose {
            user: user.to_string(),
            source_file: source_file.map(str::to_string),
            error_logs: error_logs.to_string(),
        })
        .await;
        let scripted = self.script.lock().await.diagnoses.pop_front();
        scripted.unwrap_or_else(|| {
            Ok(Diagnosis::Structured {
                explanation: Some("The order handler dereferences a missing customer record.".to_string()),
                recommendation: Some("Validate the customer before creating the order.".to_string()),
                solution: Some("if (!customer) return res.status(400).json({ error: 'unknown customer' });".to_string()),
            })
        })
    }

    async fn get_history(&self, user: &UserId) -> BackendResult<Vec<RunRecord>> {
        self.record(MockCall::History {
            user: user.to_string(),
        })
        .await;
        let scripted = self.script.lock().await.histories.pop_front();
        scripted.unwrap_or_else(|| {
            Ok(vec![RunRecord {
                status: RunStatus::Failed,
                project_name: "shop.zip".to_string(),
                timestamp: "2024-05-01T10:00:00".to_string(),
                score: -3.0,
                summary: TestSummary::new(2, 1, 0),
                test_file: Some("tests/generated/test_shop.py".to_string()),
            }])
        })
    }

    async fn get_dashboard_stats(&self, user: &UserId) -> BackendResult<DashboardStats> {
        self.record(MockCall::Stats {
            user: user.to_string(),
        })
        .await;
        let scripted = self.script.lock().await.stats.pop_front();
        scripted.unwrap_or_else(|| {
            Ok(DashboardStats {
                total_runs: 1,
                passed_runs: 0,
                avg_score: -3.0,
                active_projects: 1,
            })
        })
    }

    async fn logout(&self, user: &UserId) -> BackendResult<()> {
        self.record(MockCall::Logout {
            user: user.to_string(),
        })
        .await;
        Ok(())
    }
}

/// Shorthand for a scripted HTTP failure.
pub fn status_error(status: u16, detail: &str) -> BackendError {
    BackendError::from_status(status, serde_json::json!({ "detail": detail }).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_are_consumed_in_order() {
        let backend = MockBackend::new();
        let user = UserId::new("alice").unwrap();
        backend.push_generation(Err(status_error(429, "quota"))).await;

        assert!(backend.generate_tests(&user, "http://x").await.unwrap_err().is_quota());
        assert!(backend.generate_tests(&user, "http://x").await.is_ok());
        assert_eq!(backend.call_count(MockOp::Generate).await, 2);
    }

    #[tokio::test]
    async fn test_repository_name_derived_from_url() {
        let backend = MockBackend::new();
        let user = UserId::new("alice").unwrap();
        let report = backend
            .ingest_repository(
                &user,
                RepositoryRequest {
                    github_url: "https://github.com/acme/shop.git".to_string(),
                    token: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(report.project_name, "shop.zip");
    }
}
