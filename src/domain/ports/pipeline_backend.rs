/// Pipeline backend port (trait) for dependency injection.
///
/// The remote service that ingests projects, generates test suites, runs
/// them, heals failures and reports run history. Every call carries the
/// signed-in user's identity.
use crate::domain::errors::BackendResult;
use crate::domain::models::{
    DashboardStats, Diagnosis, ExecutionResult, GenerationReceipt, IngestionReport,
    RepositoryRequest, RunRecord, TestHealReport, UploadFile, UserId,
};
use async_trait::async_trait;

#[async_trait]
pub trait PipelineBackend: Send + Sync {
    /// Uploads a project archive and returns the discovered endpoints.
    ///
    /// # Errors
    /// Returns error on transport failure, non-2xx status or an
    /// undecodable body.
    async fn ingest_file(&self, user: &UserId, file: UploadFile) -> BackendResult<IngestionReport>;

    /// Clones a remote repository and returns the discovered endpoints.
    async fn ingest_repository(
        &self,
        user: &UserId,
        request: RepositoryRequest,
    ) -> BackendResult<IngestionReport>;

    /// Generates a test suite against `target_base_url`.
    ///
    /// A usage-limit rejection surfaces as `BackendError::Status` with 429.
    async fn generate_tests(
        &self,
        user: &UserId,
        target_base_url: &str,
    ) -> BackendResult<GenerationReceipt>;

    /// Runs the most recently generated suite.
    async fn run_tests(&self, user: &UserId) -> BackendResult<ExecutionResult>;

    /// Asks the backend to repair a generated test file.
    async fn heal_test(
        &self,
        user: &UserId,
        test_file: &str,
        failure_logs: &str,
    ) -> BackendResult<TestHealReport>;

    /// Asks the backend to diagnose application code from failure evidence.
    async fn diagnose_code(
        &self,
        user: &UserId,
        source_file: Option<&str>,
        error_logs: &str,
    ) -> BackendResult<Diagnosis>;

    /// Historical runs, in backend order.
    async fn get_history(&self, user: &UserId) -> BackendResult<Vec<RunRecord>>;

    async fn get_dashboard_stats(&self, user: &UserId) -> BackendResult<DashboardStats>;

    /// Ends the backend session for `user`.
    async fn logout(&self, user: &UserId) -> BackendResult<()>;
}
