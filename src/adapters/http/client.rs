//! reqwest implementation of the PipelineBackend port.

use async_trait::async_trait;
use reqwest::{header, multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::wire::{
    DiagnoseRequest, DiagnoseResponse, GenerateRequest, GenerateResponse, HealTestRequest,
    HealTestResponse, HistoryResponse, IngestResponse, RunTestsResponse, StatsResponse,
};
use crate::domain::errors::{BackendError, BackendResult};
use crate::domain::models::{
    BackendConfig, DashboardStats, Diagnosis, ExecutionResult, GenerationReceipt,
    IngestionReport, RepositoryRequest, RunRecord, TestHealReport, UploadFile, UserId,
};
use crate::domain::ports::PipelineBackend;

/// Header carrying the signed-in identity on every request.
pub const USER_ID_HEADER: &str = "X-User-ID";

/// HTTP client for the remote pipeline service.
///
/// No retries: a failed call is classified once and surfaced to the user,
/// who decides whether to try again.
#[derive(Debug, Clone)]
pub struct HttpPipelineBackend {
    client: Client,
    base_url: String,
}

impl HttpPipelineBackend {
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let mut builder = Client::builder().pool_max_idle_per_host(4);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        debug!(base_url = %config.base_url, timeout_secs = ?config.timeout_secs, "pipeline backend client ready");

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post(&self, user: &UserId, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header(USER_ID_HEADER, user.as_str())
    }

    fn get(&self, user: &UserId, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .header(USER_ID_HEADER, user.as_str())
            .header(header::ACCEPT, "application/json")
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> BackendResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "backend rejected request");
            return Err(BackendError::from_status(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PipelineBackend for HttpPipelineBackend {
    #[instrument(skip(self, file), fields(file_name = %file.file_name, bytes = file.bytes.len()))]
    async fn ingest_file(&self, user: &UserId, file: UploadFile) -> BackendResult<IngestionReport> {
        let part = multipart::Part::bytes(file.bytes).file_name(file.file_name);
        let form = multipart::Form::new().part("file", part);

        let dto: IngestResponse = Self::send(self.post(user, "/upload").multipart(form)).await?;
        Ok(dto.into())
    }

    #[instrument(skip(self, request), fields(github_url = %request.github_url))]
    async fn ingest_repository(
        &self,
        user: &UserId,
        request: RepositoryRequest,
    ) -> BackendResult<IngestionReport> {
        let dto: IngestResponse =
            Self::send(self.post(user, "/process-github").json(&request)).await?;
        Ok(dto.into())
    }

    #[instrument(skip(self))]
    async fn generate_tests(
        &self,
        user: &UserId,
        target_base_url: &str,
    ) -> BackendResult<GenerationReceipt> {
        let body = GenerateRequest {
            base_url: target_base_url,
        };
        let dto: GenerateResponse =
            Self::send(self.post(user, "/generate-tests").json(&body)).await?;
        Ok(dto.into())
    }

    #[instrument(skip(self))]
    async fn run_tests(&self, user: &UserId) -> BackendResult<ExecutionResult> {
        let dto: RunTestsResponse =
            Self::send(self.post(user, "/run-tests").json(&serde_json::json!({}))).await?;
        Ok(dto.into())
    }

    #[instrument(skip(self, failure_logs), fields(log_len = failure_logs.len()))]
    async fn heal_test(
        &self,
        user: &UserId,
        test_file: &str,
        failure_logs: &str,
    ) -> BackendResult<TestHealReport> {
        let body = HealTestRequest {
            test_file,
            failure_logs,
        };
        let dto: HealTestResponse = Self::send(self.post(user, "/heal-test").json(&body)).await?;
        TestHealReport::try_from(dto)
    }

    #[instrument(skip(self, error_logs), fields(log_len = error_logs.len()))]
    async fn diagnose_code(
        &self,
        user: &UserId,
        source_file: Option<&str>,
        error_logs: &str,
    ) -> BackendResult<Diagnosis> {
        let body = DiagnoseRequest {
            source_file,
            error_logs,
        };
        let dto: DiagnoseResponse =
            Self::send(self.post(user, "/diagnose-code").json(&body)).await?;
        Diagnosis::try_from(dto)
    }

    #[instrument(skip(self))]
    async fn get_history(&self, user: &UserId) -> BackendResult<Vec<RunRecord>> {
        let dto: HistoryResponse = Self::send(self.get(user, "/history")).await?;
        Ok(dto.history.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn get_dashboard_stats(&self, user: &UserId) -> BackendResult<DashboardStats> {
        let dto: StatsResponse = Self::send(self.get(user, "/dashboard-stats")).await?;
        Ok(dto.into())
    }

    #[instrument(skip(self))]
    async fn logout(&self, user: &UserId) -> BackendResult<()> {
        let response = self
            .post(user, "/logout")
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::from_status(status.as_u16(), body))
    }
}
