//! Ingestion stage: project archive or remote repository to endpoint inventory.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::workflow_store::WorkflowStore;
use crate::domain::errors::{BackendResult, CoordinatorError};
use crate::domain::models::{
    GenerationStage, IngestionReport, RepositoryRequest, StageAxis, UploadFile, UploadStage,
    UserId,
};
use crate::domain::ports::PipelineBackend;
use crate::infrastructure::logging::redact;

pub struct UploadCoordinator {
    store: Arc<WorkflowStore>,
    backend: Arc<dyn PipelineBackend>,
}

impl UploadCoordinator {
    pub fn new(store: Arc<WorkflowStore>, backend: Arc<dyn PipelineBackend>) -> Self {
        Self { store, backend }
    }

    /// Upload a project archive.
    ///
    /// # Errors
    /// `StageBusy` if an ingestion is outstanding, `NotSignedIn` without an
    /// identity, `Ingestion` with the backend's message on failure.
    #[instrument(skip(self, file), fields(file_name = %file.file_name))]
    pub async fn ingest_file(&self, file: UploadFile) -> Result<IngestionReport, CoordinatorError> {
        let user = self.begin(None).await?;
        let result = self.backend.ingest_file(&user, file).await;
        self.finish(&user, result).await
    }

    /// Clone and scan a remote repository. The URL is remembered even when
    /// ingestion fails.
    #[instrument(skip(self, github_url, token), fields(github_url = %redact(&github_url), has_token = token.is_some()))]
    pub async fn ingest_repository(
        &self,
        github_url: String,
        token: Option<String>,
    ) -> Result<IngestionReport, CoordinatorError> {
        let user = self.begin(Some(github_url.clone())).await?;
        let request = RepositoryRequest {
            github_url,
            token: token.filter(|t| !t.trim().is_empty()),
        };
        let result = self.backend.ingest_repository(&user, request).await;
        self.finish(&user, result).await
    }

    async fn begin(&self, github_url: Option<String>) -> Result<UserId, CoordinatorError> {
        let (user, started) = self
            .store
            .patch_signed_in(|s| {
                if s.upload_stage.is_in_progress() {
                    return Err(CoordinatorError::StageBusy {
                        axis: StageAxis::Upload,
                        stage: s.upload_stage.to_string(),
                    });
                }
                s.upload_stage = UploadStage::Uploading;
                if let Some(url) = github_url {
                    s.github_url = url;
                }
                Ok(())
            })
            .await
            .ok_or(CoordinatorError::NotSignedIn)?;
        started?;
        Ok(user)
    }

    async fn finish(
        &self,
        user: &UserId,
        result: BackendResult<IngestionReport>,
    ) -> Result<IngestionReport, CoordinatorError> {
        match result {
            Ok(report) => {
                info!(
                    user_id = %user,
                    project = %report.project_name,
                    endpoints = report.endpoints.len(),
                    "ingestion succeeded"
                );
                let applied = report.clone();
                self.store
                    .patch_for(user, move |s| {
                        s.upload_stage = UploadStage::Success;
                        s.project_name = Some(applied.project_name);
                        s.endpoints = applied.endpoints;
                        s.upload_source_path = applied.upload_path;
                        if s.generation_stage.is_in_progress() {
                            warn!("generation already running; not requesting auto-generation");
                        } else {
                            s.generation_stage = GenerationStage::Idle;
                            s.auto_generate_requested = true;
                        }
                    })
                    .await;
                Ok(report)
            }
            Err(e) => {
                let message = e.message();
                warn!(user_id = %user, status = ?e.status(), error = %redact(&message), "ingestion failed");
                self.store
                    .patch_for(user, |s| s.upload_stage = UploadStage::Error)
                    .await;
                Err(CoordinatorError::Ingestion(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStateRepository;
    use crate::adapters::mock::{status_error, MockBackend, MockCall, MockOp};
    use crate::domain::models::WorkflowState;

    async fn setup() -> (Arc<WorkflowStore>, MockBackend, UploadCoordinator) {
        let store = Arc::new(WorkflowStore::new(
            Arc::new(InMemoryStateRepository::new()),
            WorkflowState::default(),
        ));
        store.on_identity_change(Some(UserId::new("alice").unwrap())).await;
        let backend = MockBackend::new();
        let coordinator = UploadCoordinator::new(store.clone(), Arc::new(backend.clone()));
        (store, backend, coordinator)
    }

    #[tokio::test]
    async fn test_file_ingestion_success_arms_auto_generate() {
        let (store, _backend, coordinator) = setup().await;

        let report = coordinator
            .ingest_file(UploadFile::new("shop.zip", b"PK".to_vec()))
            .await
            .unwrap();

        let state = store.read().await;
        assert_eq!(report.endpoints.len(), 3);
        assert_eq!(state.upload_stage, UploadStage::Success);
        assert_eq!(state.project_name.as_deref(), Some("shop.zip"));
        assert_eq!(state.endpoints, report.endpoints);
        assert!(state.upload_source_path.is_some());
        assert!(state.auto_generate_requested);
    }

    #[tokio::test]
    async fn test_ingestion_failure_sets_error_and_surfaces_message() {
        let (store, backend, coordinator) = setup().await;
        backend.push_ingestion(Err(status_error(500, "Not a zip archive"))).await;

        let err = coordinator
            .ingest_file(UploadFile::new("notes.txt", b"hi".to_vec()))
            .await
            .unwrap_err();

        assert_eq!(err, CoordinatorError::Ingestion("Not a zip archive".to_string()));
        let state = store.read().await;
        assert_eq!(state.upload_stage, UploadStage::Error);
        assert!(!state.auto_generate_requested);
    }

    #[tokio::test]
    async fn test_repository_ingestion_records_url() {
        let (store, backend, coordinator) = setup().await;

        coordinator
            .ingest_repository("https://github.com/acme/shop".to_string(), Some(" ".to_string()))
            .await
            .unwrap();

        assert_eq!(store.read().await.github_url, "https://github.com/acme/shop");
        assert_eq!(
            backend.calls().await,
            vec![MockCall::IngestRepository {
                user: "alice".to_string(),
                github_url: "https://github.com/acme/shop".to_string(),
                has_token: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_success_resets_quota_generation() {
        let (store, _backend, coordinator) = setup().await;
        store.patch(|s| s.generation_stage = GenerationStage::Quota).await;

        coordinator
            .ingest_file(UploadFile::new("shop.zip", Vec::new()))
            .await
            .unwrap();

        let state = store.read().await;
        assert_eq!(state.generation_stage, GenerationStage::Idle);
        assert!(state.auto_generate_ready());
    }

    #[tokio::test]
    async fn test_flag_not_raised_while_generating() {
        let (store, _backend, coordinator) = setup().await;
        store.patch(|s| s.generation_stage = GenerationStage::Generating).await;

        coordinator
            .ingest_file(UploadFile::new("shop.zip", Vec::new()))
            .await
            .unwrap();

        let state = store.read().await;
        assert_eq!(state.generation_stage, GenerationStage::Generating);
        assert!(!state.auto_generate_requested);
    }

    #[tokio::test]
    async fn test_busy_upload_is_rejected() {
        let (store, backend, coordinator) = setup().await;
        store.patch(|s| s.upload_stage = UploadStage::Uploading).await;

        let err = coordinator
            .ingest_file(UploadFile::new("shop.zip", Vec::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, CoordinatorError::StageBusy { axis: StageAxis::Upload, .. }));
        assert_eq!(backend.call_count(MockOp::IngestFile).await, 0);
    }

    #[tokio::test]
    async fn test_requires_identity() {
        let (store, _backend, coordinator) = setup().await;
        store.on_identity_change(None).await;

        let err = coordinator
            .ingest_file(UploadFile::new("shop.zip", Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err, CoordinatorError::NotSignedIn);
        assert_eq!(store.read().await.upload_stage, UploadStage::Idle);
    }
}
