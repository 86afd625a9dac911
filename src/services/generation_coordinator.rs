//! Test-generation stage and the auto-generate trigger.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::outcome::{classify_generation_result, GenerationOutcome};
use super::workflow_store::WorkflowStore;
use crate::domain::errors::CoordinatorError;
use crate::domain::models::{GenerationStage, StageAxis, UserId, WorkflowState};
use crate::domain::ports::PipelineBackend;

pub const LOG_INITIALIZING: &str = "Initializing agent";
pub const LOG_ANALYZING: &str = "Analyzing endpoints";

pub struct GenerationCoordinator {
    store: Arc<WorkflowStore>,
    backend: Arc<dyn PipelineBackend>,
}

impl GenerationCoordinator {
    pub fn new(store: Arc<WorkflowStore>, backend: Arc<dyn PipelineBackend>) -> Self {
        Self { store, backend }
    }

    /// Generate a suite against `base_url`.
    ///
    /// Remote failures are not errors: they come back as
    /// [`GenerationOutcome::Quota`] or [`GenerationOutcome::Error`] with the
    /// stage and log already updated.
    ///
    /// # Errors
    /// `StageBusy` while a generation is outstanding, `NotSignedIn` without
    /// an identity.
    pub async fn generate(&self, base_url: &str) -> Result<GenerationOutcome, CoordinatorError> {
        let requested = base_url.to_string();
        let (user, url) = self
            .begin(move |s| {
                if s.generation_stage.is_in_progress() {
                    return Err(CoordinatorError::StageBusy {
                        axis: StageAxis::Generation,
                        stage: s.generation_stage.to_string(),
                    });
                }
                Ok(Some(requested))
            })
            .await?
            .ok_or(CoordinatorError::NotSignedIn)?;
        Ok(self.call(&user, &url).await)
    }

    /// Consume the auto-generate signal.
    ///
    /// When the flag is set and the stage is idle, the flag is cleared and
    /// generation starts against the stored target in the same patch, so a
    /// second poll can never fire again for the same ingestion.
    pub async fn poll_auto_trigger(&self) -> Result<Option<GenerationOutcome>, CoordinatorError> {
        let started = self
            .begin(|s| {
                if s.auto_generate_ready() {
                    Ok(Some(s.target_base_url.clone()))
                } else {
                    Ok(None)
                }
            })
            .await;

        match started {
            Ok(Some((user, url))) => {
                info!(user_id = %user, target = %url, "auto-generation triggered");
                Ok(Some(self.call(&user, &url).await))
            }
            Ok(None) | Err(CoordinatorError::NotSignedIn) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Update the target forwarded to the generation backend.
    ///
    /// # Errors
    ///
    /// `NotSignedIn` without an identity; the state is left untouched.
    pub async fn set_target_base_url(&self, url: impl Into<String>) -> Result<(), CoordinatorError> {
        let url = url.into();
        self.store
            .patch_signed_in(move |s| s.target_base_url = url)
            .await
            .map(|_| ())
            .ok_or(CoordinatorError::NotSignedIn)
    }

    pub async fn clear_log(&self) {
        self.store.patch(|s| s.generation_log.clear()).await;
    }

    async fn begin<F>(&self, select: F) -> Result<Option<(UserId, String)>, CoordinatorError>
    where
        F: FnOnce(&WorkflowState) -> Result<Option<String>, CoordinatorError> + Send,
    {
        let (user, chosen) = self
            .store
            .patch_signed_in(|s| {
                let Some(url) = select(s)? else {
                    return Ok(None);
                };
                s.generation_stage = GenerationStage::Generating;
                s.auto_generate_requested = false;
                s.generation_log.push(LOG_INITIALIZING.to_string());
                s.generation_log.push(LOG_ANALYZING.to_string());
                Ok(Some(url))
            })
            .await
            .ok_or(CoordinatorError::NotSignedIn)?;
        Ok(chosen?.map(|url| (user, url)))
    }

    #[instrument(skip(self), fields(user_id = %user))]
    async fn call(&self, user: &UserId, target_base_url: &str) -> GenerationOutcome {
        let result = self.backend.generate_tests(user, target_base_url).await;
        let outcome = classify_generation_result(result);

        match &outcome {
            GenerationOutcome::Success { test_file_path } => {
                info!(test_file = ?test_file_path, "test generation succeeded");
            }
            GenerationOutcome::Quota { message } => {
                warn!(%message, "test generation hit the usage limit");
            }
            GenerationOutcome::Error { message } => {
                warn!(%message, "test generation failed");
            }
        }

        let stage = outcome.stage();
        let lines = outcome.log_lines();
        if self
            .store
            .patch_for(user, move |s| {
                s.generation_stage = stage;
                s.generation_log.extend(lines);
            })
            .await
            .is_none()
        {
            debug!("generation outcome discarded");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStateRepository;
    use crate::adapters::mock::{status_error, MockBackend, MockCall, MockOp};
    use crate::domain::errors::BackendError;
    use crate::domain::models::GenerationReceipt;

    async fn setup() -> (Arc<WorkflowStore>, MockBackend, GenerationCoordinator) {
        let store = Arc::new(WorkflowStore::new(
            Arc::new(InMemoryStateRepository::new()),
            WorkflowState::with_target_base_url("http://localhost:5000"),
        ));
        store.on_identity_change(Some(UserId::new("alice").unwrap())).await;
        let backend = MockBackend::new();
        let coordinator = GenerationCoordinator::new(store.clone(), Arc::new(backend.clone()));
        (store, backend, coordinator)
    }

    #[tokio::test]
    async fn test_generate_success_logs() {
        let (store, backend, coordinator) = setup().await;
        backend
            .push_generation(Ok(GenerationReceipt {
                test_file_path: Some("tests/generated/test_shop.py".to_string()),
            }))
            .await;

        let outcome = coordinator.generate("http://api.test").await.unwrap();

        assert_eq!(outcome.stage(), GenerationStage::Success);
        let state = store.read().await;
        assert_eq!(state.generation_stage, GenerationStage::Success);
        assert_eq!(
            state.generation_log,
            vec![
                LOG_INITIALIZING,
                LOG_ANALYZING,
                "Test suite generated successfully.",
                "File saved to: tests/generated/test_shop.py",
            ]
        );
        assert_eq!(
            backend.calls().await,
            vec![MockCall::Generate {
                user: "alice".to_string(),
                target_base_url: "http://api.test".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_429_yields_quota() {
        let (store, backend, coordinator) = setup().await;
        backend.push_generation(Err(status_error(429, "Rate limit reached"))).await;

        coordinator.generate("http://api.test").await.unwrap();

        let state = store.read().await;
        assert_eq!(state.generation_stage, GenerationStage::Quota);
        assert!(!state.generation_stage.allows_retry());
        assert_eq!(state.generation_log.last().map(String::as_str), Some("Error: Rate limit reached"));
    }

    #[tokio::test]
    async fn test_other_failure_yields_error_with_detail() {
        let (store, backend, coordinator) = setup().await;
        backend
            .push_generation(Err(status_error(400, "No endpoints found. Please upload project first.")))
            .await;

        coordinator.generate("http://api.test").await.unwrap();

        let state = store.read().await;
        assert_eq!(state.generation_stage, GenerationStage::Error);
        assert_eq!(
            state.generation_log.last().map(String::as_str),
            Some("Error: No endpoints found. Please upload project first.")
        );
    }

    #[tokio::test]
    async fn test_transport_failure_yields_error() {
        let (store, backend, coordinator) = setup().await;
        backend
            .push_generation(Err(BackendError::Transport("connection refused".to_string())))
            .await;

        coordinator.generate("http://api.test").await.unwrap();
        assert_eq!(store.read().await.generation_stage, GenerationStage::Error);
    }

    #[tokio::test]
    async fn test_auto_trigger_fires_once() {
        let (store, backend, coordinator) = setup().await;
        store.patch(|s| s.auto_generate_requested = true).await;

        assert!(coordinator.poll_auto_trigger().await.unwrap().is_some());
        assert!(coordinator.poll_auto_trigger().await.unwrap().is_none());

        let state = store.read().await;
        assert!(!state.auto_generate_requested);
        assert_eq!(backend.call_count(MockOp::Generate).await, 1);
        assert_eq!(
            backend.calls().await,
            vec![MockCall::Generate {
                user: "alice".to_string(),
                target_base_url: "http://localhost:5000".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_auto_trigger_waits_for_idle() {
        let (store, backend, coordinator) = setup().await;
        store
            .patch(|s| {
                s.auto_generate_requested = true;
                s.generation_stage = GenerationStage::Success;
            })
            .await;

        assert!(coordinator.poll_auto_trigger().await.unwrap().is_none());
        assert!(store.read().await.auto_generate_requested);
        assert_eq!(backend.call_count(MockOp::Generate).await, 0);
    }

    #[tokio::test]
    async fn test_busy_generation_is_rejected() {
        let (store, backend, coordinator) = setup().await;
        store.patch(|s| s.generation_stage = GenerationStage::Generating).await;

        let err = coordinator.generate("http://api.test").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::StageBusy { axis: StageAxis::Generation, .. }));
        assert_eq!(backend.call_count(MockOp::Generate).await, 0);
    }

    #[tokio::test]
    async fn test_outcome_after_sign_out_is_discarded() {
        let (store, backend, coordinator) = setup().await;
        let gate = backend.gate(MockOp::Generate).await;
        let coordinator = Arc::new(coordinator);

        let task = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.generate("http://api.test").await })
        };
        while backend.call_count(MockOp::Generate).await == 0 {
            tokio::task::yield_now().await;
        }
        store.on_identity_change(None).await;
        gate.notify_one();
        task.await.unwrap().unwrap();

        assert_eq!(store.read().await, WorkflowState::with_target_base_url("http://localhost:5000"));
    }

    #[tokio::test]
    async fn test_clear_log_and_set_target() {
        let (store, _backend, coordinator) = setup().await;
        coordinator.generate("http://api.test").await.unwrap();
        coordinator.clear_log().await;
        coordinator.set_target_base_url("http://staging:8080").await.unwrap();

        let state = store.read().await;
        assert!(state.generation_log.is_empty());
        assert_eq!(state.target_base_url, "http://staging:8080");
    }
}
