//! Test-execution stage.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::workflow_store::WorkflowStore;
use crate::domain::errors::CoordinatorError;
use crate::domain::models::{ExecutionResult, ExecutionStage, StageAxis};
use crate::domain::ports::PipelineBackend;

pub const LOG_INITIALIZING: &str = "Initializing executor";
pub const LOG_LOADING: &str = "Loading suite";

/// How a test run ended. Failing tests are a `Completed` result, not a
/// failure: `Failed` means the run itself could not be carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed(ExecutionResult),
    Failed { message: String },
}

impl ExecutionOutcome {
    pub const fn stage(&self) -> ExecutionStage {
        match self {
            Self::Completed(_) => ExecutionStage::Success,
            Self::Failed { .. } => ExecutionStage::Error,
        }
    }
}

/// Drives test runs. The console log lives here rather than in the
/// persisted state and is cleared at the start of every run.
pub struct ExecutionCoordinator {
    store: Arc<WorkflowStore>,
    backend: Arc<dyn PipelineBackend>,
    console: Mutex<Vec<String>>,
}

impl ExecutionCoordinator {
    pub fn new(store: Arc<WorkflowStore>, backend: Arc<dyn PipelineBackend>) -> Self {
        Self {
            store,
            backend,
            console: Mutex::new(Vec::new()),
        }
    }

    /// Run the generated suite. Always re-runnable from a rest state.
    ///
    /// # Errors
    /// `StageBusy` while a run is outstanding, `NotSignedIn` without an
    /// identity.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ExecutionOutcome, CoordinatorError> {
        let (user, started) = self
            .store
            .patch_signed_in(|s| {
                if s.execution_stage.is_in_progress() {
                    return Err(CoordinatorError::StageBusy {
                        axis: StageAxis::Execution,
                        stage: s.execution_stage.to_string(),
                    });
                }
                s.execution_stage = ExecutionStage::Running;
                Ok(())
            })
            .await
            .ok_or(CoordinatorError::NotSignedIn)?;
        started?;

        {
            let mut console = self.console.lock().await;
            console.clear();
            console.push(LOG_INITIALIZING.to_string());
            console.push(LOG_LOADING.to_string());
        }

        let outcome = match self.backend.run_tests(&user).await {
            Ok(result) => {
                info!(
                    user_id = %user,
                    score = result.score,
                    passed = result.summary.passed,
                    failed = result.summary.failed,
                    errors = result.summary.error,
                    "test run finished"
                );
                self.console
                    .lock()
                    .await
                    .push(format!("Execution finished. Score: {}", result.score));
                ExecutionOutcome::Completed(result)
            }
            Err(e) => {
                let message = e.message();
                warn!(user_id = %user, status = ?e.status(), %message, "test run failed");
                self.console
                    .lock()
                    .await
                    .push(format!("Execution error: {message}"));
                ExecutionOutcome::Failed { message }
            }
        };

        let stage = outcome.stage();
        let result = match &outcome {
            ExecutionOutcome::Completed(result) => Some(result.clone()),
            ExecutionOutcome::Failed { .. } => None,
        };
        self.store
            .patch_for(&user, move |s| {
                s.execution_stage = stage;
                if let Some(result) = result {
                    s.last_execution_result = Some(result);
                }
            })
            .await;

        Ok(outcome)
    }

    /// Console lines of the current or most recent run.
    pub async fn console_log(&self) -> Vec<String> {
        self.console.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStateRepository;
    use crate::adapters::mock::{status_error, MockBackend, MockOp};
    use crate::domain::models::{TestSummary, UserId, WorkflowState};

    async fn setup() -> (Arc<WorkflowStore>, MockBackend, ExecutionCoordinator) {
        let store = Arc::new(WorkflowStore::new(
            Arc::new(InMemoryStateRepository::new()),
            WorkflowState::default(),
        ));
        store.on_identity_change(Some(UserId::new("alice").unwrap())).await;
        let backend = MockBackend::new();
        let coordinator = ExecutionCoordinator::new(store.clone(), Arc::new(backend.clone()));
        (store, backend, coordinator)
    }

    #[tokio::test]
    async fn test_run_success_stores_result() {
        let (store, _backend, coordinator) = setup().await;

        let outcome = coordinator.run().await.unwrap();

        let ExecutionOutcome::Completed(result) = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(result.summary, TestSummary::new(2, 1, 0));
        let state = store.read().await;
        assert_eq!(state.execution_stage, ExecutionStage::Success);
        assert_eq!(state.last_execution_result, Some(result.clone()));

        let console = coordinator.console_log().await;
        assert_eq!(console[0], LOG_INITIALIZING);
        assert_eq!(console[1], LOG_LOADING);
        assert_eq!(console[2], format!("Execution finished. Score: {}", result.score));
    }

    #[tokio::test]
    async fn test_run_failure_keeps_previous_result() {
        let (store, backend, coordinator) = setup().await;
        coordinator.run().await.unwrap();
        backend
            .push_run(Err(status_error(400, "No test file found. Please generate tests first.")))
            .await;

        let outcome = coordinator.run().await.unwrap();

        assert_eq!(outcome.stage(), ExecutionStage::Error);
        let state = store.read().await;
        assert_eq!(state.execution_stage, ExecutionStage::Error);
        assert!(state.last_execution_result.is_some());
        assert_eq!(
            coordinator.console_log().await,
            vec![
                LOG_INITIALIZING,
                LOG_LOADING,
                "Execution error: No test file found. Please generate tests first.",
            ]
        );
    }

    #[tokio::test]
    async fn test_rerun_from_terminal_states() {
        let (_store, backend, coordinator) = setup().await;
        coordinator.run().await.unwrap();
        coordinator.run().await.unwrap();
        assert_eq!(backend.call_count(MockOp::Run).await, 2);
    }

    #[tokio::test]
    async fn test_busy_run_is_rejected() {
        let (store, backend, coordinator) = setup().await;
        store.patch(|s| s.execution_stage = ExecutionStage::Running).await;

        assert!(matches!(
            coordinator.run().await,
            Err(CoordinatorError::StageBusy { axis: StageAxis::Execution, .. })
        ));
        assert_eq!(backend.call_count(MockOp::Run).await, 0);
    }
}
