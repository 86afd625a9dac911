//! Pipeline facade wiring the workflow store and the stage coordinators.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::CoordinatorError;
use crate::domain::models::{
    HealingRequest, HealingScope, IngestionReport, StageAxis, UploadFile, UserId, WorkflowState,
};
use crate::domain::ports::{PipelineBackend, WorkflowStateRepository};
use crate::services::{
    triage, ExecutionCoordinator, ExecutionOutcome, GenerationCoordinator, GenerationOutcome,
    HealingCoordinator, HealingOutcome, InsightsService, TriageView, UploadCoordinator,
    WorkflowStore,
};

/// Wires the workflow store and every coordinator around one backend.
///
/// The pipeline is the scheduler: [`Pipeline::tick`] consumes the one-shot
/// auto-generate signal raised by ingestion, and [`Pipeline::heal_selected`]
/// plus [`Pipeline::retest`] close the heal→retest loop. Continuations
/// always read a fresh snapshot from the store rather than reusing one
/// captured before a remote call.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use apiheal::adapters::memory::InMemoryStateRepository;
/// use apiheal::adapters::mock::MockBackend;
/// use apiheal::application::Pipeline;
/// use apiheal::domain::models::{UploadFile, UserId, WorkflowState};
///
/// # async fn example() -> anyhow::Result<()> {
/// let pipeline = Pipeline::new(
///     Arc::new(InMemoryStateRepository::new()),
///     Arc::new(MockBackend::new()),
///     WorkflowState::default(),
/// );
/// pipeline.sign_in(UserId::new("alice")?).await;
/// pipeline.ingest_file(UploadFile::new("shop.zip", Vec::new())).await?;
/// pipeline.tick().await?;
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    store: Arc<WorkflowStore>,
    backend: Arc<dyn PipelineBackend>,
    upload: UploadCoordinator,
    generation: GenerationCoordinator,
    execution: ExecutionCoordinator,
    healing: HealingCoordinator,
    insights: InsightsService,
}

impl Pipeline {
    pub fn new(
        repository: Arc<dyn WorkflowStateRepository>,
        backend: Arc<dyn PipelineBackend>,
        defaults: WorkflowState,
    ) -> Self {
        let store = Arc::new(WorkflowStore::new(repository, defaults));
        Self {
            upload: UploadCoordinator::new(store.clone(), backend.clone()),
            generation: GenerationCoordinator::new(store.clone(), backend.clone()),
            execution: ExecutionCoordinator::new(store.clone(), backend.clone()),
            healing: HealingCoordinator::new(store.clone(), backend.clone()),
            insights: InsightsService::new(store.clone(), backend.clone()),
            store,
            backend,
        }
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    pub const fn generation(&self) -> &GenerationCoordinator {
        &self.generation
    }

    pub const fn execution(&self) -> &ExecutionCoordinator {
        &self.execution
    }

    pub const fn insights(&self) -> &InsightsService {
        &self.insights
    }

    pub async fn state(&self) -> WorkflowState {
        self.store.read().await
    }

    pub async fn sign_in(&self, user: UserId) {
        self.store.on_identity_change(Some(user)).await;
    }

    /// Settle stages a previous process left in progress.
    ///
    /// A rehydrated `generating` or `running` stage has no outstanding call
    /// behind it and would reject every new start. Call once after
    /// [`Pipeline::sign_in`], before any other operation.
    pub async fn recover_interrupted(&self) -> Vec<StageAxis> {
        let settled = self.store.patch(WorkflowState::settle_interrupted).await;
        if !settled.is_empty() {
            warn!(axes = ?settled, "settled stages left in progress by an earlier session");
        }
        settled
    }

    /// End the backend session (best effort) and clear local state.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        if let Some(user) = self.store.identity().await {
            if let Err(e) = self.backend.logout(&user).await {
                warn!(user_id = %user, error = %e.message(), "backend logout failed");
            }
        }
        self.store.on_identity_change(None).await;
    }

    pub async fn ingest_file(&self, file: UploadFile) -> Result<IngestionReport, CoordinatorError> {
        self.upload.ingest_file(file).await
    }

    pub async fn ingest_repository(
        &self,
        github_url: String,
        token: Option<String>,
    ) -> Result<IngestionReport, CoordinatorError> {
        self.upload.ingest_repository(github_url, token).await
    }

    /// Process the pending auto-generate signal, if any.
    pub async fn tick(&self) -> Result<Option<GenerationOutcome>, CoordinatorError> {
        self.generation.poll_auto_trigger().await
    }

    /// Generate against `base_url`, remembering it as the new target, or
    /// against the stored target when `None`.
    pub async fn generate(&self, base_url: Option<String>) -> Result<GenerationOutcome, CoordinatorError> {
        if let Some(url) = base_url {
            self.generation.set_target_base_url(url).await?;
        }
        let target = self.store.read().await.target_base_url;
        self.generation.generate(&target).await
    }

    pub async fn run_tests(&self) -> Result<ExecutionOutcome, CoordinatorError> {
        self.execution.run().await
    }

    /// Triage the latest execution result.
    pub async fn triage(&self) -> Result<TriageView, CoordinatorError> {
        let state = self.store.read().await;
        let result = state
            .last_execution_result
            .as_ref()
            .ok_or(CoordinatorError::NoExecutionResult)?;
        Ok(triage(result))
    }

    /// Heal against the latest execution result.
    ///
    /// For scope `test`, `failure` narrows the evidence to one test id;
    /// otherwise every failure is sent. A run with no structured failures
    /// sends its triage raw log instead of an empty list. Code diagnosis
    /// always uses the raw log.
    pub async fn heal_selected(
        &self,
        scope: HealingScope,
        failure: Option<&str>,
    ) -> Result<HealingOutcome, CoordinatorError> {
        let state = self.store.read().await;
        let result = state
            .last_execution_result
            .as_ref()
            .ok_or(CoordinatorError::NoExecutionResult)?;

        let request = match scope {
            HealingScope::Test => {
                let selected = failure
                    .map(|id| {
                        result
                            .find_failure(id)
                            .ok_or_else(|| CoordinatorError::UnknownFailure(id.to_string()))
                    })
                    .transpose()?;
                let mut request = HealingRequest::for_test(result, selected);
                if selected.is_none() && result.failures.is_empty() {
                    request.evidence = triage(result).into();
                }
                request
            }
            HealingScope::Code => HealingRequest::for_code(result),
        };

        let outcome = self.healing.heal(request).await?;
        info!(scope = %scope, ok = outcome.result.is_ok(), "heal attempt finished");
        Ok(outcome)
    }

    /// Re-run the suite after a heal.
    pub async fn retest(&self) -> Result<ExecutionOutcome, CoordinatorError> {
        self.execution.run().await
    }
}
