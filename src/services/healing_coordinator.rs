//! Heal a failing test or diagnose the code under test.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::workflow_store::WorkflowStore;
use crate::domain::errors::CoordinatorError;
use crate::domain::models::{HealingRequest, HealingResult, HealingScope};
use crate::domain::ports::PipelineBackend;

/// Reason given when a test heal has no file to rewrite.
pub const MISSING_TEST_FILE: &str = "No test file is associated with the last execution result.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealingOutcome {
    pub scope: HealingScope,
    pub result: HealingResult,
    /// A successful test heal should be followed by a retest.
    pub retest_offered: bool,
}

/// Exactly one remote attempt per call. Healing never touches the workflow
/// state; the store is only consulted for the identity.
pub struct HealingCoordinator {
    store: Arc<WorkflowStore>,
    backend: Arc<dyn PipelineBackend>,
}

impl HealingCoordinator {
    pub fn new(store: Arc<WorkflowStore>, backend: Arc<dyn PipelineBackend>) -> Self {
        Self { store, backend }
    }

    #[instrument(skip(self, request), fields(scope = %request.scope))]
    pub async fn heal(&self, request: HealingRequest) -> Result<HealingOutcome, CoordinatorError> {
        let user = self
            .store
            .identity()
            .await
            .ok_or(CoordinatorError::NotSignedIn)?;
        let evidence = request.evidence.render();

        let result = match request.scope {
            HealingScope::Test => match request.test_file_handle.as_deref() {
                None => HealingResult::failed(MISSING_TEST_FILE),
                Some(test_file) => self
                    .backend
                    .heal_test(&user, test_file, &evidence)
                    .await
                    .map_or_else(|e| HealingResult::failed(e.message()), HealingResult::from),
            },
            HealingScope::Code => self
                .backend
                .diagnose_code(&user, None, &evidence)
                .await
                .map_or_else(|e| HealingResult::failed(e.message()), HealingResult::from),
        };

        match &result {
            HealingResult::Healed { .. } => info!(user_id = %user, "healing succeeded"),
            HealingResult::Failed { reason } => warn!(user_id = %user, %reason, "healing failed"),
        }

        Ok(HealingOutcome {
            scope: request.scope,
            retest_offered: request.scope == HealingScope::Test && result.is_ok(),
            result,
        })
    }
}
