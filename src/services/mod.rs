//! Workflow coordinators and read-only insights.
//!
//! Every coordinator shares one [`WorkflowStore`] and talks to the remote
//! backend through the `PipelineBackend` port.

pub mod execution_coordinator;
pub mod failure_triage;
pub mod generation_coordinator;
pub mod healing_coordinator;
pub mod insights;
pub mod outcome;
pub mod upload_coordinator;
pub mod workflow_store;

pub use execution_coordinator::{ExecutionCoordinator, ExecutionOutcome};
pub use failure_triage::{triage, TriageView, NO_LOGS_PLACEHOLDER};
pub use generation_coordinator::GenerationCoordinator;
pub use healing_coordinator::{HealingCoordinator, HealingOutcome};
pub use insights::{InsightsError, InsightsService, Overview};
pub use outcome::{classify_generation_outcome, GenerationOutcome};
pub use upload_coordinator::UploadCoordinator;
pub use workflow_store::WorkflowStore;
