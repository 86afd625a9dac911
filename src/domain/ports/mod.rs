//! Port trait definitions (Hexagonal Architecture)
//!
//! - WorkflowStateRepository: the per-user persisted workflow slot
//! - PipelineBackend: the remote ingestion/generation/execution/healing service
//!
//! Services receive these as `Arc<dyn ...>` so adapters can be swapped in tests.

pub mod pipeline_backend;
pub mod state_repository;

pub use pipeline_backend::PipelineBackend;
pub use state_repository::WorkflowStateRepository;
