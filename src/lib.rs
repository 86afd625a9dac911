//! apiheal - API test workflow orchestrator
//!
//! apiheal drives one project at a time through ingestion, test generation,
//! test execution, failure triage and self-healing against a remote
//! pipeline backend, persisting the workflow state per user.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): workflow state machine, models and ports
//! - **Adapters** (`adapters`): SQLite and in-memory state slots, the HTTP
//!   backend client and a scripted backend
//! - **Service Layer** (`services`): the workflow store and per-stage coordinators
//! - **Application Layer** (`application`): the `Pipeline` facade
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use application::Pipeline;
pub use domain::errors::{BackendError, CoordinatorError, DomainError};
pub use domain::models::{
    Config, ExecutionResult, GenerationStage, HealingScope, UserId, WorkflowState,
};
pub use domain::ports::{PipelineBackend, WorkflowStateRepository};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{GenerationOutcome, WorkflowStore};
