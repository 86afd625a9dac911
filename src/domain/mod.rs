//! Domain layer for the apiheal orchestrator
//!
//! This module contains the workflow state machine, its data model, and the
//! ports the coordinators depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{BackendError, BackendResult, CoordinatorError, DomainError, DomainResult};
