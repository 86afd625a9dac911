/// Workflow state repository port (trait) for dependency injection.
///
/// Defines the contract for the per-user persisted workflow slot. The
/// workflow store depends on this trait, not on a concrete backend.
use crate::domain::errors::DomainResult;
use crate::domain::models::{UserId, WorkflowState};
use async_trait::async_trait;

/// Repository trait for the persisted workflow slot.
///
/// Each user owns exactly one slot holding the serialized [`WorkflowState`].
#[async_trait]
pub trait WorkflowStateRepository: Send + Sync {
    /// Loads the slot for `user`.
    ///
    /// # Returns
    /// - `Some(WorkflowState)` if a slot exists
    /// - `None` if the user has never persisted state
    ///
    /// # Errors
    /// Returns error if:
    /// - Database connection fails
    /// - The stored payload cannot be deserialized
    async fn load(&self, user: &UserId) -> DomainResult<Option<WorkflowState>>;

    /// Replaces the slot for `user` with `state`.
    ///
    /// # Errors
    /// Returns error if the state cannot be serialized or written.
    async fn save(&self, user: &UserId, state: &WorkflowState) -> DomainResult<()>;

    /// Removes the slot for `user`. Erasing a missing slot is not an error.
    async fn erase(&self, user: &UserId) -> DomainResult<()>;
}
