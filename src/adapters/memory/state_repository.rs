//! In-memory WorkflowStateRepository for tests and offline sessions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{UserId, WorkflowState};
use crate::domain::ports::WorkflowStateRepository;

/// Slots are stored as serialized JSON so the adapter fails the same way
/// the SQLite one does when a payload is malformed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateRepository {
    slots: Arc<RwLock<HashMap<String, String>>>,
    fail_writes: Arc<RwLock<bool>>,
}

impl InMemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw payload, bypassing serialization.
    pub async fn insert_raw(&self, user: &UserId, payload: impl Into<String>) {
        self.slots
            .write()
            .await
            .insert(user.as_str().to_string(), payload.into());
    }

    pub async fn raw(&self, user: &UserId) -> Option<String> {
        self.slots.read().await.get(user.as_str()).cloned()
    }

    pub async fn contains(&self, user: &UserId) -> bool {
        self.slots.read().await.contains_key(user.as_str())
    }

    /// Make every subsequent save/erase fail.
    pub async fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.write().await = fail;
    }

    async fn check_writable(&self) -> DomainResult<()> {
        if *self.fail_writes.read().await {
            return Err(DomainError::DatabaseError("storage unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowStateRepository for InMemoryStateRepository {
    async fn load(&self, user: &UserId) -> DomainResult<Option<WorkflowState>> {
        let slots = self.slots.read().await;
        slots
            .get(user.as_str())
            .map(|json| serde_json::from_str(json))
            .transpose()
            .map_err(Into::into)
    }

    async fn save(&self, user: &UserId, state: &WorkflowState) -> DomainResult<()> {
        self.check_writable().await?;
        let json = serde_json::to_string(state)?;
        self.slots
            .write()
            .await
            .insert(user.as_str().to_string(), json);
        Ok(())
    }

    async fn erase(&self, user: &UserId) -> DomainResult<()> {
        self.check_writable().await?;
        self.slots.write().await.remove(user.as_str());
        Ok(())
    }
}
