//! Shared workflow state with per-identity persistence.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::models::{UserId, WorkflowState};
use crate::domain::ports::WorkflowStateRepository;

struct StoreInner {
    identity: Option<UserId>,
    state: WorkflowState,
}

/// Holds the single active workflow state.
///
/// Every mutation goes through [`WorkflowStore::patch`], which applies the
/// closure and persists the result under one lock, so patches never
/// interleave. Persistence is best-effort: a failed save is logged and the
/// in-memory state stays authoritative.
pub struct WorkflowStore {
    repository: Arc<dyn WorkflowStateRepository>,
    defaults: WorkflowState,
    inner: Mutex<StoreInner>,
}

impl WorkflowStore {
    /// Create a store with no identity, holding `defaults`.
    pub fn new(repository: Arc<dyn WorkflowStateRepository>, defaults: WorkflowState) -> Self {
        Self {
            repository,
            inner: Mutex::new(StoreInner {
                identity: None,
                state: defaults.clone(),
            }),
            defaults,
        }
    }

    /// Current snapshot.
    pub async fn read(&self) -> WorkflowState {
        self.inner.lock().await.state.clone()
    }

    pub async fn identity(&self) -> Option<UserId> {
        self.inner.lock().await.identity.clone()
    }

    /// Identity and state read under one lock.
    pub async fn snapshot(&self) -> (Option<UserId>, WorkflowState) {
        let inner = self.inner.lock().await;
        (inner.identity.clone(), inner.state.clone())
    }

    /// Replace the whole state, persisting it when signed in.
    pub async fn replace(&self, state: WorkflowState) {
        self.patch(move |current| *current = state).await;
    }

    /// Apply `f` atomically and persist the new snapshot when signed in.
    pub async fn patch<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut WorkflowState) -> R + Send,
        R: Send,
    {
        let mut inner = self.inner.lock().await;
        let out = f(&mut inner.state);
        self.persist(&inner).await;
        out
    }

    /// Like [`WorkflowStore::patch`], but only while `user` is still the
    /// signed-in identity.
    ///
    /// Continuations resuming after a remote call use this so an outcome
    /// that arrives after a logout or account switch is dropped instead of
    /// landing in someone else's state.
    pub async fn patch_for<F, R>(&self, user: &UserId, f: F) -> Option<R>
    where
        F: FnOnce(&mut WorkflowState) -> R + Send,
        R: Send,
    {
        let mut inner = self.inner.lock().await;
        if inner.identity.as_ref() != Some(user) {
            debug!(user_id = %user, "identity changed during remote call; discarding outcome");
            return None;
        }
        let out = f(&mut inner.state);
        self.persist(&inner).await;
        Some(out)
    }

    /// Apply `f` only if someone is signed in, returning their identity.
    pub async fn patch_signed_in<F, R>(&self, f: F) -> Option<(UserId, R)>
    where
        F: FnOnce(&mut WorkflowState) -> R + Send,
        R: Send,
    {
        let mut inner = self.inner.lock().await;
        let user = inner.identity.clone()?;
        let out = f(&mut inner.state);
        self.persist(&inner).await;
        Some((user, out))
    }

    /// React to sign-in, sign-out or an account switch.
    ///
    /// - `None`: reset to defaults and erase the previous identity's slot.
    /// - The current identity: no-op.
    /// - Another identity: rehydrate from its slot, or defaults when the slot
    ///   is missing or malformed.
    pub async fn on_identity_change(&self, identity: Option<UserId>) {
        let mut inner = self.inner.lock().await;
        if inner.identity == identity {
            return;
        }

        match identity {
            None => {
                let previous = inner.identity.take();
                inner.state = self.defaults.clone();
                if let Some(previous) = previous {
                    if let Err(e) = self.repository.erase(&previous).await {
                        warn!(user_id = %previous, error = %e, "failed to erase persisted workflow state");
                    }
                    info!(user_id = %previous, "signed out; workflow state cleared");
                }
            }
            Some(user) => {
                inner.state = match self.repository.load(&user).await {
                    Ok(Some(state)) => {
                        debug!(user_id = %user, "rehydrated workflow state");
                        state
                    }
                    Ok(None) => self.defaults.clone(),
                    Err(e) => {
                        warn!(user_id = %user, error = %e, "persisted workflow state unreadable; using defaults");
                        self.defaults.clone()
                    }
                };
                info!(user_id = %user, "signed in");
                inner.identity = Some(user);
            }
        }
    }

    async fn persist(&self, inner: &StoreInner) {
        let Some(user) = inner.identity.as_ref() else {
            return;
        };
        if let Err(e) = self.repository.save(user, &inner.state).await {
            warn!(user_id = %user, error = %e, "failed to persist workflow state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStateRepository;
    use crate::domain::models::{GenerationStage, UploadStage};

    fn setup() -> (Arc<InMemoryStateRepository>, WorkflowStore) {
        let repo = Arc::new(InMemoryStateRepository::new());
        let store = WorkflowStore::new(repo.clone(), WorkflowState::default());
        (repo, store)
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[tokio::test]
    async fn test_patch_without_identity_is_not_persisted() {
        let (repo, store) = setup();
        store.patch(|s| s.github_url = "https://github.com/acme/shop".to_string()).await;

        assert_eq!(store.read().await.github_url, "https://github.com/acme/shop");
        assert!(!repo.contains(&alice()).await);
    }

    #[tokio::test]
    async fn test_patch_persists_for_identity() {
        let (repo, store) = setup();
        store.on_identity_change(Some(alice())).await;
        store.patch(|s| s.upload_stage = UploadStage::Success).await;

        let saved = repo.load(&alice()).await.unwrap().unwrap();
        assert_eq!(saved.upload_stage, UploadStage::Success);
    }

    #[tokio::test]
    async fn test_sign_in_rehydrates() {
        let (repo, store) = setup();
        let mut saved = WorkflowState::default();
        saved.generation_stage = GenerationStage::Quota;
        repo.save(&alice(), &saved).await.unwrap();

        store.on_identity_change(Some(alice())).await;
        assert_eq!(store.read().await, saved);
    }

    #[tokio::test]
    async fn test_malformed_slot_yields_defaults() {
        let (repo, store) = setup();
        repo.insert_raw(&alice(), "{\"upload_stage\": 42").await;

        store.on_identity_change(Some(alice())).await;
        assert_eq!(store.read().await, WorkflowState::default());
        assert_eq!(store.identity().await, Some(alice()));
    }

    #[tokio::test]
    async fn test_sign_out_clears_memory_and_slot() {
        let (repo, store) = setup();
        store.on_identity_change(Some(alice())).await;
        store.patch(|s| s.project_name = Some("shop.zip".to_string())).await;

        store.on_identity_change(None).await;
        assert_eq!(store.read().await, WorkflowState::default());
        assert!(!repo.contains(&alice()).await);
    }

    #[tokio::test]
    async fn test_same_identity_is_noop() {
        let (_repo, store) = setup();
        store.on_identity_change(Some(alice())).await;
        store.patch(|s| s.project_name = Some("shop.zip".to_string())).await;

        store.on_identity_change(Some(alice())).await;
        assert_eq!(store.read().await.project_name.as_deref(), Some("shop.zip"));
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_patch() {
        let (repo, store) = setup();
        store.on_identity_change(Some(alice())).await;
        repo.set_fail_writes(true).await;

        store.patch(|s| s.upload_stage = UploadStage::Error).await;
        assert_eq!(store.read().await.upload_stage, UploadStage::Error);
    }

    #[tokio::test]
    async fn test_patch_for_drops_stale_identity() {
        let (_repo, store) = setup();
        store.on_identity_change(Some(alice())).await;
        store.on_identity_change(Some(UserId::new("bob").unwrap())).await;

        let applied = store.patch_for(&alice(), |s| s.upload_stage = UploadStage::Success).await;
        assert!(applied.is_none());
        assert_eq!(store.read().await.upload_stage, UploadStage::Idle);
    }
}
