//! Common test utilities for integration tests
//!
//! Shared fixtures for building pipelines over the scripted backend and the
//! in-memory or SQLite state slot.

#![allow(dead_code)]

use std::sync::Arc;

use apiheal::adapters::memory::InMemoryStateRepository;
use apiheal::adapters::mock::MockBackend;
use apiheal::adapters::sqlite::{create_migrated_test_pool, SqliteStateRepository};
use apiheal::application::Pipeline;
use apiheal::domain::models::{UploadFile, UserId, WorkflowState};

pub fn user(name: &str) -> UserId {
    UserId::new(name).expect("valid user id")
}

pub fn alice() -> UserId {
    user("alice")
}

pub fn shop_archive() -> UploadFile {
    UploadFile::new("shop.zip", b"PK\x03\x04".to_vec())
}

/// Pipeline over an in-memory slot, signed in as alice.
pub async fn memory_pipeline() -> (MockBackend, Arc<InMemoryStateRepository>, Pipeline) {
    let backend = MockBackend::new();
    let repo = Arc::new(InMemoryStateRepository::new());
    let pipeline = Pipeline::new(repo.clone(), Arc::new(backend.clone()), WorkflowState::default());
    pipeline.sign_in(alice()).await;
    (backend, repo, pipeline)
}

/// Repository over a migrated in-memory SQLite pool.
pub async fn sqlite_repository() -> Arc<SqliteStateRepository> {
    let pool = create_migrated_test_pool()
        .await
        .expect("Failed to create test pool");
    Arc::new(SqliteStateRepository::new(pool))
}

/// Setup test logging
///
/// Call at the beginning of tests that need log output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
