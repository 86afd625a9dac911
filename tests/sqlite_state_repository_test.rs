//! SQLite-backed persistence of the workflow slot.

mod common;

use apiheal::domain::models::{
    Endpoint, ExecutionResult, ExecutionStage, Failure, GenerationStage, TestSummary, UploadStage,
    WorkflowState,
};
use apiheal::domain::ports::WorkflowStateRepository;
use apiheal::services::WorkflowStore;

use common::{alice, sqlite_repository, user};

fn populated_state() -> WorkflowState {
    WorkflowState {
        project_name: Some("shop.zip".to_string()),
        endpoints: vec![
            Endpoint::new("GET", "/api/products"),
            Endpoint::new("GET", "/api/products"),
        ],
        upload_stage: UploadStage::Success,
        upload_source_path: Some("storage/uploads/shop".to_string()),
        generation_stage: GenerationStage::Success,
        generation_log: vec!["Generation started".to_string()],
        execution_stage: ExecutionStage::Success,
        last_execution_result: Some(ExecutionResult {
            score: -3.0,
            summary: TestSummary::new(2, 1, 0),
            failures: vec![Failure::new("test_create_order", "assert 500 == 201")
                .at("tests/generated/test_shop.py", Some(27))],
            raw_log: vec!["1 failed, 2 passed".to_string()],
            test_file_handle: Some("tests/generated/test_shop.py".to_string()),
        }),
        ..WorkflowState::default()
    }
}

#[tokio::test]
async fn test_slot_round_trip_keeps_duplicates_and_result() {
    let repo = sqlite_repository().await;
    let state = populated_state();

    repo.save(&alice(), &state).await.unwrap();
    let loaded = repo.load(&alice()).await.unwrap().unwrap();

    assert_eq!(loaded, state);
    assert_eq!(loaded.endpoints.len(), 2);
}

#[tokio::test]
async fn test_save_overwrites_existing_slot() {
    let repo = sqlite_repository().await;
    repo.save(&alice(), &populated_state()).await.unwrap();
    repo.save(&alice(), &WorkflowState::default()).await.unwrap();

    let loaded = repo.load(&alice()).await.unwrap().unwrap();
    assert_eq!(loaded, WorkflowState::default());
}

#[tokio::test]
async fn test_slots_are_per_user() {
    let repo = sqlite_repository().await;
    repo.save(&alice(), &populated_state()).await.unwrap();

    assert!(repo.load(&user("bob")).await.unwrap().is_none());

    repo.erase(&user("bob")).await.unwrap();
    assert!(repo.load(&alice()).await.unwrap().is_some());

    repo.erase(&alice()).await.unwrap();
    assert!(repo.load(&alice()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_store_over_sqlite_survives_restart() {
    let repo = sqlite_repository().await;

    let first = WorkflowStore::new(repo.clone(), WorkflowState::default());
    first.on_identity_change(Some(alice())).await;
    first.replace(populated_state()).await;
    drop(first);

    let second = WorkflowStore::new(repo, WorkflowState::default());
    assert_eq!(second.read().await, WorkflowState::default());
    second.on_identity_change(Some(alice())).await;
    assert_eq!(second.read().await, populated_state());
}

#[tokio::test]
async fn test_store_sign_out_erases_sqlite_slot() {
    let repo = sqlite_repository().await;
    let store = WorkflowStore::new(repo.clone(), WorkflowState::default());

    store.on_identity_change(Some(alice())).await;
    store.patch(|s| s.upload_stage = UploadStage::Success).await;
    assert!(repo.load(&alice()).await.unwrap().is_some());

    store.on_identity_change(None).await;
    assert!(repo.load(&alice()).await.unwrap().is_none());
    assert_eq!(store.read().await, WorkflowState::default());
}
