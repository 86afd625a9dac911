//! Run history, dashboard statistics and derived analytics.

use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use super::workflow_store::WorkflowStore;
use crate::domain::errors::{BackendError, CoordinatorError};
use crate::domain::models::{
    parse_timestamp, ActivityEntry, AnalyticsSummary, DashboardStats, RunRecord, UserId,
};
use crate::domain::ports::PipelineBackend;

/// Entries shown in the recent-activity feed.
pub const RECENT_ACTIVITY_LEN: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum InsightsError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
    #[error("{}", .0.message())]
    Backend(#[from] BackendError),
}

/// Dashboard data fetched in one go.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub stats: DashboardStats,
    pub history: Vec<RunRecord>,
    pub analytics: AnalyticsSummary,
    pub recent_activity: Vec<ActivityEntry>,
}

/// Read-only queries; independent of every workflow stage.
pub struct InsightsService {
    store: Arc<WorkflowStore>,
    backend: Arc<dyn PipelineBackend>,
}

impl InsightsService {
    pub fn new(store: Arc<WorkflowStore>, backend: Arc<dyn PipelineBackend>) -> Self {
        Self { store, backend }
    }

    async fn user(&self) -> Result<UserId, InsightsError> {
        Ok(self
            .store
            .identity()
            .await
            .ok_or(CoordinatorError::NotSignedIn)?)
    }

    /// History sorted newest first.
    #[instrument(skip(self))]
    pub async fn fetch_history(&self) -> Result<Vec<RunRecord>, InsightsError> {
        let user = self.user().await?;
        let history = self.backend.get_history(&user).await?;
        Ok(sort_newest_first(history))
    }

    #[instrument(skip(self))]
    pub async fn fetch_dashboard_stats(&self) -> Result<DashboardStats, InsightsError> {
        let user = self.user().await?;
        Ok(self.backend.get_dashboard_stats(&user).await?)
    }

    /// Stats and history fetched concurrently, plus analytics.
    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<Overview, InsightsError> {
        let user = self.user().await?;
        let (stats, history) = tokio::join!(
            self.backend.get_dashboard_stats(&user),
            self.backend.get_history(&user)
        );
        let history = sort_newest_first(history?);

        Ok(Overview {
            stats: stats?,
            analytics: AnalyticsSummary::from_history(&history),
            recent_activity: recent_activity(&history, RECENT_ACTIVITY_LEN),
            history,
        })
    }
}

/// Unparseable timestamps sort last; ties keep backend order.
pub fn sort_newest_first(mut history: Vec<RunRecord>) -> Vec<RunRecord> {
    history.sort_by(|a, b| {
        parse_timestamp(&b.timestamp).cmp(&parse_timestamp(&a.timestamp))
    });
    history
}

/// First `n` entries of an already sorted history as feed entries.
pub fn recent_activity(history: &[RunRecord], n: usize) -> Vec<ActivityEntry> {
    history.iter().take(n).map(ActivityEntry::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStateRepository;
    use crate::adapters::mock::{status_error, MockBackend};
    use crate::domain::models::{ActivityKind, RunStatus, TestSummary, WorkflowState};

    fn record(status: RunStatus, project: &str, timestamp: &str) -> RunRecord {
        RunRecord {
            status,
            project_name: project.to_string(),
            timestamp: timestamp.to_string(),
            score: if status == RunStatus::Passed { 1.0 } else { 0.5 },
            summary: TestSummary::default(),
            test_file: None,
        }
    }

    async fn setup() -> (MockBackend, InsightsService) {
        let store = Arc::new(WorkflowStore::new(
            Arc::new(InMemoryStateRepository::new()),
            WorkflowState::default(),
        ));
        store.on_identity_change(Some(UserId::new("alice").unwrap())).await;
        let backend = MockBackend::new();
        let service = InsightsService::new(store, Arc::new(backend.clone()));
        (backend, service)
    }

    #[test]
    fn test_sort_newest_first() {
        let sorted = sort_newest_first(vec![
            record(RunStatus::Passed, "a", "2024-05-01T10:00:00"),
            record(RunStatus::Failed, "b", "garbage"),
            record(RunStatus::Failed, "c", "2024-05-03T09:00:00+00:00"),
        ]);
        let names: Vec<_> = sorted.iter().map(|r| r.project_name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_recent_activity_messages() {
        let history = vec![
            record(RunStatus::Passed, "shop.zip", "2024-05-02T10:00:00"),
            record(RunStatus::Failed, "todo.zip", "2024-05-01T10:00:00"),
        ];
        let feed = recent_activity(&history, 5);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].kind, ActivityKind::Success);
        assert_eq!(feed[0].message, "Test run passed: shop.zip");
        assert_eq!(feed[1].message, "Test run failed: todo.zip");
    }

    #[tokio::test]
    async fn test_overview_combines_both_calls() {
        let (backend, service) = setup().await;
        backend
            .push_history(Ok(vec![
                record(RunStatus::Passed, "a", "2024-05-01T10:00:00"),
                record(RunStatus::Failed, "b", "2024-05-02T10:00:00"),
            ]))
            .await;

        let overview = service.overview().await.unwrap();
        assert_eq!(overview.history[0].project_name, "b");
        assert_eq!(overview.analytics.total_runs, 2);
        assert!((overview.analytics.pass_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(overview.recent_activity.len(), 2);
        assert_eq!(overview.stats.total_runs, 1);
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_message() {
        let (backend, service) = setup().await;
        backend.push_stats(Err(status_error(503, "history store offline"))).await;

        let err = service.fetch_dashboard_stats().await.unwrap_err();
        assert_eq!(err.to_string(), "history store offline");
    }
}
