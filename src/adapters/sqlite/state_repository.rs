//! SQLite implementation of the WorkflowStateRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::DomainResult;
use crate::domain::models::{UserId, WorkflowState};
use crate::domain::ports::WorkflowStateRepository;

#[derive(Clone)]
pub struct SqliteStateRepository {
    pool: SqlitePool,
}

impl SqliteStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStateRepository for SqliteStateRepository {
    async fn load(&self, user: &UserId) -> DomainResult<Option<WorkflowState>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT state_json FROM workflow_state WHERE user_id = ?")
                .bind(user.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(json,)| serde_json::from_str(&json))
            .transpose()
            .map_err(Into::into)
    }

    async fn save(&self, user: &UserId, state: &WorkflowState) -> DomainResult<()> {
        let json = serde_json::to_string(state)?;

        sqlx::query(
            r#"INSERT INTO workflow_state (user_id, state_json, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET state_json = excluded.state_json, updated_at = excluded.updated_at"#,
        )
        .bind(user.as_str())
        .bind(&json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn erase(&self, user: &UserId) -> DomainResult<()> {
        sqlx::query("DELETE FROM workflow_state WHERE user_id = ?")
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
