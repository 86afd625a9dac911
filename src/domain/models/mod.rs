pub mod config;
pub mod execution;
pub mod healing;
pub mod identity;
pub mod ingestion;
pub mod insights;
pub mod workflow_state;

pub use config::{BackendConfig, Config, DatabaseConfig, GenerationConfig, LoggingConfig};
pub use execution::{ExecutionResult, Failure, TestSummary};
pub use healing::{
    Diagnosis, HealingEvidence, HealingRequest, HealingResult, HealingScope, TestHealReport,
};
pub use identity::UserId;
pub use ingestion::{GenerationReceipt, IngestionReport, RepositoryRequest, UploadFile};
pub use insights::{
    parse_timestamp, ActivityEntry, ActivityKind, AnalyticsSummary, DailyTrend, DashboardStats,
    RunRecord, RunStatus,
};
pub use workflow_state::{
    Endpoint, ExecutionStage, GenerationStage, StageAxis, UploadStage, WorkflowState,
};
