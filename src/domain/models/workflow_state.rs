//! Workflow state machine types.
//!
//! One `WorkflowState` exists per signed-in identity. It is serialized as a
//! JSON blob into the identity's persisted slot and rehydrated on sign-in.
//! Each axis (upload, generation, execution) follows the same shape:
//!
//! ```text
//! Idle → InProgress → Success
//!             ↘ Error            (generation also splits off Quota)
//! Success | Error → InProgress   (every rest state can be re-entered)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::execution::ExecutionResult;

/// Fallback target base URL forwarded to the generation backend.
pub const DEFAULT_TARGET_BASE_URL: &str = "http://localhost:5000";

/// Generation log line left behind when a run was cut short.
pub const INTERRUPTED_LOG_LINE: &str = "Error: interrupted before the backend answered";

/// Which stage axis an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAxis {
    Upload,
    Generation,
    Execution,
}

impl StageAxis {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Generation => "generation",
            Self::Execution => "execution",
        }
    }
}

impl fmt::Display for StageAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ingestion stage status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    #[default]
    Idle,
    Uploading,
    Success,
    Error,
}

impl UploadStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Whether an ingestion call is outstanding.
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::Uploading)
    }
}

/// Test-generation stage status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    #[default]
    Idle,
    Generating,
    Success,
    Error,
    /// The remote agent reported a usage limit (HTTP 429).
    Quota,
}

impl GenerationStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Success => "success",
            Self::Error => "error",
            Self::Quota => "quota",
        }
    }

    /// Whether a generation call is outstanding.
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::Generating)
    }

    /// Whether a user-initiated retry makes sense from this stage.
    ///
    /// `Quota` is a rest state but retrying it is doomed until the limit
    /// resets or a new project is ingested.
    pub const fn allows_retry(self) -> bool {
        !matches!(self, Self::Generating | Self::Quota)
    }
}

/// Test-execution stage status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStage {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

impl ExecutionStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Whether a test run is outstanding.
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::Running)
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(UploadStage, GenerationStage, ExecutionStage);

/// An API endpoint discovered during ingestion.
///
/// Identity is the `(method, path)` pair. Duplicates are kept as reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: String,
    pub path: String,
}

impl Endpoint {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// State of the active project's progression through the pipeline.
///
/// Missing fields in a persisted slot take their defaults; a slot that fails
/// to parse at all is discarded by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowState {
    /// Set once ingestion succeeds.
    pub project_name: Option<String>,
    /// Discovery order, duplicates permitted.
    pub endpoints: Vec<Endpoint>,
    pub upload_stage: UploadStage,
    /// Opaque handle returned by the ingestion backend.
    pub upload_source_path: Option<String>,
    /// Last-used remote repository URL (may be empty).
    pub github_url: String,
    pub generation_stage: GenerationStage,
    /// Append-only, user-clearable.
    pub generation_log: Vec<String>,
    /// Forwarded verbatim to the generation backend.
    pub target_base_url: String,
    /// One-shot "start generation when idle" signal.
    pub auto_generate_requested: bool,
    pub execution_stage: ExecutionStage,
    pub last_execution_result: Option<ExecutionResult>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            project_name: None,
            endpoints: Vec::new(),
            upload_stage: UploadStage::Idle,
            upload_source_path: None,
            github_url: String::new(),
            generation_stage: GenerationStage::Idle,
            generation_log: Vec::new(),
            target_base_url: DEFAULT_TARGET_BASE_URL.to_string(),
            auto_generate_requested: false,
            execution_stage: ExecutionStage::Idle,
            last_execution_result: None,
        }
    }
}

impl WorkflowState {
    /// Defaults with a configured generation target.
    pub fn with_target_base_url(target_base_url: impl Into<String>) -> Self {
        Self {
            target_base_url: target_base_url.into(),
            ..Self::default()
        }
    }

    /// Status label of one axis.
    pub fn stage_label(&self, axis: StageAxis) -> &'static str {
        match axis {
            StageAxis::Upload => self.upload_stage.as_str(),
            StageAxis::Generation => self.generation_stage.as_str(),
            StageAxis::Execution => self.execution_stage.as_str(),
        }
    }

    /// Whether the given axis has an outstanding remote call.
    pub const fn is_in_progress(&self, axis: StageAxis) -> bool {
        match axis {
            StageAxis::Upload => self.upload_stage.is_in_progress(),
            StageAxis::Generation => self.generation_stage.is_in_progress(),
            StageAxis::Execution => self.execution_stage.is_in_progress(),
        }
    }

    /// Whether the auto-generate signal is armed and may fire now.
    pub fn auto_generate_ready(&self) -> bool {
        self.auto_generate_requested && self.generation_stage == GenerationStage::Idle
    }

    /// Move every axis a previous process left in progress to its error
    /// state and return the axes that changed.
    ///
    /// Only valid at startup, before this process issues any remote call.
    pub fn settle_interrupted(&mut self) -> Vec<StageAxis> {
        let mut settled = Vec::new();
        if self.upload_stage.is_in_progress() {
            self.upload_stage = UploadStage::Error;
            settled.push(StageAxis::Upload);
        }
        if self.generation_stage.is_in_progress() {
            self.generation_stage = GenerationStage::Error;
            self.generation_log.push(INTERRUPTED_LOG_LINE.to_string());
            settled.push(StageAxis::Generation);
        }
        if self.execution_stage.is_in_progress() {
            self.execution_stage = ExecutionStage::Error;
            settled.push(StageAxis::Execution);
        }
        settled
    }
}
