//! Domain errors for the apiheal orchestrator.

use thiserror::Error;

use super::models::StageAxis;

/// Fallback text when a failure carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Unknown error communicating with the pipeline backend.";

/// Domain-level errors raised by persistence adapters and validation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Errors returned by the remote pipeline backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Non-2xx response.
    #[error("backend returned HTTP {status}: {}", status_message(.status, .body))]
    Status { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body reports an error.
    #[error("backend reported an error: {0}")]
    Payload(String),

    /// A 2xx response that could not be decoded.
    #[error("malformed backend response: {0}")]
    Decode(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    /// Create error from HTTP status code and response body.
    pub const fn from_status(status: u16, body: String) -> Self {
        Self::Status { status, body }
    }

    /// HTTP status, when the backend answered.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend signalled a usage limit.
    pub const fn is_quota(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }

    /// Human-readable message.
    ///
    /// Prefers a structured `detail`/`error` field from the body, then the
    /// transport-level text, then a generic fallback.
    pub fn message(&self) -> String {
        let text = match self {
            Self::Status { status, body } => status_message(status, body),
            Self::Transport(text) | Self::Payload(text) => text.clone(),
            Self::Decode(text) => format!("Malformed response: {text}"),
        };
        if text.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            text
        }
    }
}

fn status_message(status: &u16, body: &str) -> String {
    structured_error_detail(body)
        .unwrap_or_else(|| format!("Request failed with status code {status}"))
}

/// Extract `detail`, `error`, or `message` from a JSON error body.
pub fn structured_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "error", "message"].iter().find_map(|key| {
        match value.get(key)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.trim().is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    })
}

/// Errors a coordinator returns instead of starting or finishing an operation.
///
/// Remote failures of generation and execution are not errors: they are
/// classified into stage statuses and returned as outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("{axis} stage is already {stage}; wait for it to finish")]
    StageBusy { axis: StageAxis, stage: String },

    #[error("no user is signed in")]
    NotSignedIn,

    #[error("ingestion failed: {0}")]
    Ingestion(String),

    #[error("no execution result available; run the test suite first")]
    NoExecutionResult,

    #[error("no failure recorded for test '{0}'")]
    UnknownFailure(String),
}
