//! Classification of remote generation outcomes.

use crate::domain::errors::{structured_error_detail, BackendError};
use crate::domain::models::{GenerationReceipt, GenerationStage};

/// Usage-limit status code.
pub const QUOTA_STATUS: u16 = 429;

/// How a generation call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success { test_file_path: Option<String> },
    Quota { message: String },
    Error { message: String },
}

impl GenerationOutcome {
    /// Stage the generation axis rests in after this outcome.
    pub const fn stage(&self) -> GenerationStage {
        match self {
            Self::Success { .. } => GenerationStage::Success,
            Self::Quota { .. } => GenerationStage::Quota,
            Self::Error { .. } => GenerationStage::Error,
        }
    }

    /// Log lines appended once the call resolves.
    ///
    /// Quota and error read the same in the log; only the stage tells them
    /// apart.
    pub fn log_lines(&self) -> Vec<String> {
        match self {
            Self::Success { test_file_path } => {
                let mut lines = vec!["Test suite generated successfully.".to_string()];
                if let Some(path) = test_file_path {
                    lines.push(format!("File saved to: {path}"));
                }
                lines
            }
            Self::Quota { message } | Self::Error { message } => vec![format!("Error: {message}")],
        }
    }
}

/// Classify a raw generation response.
///
/// 2xx is success; exactly 429 is a quota outcome; anything else is an
/// error. The message prefers a structured `detail`/`error` field.
pub fn classify_generation_outcome(status: u16, body: &str) -> GenerationOutcome {
    if (200..300).contains(&status) {
        let test_file_path = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("test_file_path")?.as_str().map(str::to_string))
            .filter(|p| !p.is_empty());
        return GenerationOutcome::Success { test_file_path };
    }

    let message = structured_error_detail(body)
        .unwrap_or_else(|| format!("Request failed with status code {status}"));
    if status == QUOTA_STATUS {
        GenerationOutcome::Quota { message }
    } else {
        GenerationOutcome::Error { message }
    }
}

/// Classify the result of a `PipelineBackend::generate_tests` call.
pub fn classify_generation_result(result: Result<GenerationReceipt, BackendError>) -> GenerationOutcome {
    match result {
        Ok(receipt) => GenerationOutcome::Success {
            test_file_path: receipt.test_file_path,
        },
        Err(BackendError::Status { status, body }) => classify_generation_outcome(status, &body),
        Err(other) => GenerationOutcome::Error {
            message: other.message(),
        },
    }
}
