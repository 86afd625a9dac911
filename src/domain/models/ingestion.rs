//! Ingestion and generation request/response types.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::workflow_state::Endpoint;

/// A project archive to upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming the upload after the final path component.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "project.zip".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { file_name, bytes })
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Remote repository to clone and scan.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryRequest {
    pub github_url: String,
    pub token: Option<String>,
}

impl std::fmt::Debug for RepositoryRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryRequest")
            .field("github_url", &self.github_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Endpoint inventory produced by a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub project_name: String,
    pub endpoints: Vec<Endpoint>,
    pub upload_path: Option<String>,
}

/// Success marker for test generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReceipt {
    /// Where the generated suite was written, when reported.
    pub test_file_path: Option<String>,
}
