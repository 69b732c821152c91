//! Recording and snapshot file management.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::RpcClient;
use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// One stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name.
    pub filename: String,
    /// Size in bytes.
    #[serde(default)]
    pub file_size: u64,
    /// Last modification time.
    #[serde(default)]
    pub modified_time: Option<String>,
    /// HTTP download location.
    #[serde(default)]
    pub download_url: Option<String>,
}

/// One page of a file listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileList {
    /// Entries on this page.
    pub files: Vec<FileEntry>,
    /// Entries across all pages.
    #[serde(default)]
    pub total: u32,
    /// Page size used by the server.
    #[serde(default)]
    pub limit: u32,
    /// Index of the first entry on this page.
    #[serde(default)]
    pub offset: u32,
}

/// Result of a delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    /// File the request named.
    pub filename: String,
    /// Whether the file was removed.
    pub deleted: bool,
    /// Server explanation, if any.
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// FileService
// ============================================================================

/// File listing and deletion methods.
#[derive(Debug, Clone)]
pub struct FileService {
    client: RpcClient,
}

impl FileService {
    /// Wraps a client handle.
    #[inline]
    #[must_use]
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// Lists recordings, `limit` at a time starting at `offset`.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::request`].
    pub async fn list_recordings(&self, limit: u32, offset: u32) -> Result<FileList> {
        self.list("list_recordings", limit, offset).await
    }

    /// Lists snapshots, `limit` at a time starting at `offset`.
    pub async fn list_snapshots(&self, limit: u32, offset: u32) -> Result<FileList> {
        self.list("list_snapshots", limit, offset).await
    }

    /// Deletes a stored recording.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::request`].
    pub async fn delete_recording(&self, filename: &str) -> Result<DeleteResult> {
        self.delete("delete_recording", filename).await
    }

    /// Deletes a stored snapshot.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::request`].
    pub async fn delete_snapshot(&self, filename: &str) -> Result<DeleteResult> {
        self.delete("delete_snapshot", filename).await
    }

    async fn list(&self, method: &str, limit: u32, offset: u32) -> Result<FileList> {
        self.client
            .request(method, Some(json!({ "limit": limit, "offset": offset })))
            .await
    }

    async fn delete(&self, method: &str, filename: &str) -> Result<DeleteResult> {
        self.client
            .request(method, Some(json!({ "filename": filename })))
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
