//! Content repository layer.
//!
//! Every photo and the user record file live in a version-controlled
//! repository. This module defines the storage abstraction the rest of the
//! crate is written against, plus two implementations:
//!
//! - [`GitHubRepository`] talks to the GitHub REST contents and git-data API
//! - [`MemoryRepository`] keeps files in process, for tests and local trials
//!
//! Every file carries an identity marker (the blob SHA). Updates and deletes
//! must present the marker of the version they were based on, which gives the
//! handlers optimistic concurrency without any locking of their own.

mod github;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RepoError;

pub use github::{GitHubRepository, DEFAULT_API_URL, GITHUB_API_VERSION};
pub use memory::MemoryRepository;

/// A file fetched from the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    /// Repository-relative path
    pub path: String,

    /// Identity marker required to update or delete this version
    pub sha: String,

    /// Size of the file in bytes
    pub size: u64,

    /// Inline content, absent when the API withholds it (large files)
    pub content: Option<Bytes>,
}

/// A create-or-update request.
#[derive(Debug, Clone)]
pub struct PutFile {
    /// Repository-relative path
    pub path: String,

    /// New file content
    pub content: Bytes,

    /// Commit message
    pub message: String,

    /// Identity marker of the version being replaced; `None` creates a new file
    pub sha: Option<String>,
}

impl PutFile {
    /// Request creation of a new file.
    pub fn create(path: impl Into<String>, content: Bytes, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content,
            message: message.into(),
            sha: None,
        }
    }

    /// Request replacement of the version identified by `sha`.
    pub fn update(
        path: impl Into<String>,
        content: Bytes,
        message: impl Into<String>,
        sha: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content,
            message: message.into(),
            sha: Some(sha.into()),
        }
    }
}

/// Storage operations the gallery needs from a content repository.
///
/// Implementations must be thread-safe; handlers share one instance.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch a file with its identity marker.
    ///
    /// Returns `RepoError::NotFound` if nothing exists at `path`.
    async fn get_file(&self, path: &str) -> Result<RepoFile, RepoError>;

    /// Fetch a raw blob by identity marker.
    async fn get_blob(&self, sha: &str) -> Result<Bytes, RepoError>;

    /// Create or update a file, returning the identity marker of the new version.
    async fn put_file(&self, request: PutFile) -> Result<String, RepoError>;

    /// Delete the version of `path` identified by `sha`.
    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<(), RepoError>;

    /// Human-readable identifier for logging (e.g. `github://owner/repo`).
    fn identifier(&self) -> &str;

    /// Fetch a file and its full content.
    ///
    /// Falls back to the blob API when the file endpoint withholds the content.
    async fn read_file(&self, path: &str) -> Result<(RepoFile, Bytes), RepoError> {
        let file = self.get_file(path).await?;
        let content = match &file.content {
            Some(content) => content.clone(),
            None => self.get_blob(&file.sha).await?,
        };
        Ok((file, content))
    }
}
