use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use super::{ContentRepository, PutFile, RepoFile};
use crate::error::RepoError;

#[derive(Default)]
struct State {
    files: HashMap<String, String>,
    blobs: HashMap<String, Bytes>,
    commits: Vec<String>,
}

/// In-process implementation of [`ContentRepository`].
///
/// Identity markers are content hashes, so rewriting a file with new content
/// invalidates markers handed out for the previous version. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<RwLock<State>>,
    writes: Arc<AtomicUsize>,
    inline_limit: Option<usize>,
    failing_deletes: Arc<RwLock<HashSet<String>>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Withhold inline content for files larger than `limit` bytes, forcing
    /// readers through [`ContentRepository::get_blob`].
    pub fn with_inline_limit(mut self, limit: usize) -> Self {
        self.inline_limit = Some(limit);
        self
    }

    /// Seed a file without counting it as a write.
    pub async fn insert(&self, path: impl Into<String>, content: impl Into<Bytes>) -> String {
        let content = content.into();
        let sha = blob_sha(&content);
        let mut state = self.state.write().await;
        state.blobs.insert(sha.clone(), content);
        state.files.insert(path.into(), sha.clone());
        sha
    }

    /// Make every delete of `path` fail with an API error.
    pub async fn fail_deletes_for(&self, path: impl Into<String>) {
        self.failing_deletes.write().await.insert(path.into());
    }

    /// Content currently stored at `path`.
    pub async fn contents(&self, path: &str) -> Option<Bytes> {
        let state = self.state.read().await;
        state
            .files
            .get(path)
            .and_then(|sha| state.blobs.get(sha))
            .cloned()
    }

    /// Whether a file exists at `path`.
    pub async fn exists(&self, path: &str) -> bool {
        self.state.read().await.files.contains_key(path)
    }

    /// All file paths, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state.read().await.files.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Commit messages in the order they were written.
    pub async fn commit_messages(&self) -> Vec<String> {
        self.state.read().await.commits.clone()
    }

    /// Number of successful writes (puts and deletes).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn get_file(&self, path: &str) -> Result<RepoFile, RepoError> {
        let state = self.state.read().await;
        let sha = state
            .files
            .get(path)
            .ok_or_else(|| RepoError::NotFound(path.to_string()))?;
        let blob = state
            .blobs
            .get(sha)
            .ok_or_else(|| RepoError::NotFound(sha.clone()))?;

        let inline = self.inline_limit.map_or(true, |limit| blob.len() <= limit);

        Ok(RepoFile {
            path: path.to_string(),
            sha: sha.clone(),
            size: blob.len() as u64,
            content: inline.then(|| blob.clone()),
        })
    }

    async fn get_blob(&self, sha: &str) -> Result<Bytes, RepoError> {
        self.state
            .read()
            .await
            .blobs
            .get(sha)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(sha.to_string()))
    }

    async fn put_file(&self, request: PutFile) -> Result<String, RepoError> {
        let mut state = self.state.write().await;

        match (state.files.get(&request.path), request.sha.as_deref()) {
            (Some(current), Some(expected)) if current != expected => {
                return Err(RepoError::Conflict(format!(
                    "{} does not match {}",
                    request.path, expected
                )));
            }
            (Some(_), None) => {
                return Err(RepoError::Conflict(format!(
                    "{} already exists",
                    request.path
                )));
            }
            (None, Some(_)) => return Err(RepoError::NotFound(request.path)),
            _ => {}
        }

        let sha = blob_sha(&request.content);
        state.blobs.insert(sha.clone(), request.content);
        state.files.insert(request.path, sha.clone());
        state.commits.push(request.message);
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(sha)
    }

    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<(), RepoError> {
        if self.failing_deletes.read().await.contains(path) {
            return Err(RepoError::Api {
                status: 500,
                message: format!("injected delete failure for {}", path),
            });
        }

        let mut state = self.state.write().await;
        match state.files.get(path) {
            None => return Err(RepoError::NotFound(path.to_string())),
            Some(current) if current != sha => {
                return Err(RepoError::Conflict(format!("{} does not match {}", path, sha)));
            }
            Some(_) => {}
        }

        state.files.remove(path);
        state.commits.push(message.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn identifier(&self) -> &str {
        "memory://"
    }
}

fn blob_sha(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}
