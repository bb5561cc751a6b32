use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use super::{parse_records, UserRecord, FIELD_SEPARATOR, RECORD_HEADER};
use crate::error::{RepoError, StoreError};
use crate::repo::{ContentRepository, PutFile};

/// Default location of the record file inside the repository.
pub const DEFAULT_USERS_PATH: &str = "data/users.csv";

/// Persistence for user records.
///
/// Implementations must reject an append whose username already exists with
/// [`StoreError::DuplicateUser`], performing no write.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Read every record.
    async fn get_records(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Append a new record.
    async fn append_record(&self, record: UserRecord) -> Result<(), StoreError>;

    /// Rewrite the whole record set.
    async fn replace_records(&self, records: &[UserRecord], message: &str)
        -> Result<(), StoreError>;
}

/// [`UserStore`] backed by a record file in a content repository.
pub struct RepoUserStore<R: ContentRepository> {
    repo: Arc<R>,
    path: String,
}

impl<R: ContentRepository> RepoUserStore<R> {
    pub fn new(repo: Arc<R>, path: impl Into<String>) -> Self {
        Self {
            repo,
            path: path.into(),
        }
    }

    /// Get the record file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    async fn read_text(&self) -> Result<(String, String), StoreError> {
        let (file, content) = self.repo.read_file(&self.path).await?;
        let text = String::from_utf8(content.to_vec())
            .map_err(|e| StoreError::InvalidRecords(format!("{}: {}", self.path, e)))?;
        Ok((file.sha, text))
    }
}

#[async_trait]
impl<R: ContentRepository + 'static> UserStore for RepoUserStore<R> {
    async fn get_records(&self) -> Result<Vec<UserRecord>, StoreError> {
        let (_, text) = self.read_text().await?;
        let records = parse_records(&text);
        debug!(path = %self.path, count = records.len(), "Loaded user records");
        Ok(records)
    }

    async fn append_record(&self, record: UserRecord) -> Result<(), StoreError> {
        let (sha, text) = self.read_text().await?;
        let existing = text.trim();

        // exact line-prefix match, independent of how the row parses
        let prefix = format!("{}{}", record.username, FIELD_SEPARATOR);
        if existing
            .lines()
            .skip(1)
            .any(|line| line.starts_with(&prefix))
        {
            return Err(StoreError::DuplicateUser(record.username));
        }

        let updated = if existing.is_empty() {
            format!("{}\n{}", RECORD_HEADER, record.to_line())
        } else {
            format!("{}\n{}", existing, record.to_line())
        };

        let request = PutFile::update(
            self.path.clone(),
            Bytes::from(updated),
            format!("Signup: {}", record.username),
            sha,
        );
        self.repo.put_file(request).await?;

        info!(username = %record.username, role = %record.role, "Appended user record");
        Ok(())
    }

    async fn replace_records(
        &self,
        records: &[UserRecord],
        message: &str,
    ) -> Result<(), StoreError> {
        let sha = match self.repo.get_file(&self.path).await {
            Ok(file) => Some(file.sha),
            Err(RepoError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        let mut content = String::from(RECORD_HEADER);
        for record in records {
            content.push('\n');
            content.push_str(&record.to_line());
        }

        self.repo
            .put_file(PutFile {
                path: self.path.clone(),
                content: Bytes::from(content),
                message: message.to_string(),
                sha,
            })
            .await?;

        info!(path = %self.path, count = records.len(), "Rewrote user records");
        Ok(())
    }
}
