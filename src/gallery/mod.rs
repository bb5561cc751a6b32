//! Photo operations.
//!
//! [`PhotoService`] implements the mutations the admin interface performs on
//! the photo collection: upload, move between collections, delete, and
//! rewrite embedded metadata. Every change is a commit in the content
//! repository.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      PhotoService                        │
//! │                                                          │
//! │   upload ──┐                                             │
//! │   move ────┼──► PhotoPaths ──► ContentRepository          │
//! │   delete ──┤                        ▲                    │
//! │   update ──┴──► exif::rewrite_metadata ┘                  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod paths;

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use tracing::{error, info, warn};

use crate::error::{ApiError, RepoError};
use crate::exif::{self, ExifFields};
use crate::repo::{ContentRepository, PutFile};

pub use paths::{
    file_name, is_home, sanitize_filename, sanitize_folder, PhotoPaths, DEFAULT_PHOTOS_ROOT,
};

/// Mutations on the photo collection.
///
/// # Type Parameters
///
/// * `R` - The content repository backing the collection
pub struct PhotoService<R: ContentRepository> {
    repo: Arc<R>,
    paths: PhotoPaths,
}

impl<R: ContentRepository> PhotoService<R> {
    pub fn new(repo: Arc<R>, paths: PhotoPaths) -> Self {
        Self { repo, paths }
    }

    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn paths(&self) -> &PhotoPaths {
        &self.paths
    }

    /// Store a new photo and return its repository path.
    ///
    /// `image` is base64, optionally wrapped in a data URI. The stored name
    /// is prefixed with the current Unix time in milliseconds so repeated
    /// uploads of the same file never collide.
    pub async fn upload(
        &self,
        image: &str,
        filename: &str,
        folder: Option<&str>,
    ) -> Result<String, ApiError> {
        if image.is_empty() || filename.is_empty() {
            return Err(ApiError::Validation("Missing image or filename".to_string()));
        }

        let safe_name = sanitize_filename(filename);
        if safe_name.is_empty() {
            return Err(ApiError::Validation(format!(
                "Invalid filename: {:?} has no usable characters",
                filename
            )));
        }
        let folder = folder.map(sanitize_folder).filter(|f| !f.is_empty());

        let content = decode_image_payload(image)?;
        let timestamp = chrono::Utc::now().timestamp_millis();
        let path = self
            .paths
            .upload_path(folder.as_deref(), timestamp, &safe_name);

        let size = content.len();
        self.repo
            .put_file(PutFile::create(
                path.clone(),
                content,
                format!("Web Upload: {}", safe_name),
            ))
            .await?;

        info!(path = %path, size = size, "Uploaded photo");
        Ok(path)
    }

    /// Move a photo to another collection and return its new path.
    ///
    /// The repository has no rename, so this is a create followed by a
    /// delete. If the delete fails, the new copy is removed again and the
    /// move reports failure.
    pub async fn move_photo(
        &self,
        filename: &str,
        target_folder: Option<&str>,
        current_folder: Option<&str>,
    ) -> Result<String, ApiError> {
        if filename.is_empty() {
            return Err(ApiError::Validation("Missing filename".to_string()));
        }

        let source = self.paths.resolve_source(filename, current_folder)?;
        let destination = self.paths.move_destination(&source, target_folder);
        if source == destination {
            return Err(ApiError::Validation(
                "Source and destination are the same.".to_string(),
            ));
        }

        let name = file_name(&source).to_string();
        let label = if is_home(target_folder) {
            "Home".to_string()
        } else {
            match sanitize_folder(target_folder.unwrap_or_default()) {
                f if f.is_empty() => "Home".to_string(),
                f => f,
            }
        };

        let (file, content) = self.repo.read_file(&source).await.map_err(|e| match e {
            RepoError::NotFound(_) => {
                ApiError::NotFound(format!("Source file not found: {}", source))
            }
            other => other.into(),
        })?;

        let new_sha = self
            .repo
            .put_file(PutFile::create(
                destination.clone(),
                content,
                format!("Move {} to {}", name, label),
            ))
            .await
            .map_err(|e| match e {
                RepoError::Conflict(_) => {
                    ApiError::Conflict(format!("Destination already exists: {}", destination))
                }
                other => other.into(),
            })?;

        if let Err(e) = self
            .repo
            .delete_file(&source, &file.sha, &format!("Cleanup moved file: {}", name))
            .await
        {
            error!(
                source = %source,
                destination = %destination,
                error = %e,
                "Failed to remove move source, reverting copy"
            );
            if let Err(revert) = self
                .repo
                .delete_file(&destination, &new_sha, &format!("Revert move of {}", name))
                .await
            {
                warn!(
                    destination = %destination,
                    error = %revert,
                    "Failed to revert move; photo now exists at both paths"
                );
            }
            return Err(ApiError::Internal(format!("Move failed: {}", e)));
        }

        info!(source = %source, destination = %destination, "Moved photo");
        Ok(destination)
    }

    /// Delete a photo and return the removed path.
    pub async fn delete(&self, filename: &str) -> Result<String, ApiError> {
        if filename.is_empty() {
            return Err(ApiError::Validation("Missing filename".to_string()));
        }
        let path = self.paths.resolve(filename)?;

        let file = self.repo.get_file(&path).await?;
        self.repo
            .delete_file(&path, &file.sha, &format!("Delete photo: {}", filename))
            .await?;

        info!(path = %path, "Deleted photo");
        Ok(path)
    }

    /// Rewrite the embedded metadata of a JPEG photo and return its path.
    ///
    /// The update is based on the identity marker read here, so a concurrent
    /// change to the same file makes it fail with a conflict.
    pub async fn update_metadata(
        &self,
        filename: &str,
        fields: &ExifFields,
    ) -> Result<String, ApiError> {
        if filename.is_empty() {
            return Err(ApiError::Validation("Missing filename or exifData".to_string()));
        }
        if fields.is_empty() {
            return Err(ApiError::Validation("No metadata fields to update".to_string()));
        }
        let path = self.paths.resolve(filename)?;

        let (file, content) = self.repo.read_file(&path).await?;
        let updated = exif::rewrite_metadata(&content, fields)?;

        self.repo
            .put_file(PutFile::update(
                path.clone(),
                updated,
                format!("Update EXIF for {}", filename),
                file.sha,
            ))
            .await?;

        info!(path = %path, "Updated photo metadata");
        Ok(path)
    }
}

/// Decode an uploaded image: raw base64 or a `data:...;base64,` URI.
pub fn decode_image_payload(image: &str) -> Result<Bytes, ApiError> {
    let encoded = match image.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| ApiError::Validation("Malformed data URI".to_string()))?,
        None => image,
    };

    let cleaned: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| ApiError::Validation(format!("Invalid image data: {}", e)))?;

    if bytes.is_empty() {
        return Err(ApiError::Validation("Image data is empty".to_string()));
    }
    Ok(Bytes::from(bytes))
}
