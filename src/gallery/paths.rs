//! Photo path rules.
//!
//! Every photo lives under a single root directory of the repository,
//! either directly or one collection folder deep:
//!
//! ```text
//! Photos/1712345678901-dunes.jpg
//! Photos/Best Shots/1712345678901-dunes.jpg
//! ```

use crate::error::ApiError;

/// Default photos root inside the repository.
pub const DEFAULT_PHOTOS_ROOT: &str = "Photos";

/// Folder name clients use for the root collection.
pub const HOME_FOLDER: &str = "home";

/// Keep only `[A-Za-z0-9._-]`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '.' | '_' | '-'))
        .collect()
}

/// Keep only `[A-Za-z0-9 _-]`, then trim surrounding spaces.
pub fn sanitize_folder(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// True for an absent folder, an empty one, or `home` in any case.
pub fn is_home(folder: Option<&str>) -> bool {
    match folder {
        None => true,
        Some(f) => {
            let f = f.trim();
            f.is_empty() || f.eq_ignore_ascii_case(HOME_FOLDER)
        }
    }
}

/// Path rules bound to one photos root.
#[derive(Debug, Clone)]
pub struct PhotoPaths {
    root: String,
}

impl PhotoPaths {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            root: root.trim_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn prefix(&self) -> String {
        format!("{}/", self.root)
    }

    /// Destination of an upload: `root/{folder/}{millis}-{name}`.
    ///
    /// `safe_name` and `folder` must already be sanitized.
    pub fn upload_path(&self, folder: Option<&str>, timestamp_millis: i64, safe_name: &str) -> String {
        match folder.filter(|f| !f.is_empty()) {
            Some(folder) => format!("{}/{}/{}-{}", self.root, folder, timestamp_millis, safe_name),
            None => format!("{}/{}-{}", self.root, timestamp_millis, safe_name),
        }
    }

    /// Resolve a client-supplied photo name to a repository path.
    ///
    /// Names already carrying the root prefix are used as-is; anything else
    /// is taken relative to the root.
    pub fn resolve(&self, filename: &str) -> Result<String, ApiError> {
        let path = if filename.starts_with(&self.prefix()) {
            filename.to_string()
        } else {
            format!("{}{}", self.prefix(), filename)
        };
        check_path(&path)?;
        Ok(path)
    }

    /// Resolve the source of a move.
    ///
    /// Without the root prefix, a non-home `current_folder` places the file
    /// in that collection.
    pub fn resolve_source(
        &self,
        filename: &str,
        current_folder: Option<&str>,
    ) -> Result<String, ApiError> {
        if filename.starts_with(&self.prefix()) || is_home(current_folder) {
            return self.resolve(filename);
        }
        let folder = current_folder.unwrap_or_default().trim().trim_matches('/');
        self.resolve(&format!("{}/{}", folder, filename))
    }

    /// Destination of a move: the file's own name under the target folder.
    pub fn move_destination(&self, source: &str, target_folder: Option<&str>) -> String {
        let name = file_name(source);
        if is_home(target_folder) {
            return format!("{}/{}", self.root, name);
        }
        let folder = sanitize_folder(target_folder.unwrap_or_default());
        if folder.is_empty() {
            format!("{}/{}", self.root, name)
        } else {
            format!("{}/{}/{}", self.root, folder, name)
        }
    }
}

impl Default for PhotoPaths {
    fn default() -> Self {
        Self::new(DEFAULT_PHOTOS_ROOT)
    }
}

/// Last path segment.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn check_path(path: &str) -> Result<(), ApiError> {
    let bad_segment = path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad_segment || path.contains('\\') {
        return Err(ApiError::Validation(format!("Invalid photo path: {}", path)));
    }
    Ok(())
}
