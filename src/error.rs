use thiserror::Error;

/// Errors returned by the content repository (GitHub API or in-memory).
#[derive(Debug, Clone, Error)]
pub enum RepoError {
    /// File or blob does not exist at the requested path
    #[error("Not found: {0}")]
    NotFound(String),

    /// Identity marker mismatch or a file already exists where one was created
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The API answered with an unexpected status
    #[error("Repository API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Response body could not be decoded
    #[error("Invalid repository response: {0}")]
    Decode(String),
}

/// Errors raised while reading or writing embedded Exif metadata.
#[derive(Debug, Clone, Error)]
pub enum ExifError {
    /// Payload is not a JPEG stream (missing SOI)
    #[error("Not a JPEG image")]
    NotJpeg,

    /// JPEG segment structure is truncated or corrupt
    #[error("Malformed JPEG: {0}")]
    MalformedJpeg(String),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42, got {0}")]
    InvalidVersion(u16),

    /// Exif block is too small to contain the structure it declares
    #[error("Exif block truncated: need {required} bytes, got {actual}")]
    Truncated { required: usize, actual: usize },

    /// An IFD offset points outside the Exif block
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u32),

    /// Encoded Exif block does not fit in a single APP1 segment
    #[error("Exif block too large: {0} bytes (maximum 65527)")]
    TooLarge(usize),

    /// A tag value cannot be encoded
    #[error("Invalid value for tag 0x{tag:04X}: {message}")]
    InvalidValue { tag: u16, message: String },
}

/// Errors from the credential store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Underlying repository failure
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),

    /// Username is already present in the record file
    #[error("User already exists: {0}")]
    DuplicateUser(String),

    /// Record file is not valid UTF-8 text
    #[error("Invalid record file: {0}")]
    InvalidRecords(String),
}

/// Errors from the offline catalog generator.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Filesystem read or write failed
    #[error("I/O error at {path}: {message}")]
    Io { path: String, message: String },

    /// Image could not be decoded or a thumbnail could not be encoded
    #[error("Image error for {path}: {message}")]
    Image { path: String, message: String },

    /// Catalog could not be serialized
    #[error("Failed to write catalog: {0}")]
    Serialize(String),
}

impl CatalogError {
    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn image(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        CatalogError::Image {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors surfaced at the HTTP handler boundary.
///
/// Each variant maps to exactly one status class; see the `IntoResponse`
/// implementation in `server::handlers`.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Missing or malformed input (400)
    #[error("{0}")]
    Validation(String),

    /// Missing or rejected credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Valid session with an insufficient role (403)
    #[error("{0}")]
    Forbidden(String),

    /// Source file absent (404)
    #[error("{0}")]
    NotFound(String),

    /// Duplicate record or stale identity marker (409)
    #[error("{0}")]
    Conflict(String),

    /// Request body exceeds the configured limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Server is missing required configuration (500)
    #[error("Server configuration error: {0}")]
    Configuration(String),

    /// Storage API failure (500, or 502 for connection failures)
    #[error(transparent)]
    Repo(RepoError),

    /// Anything else that failed on the server side (500)
    #[error("{0}")]
    Internal(String),
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(path) => ApiError::NotFound(format!("File not found: {}", path)),
            RepoError::Conflict(message) => ApiError::Conflict(message),
            other => ApiError::Repo(other),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUser(_) => ApiError::Conflict("User already exists".to_string()),
            // a missing record file is a deployment problem, not a client one
            StoreError::Repo(RepoError::NotFound(path)) => {
                ApiError::Internal(format!("User database not found: {}", path))
            }
            StoreError::Repo(repo) => ApiError::from(repo),
            StoreError::InvalidRecords(message) => ApiError::Internal(message),
        }
    }
}

impl From<ExifError> for ApiError {
    fn from(err: ExifError) -> Self {
        match err {
            ExifError::NotJpeg | ExifError::MalformedJpeg(_) => {
                ApiError::Validation(format!("Unsupported image: {}", err))
            }
            ExifError::InvalidValue { .. } | ExifError::TooLarge(_) => {
                ApiError::Validation(err.to_string())
            }
            other => ApiError::Internal(format!("Failed to rewrite metadata: {}", other)),
        }
    }
}
