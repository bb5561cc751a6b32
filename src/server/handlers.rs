//! HTTP request handlers for the gallery API.
//!
//! # Endpoints
//!
//! - `POST /api/login` - Exchange credentials for a session token
//! - `POST /api/signup` - Create a `user` account
//! - `POST /api/upload` - Upload a photo (admin, or anyone if configured)
//! - `POST /api/move_photo` - Move a photo between collections (admin)
//! - `POST /api/delete_photo` - Delete a photo (admin)
//! - `POST /api/update_exif` - Rewrite a photo's metadata (admin)
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequest, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{ApiError, RepoError};
use crate::exif::ExifFields;
use crate::gallery::PhotoService;
use crate::repo::ContentRepository;
use crate::users::{Accounts, Role};

use super::auth::{AdminSession, AuthError, SessionKeys};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<R: ContentRepository> {
    /// Photo mutations against the content repository
    pub photos: Arc<PhotoService<R>>,

    /// Login and signup
    pub accounts: Accounts,

    /// Session token signer; `None` when no secret is configured
    pub sessions: SessionKeys,

    /// Accept uploads without a session
    pub allow_anonymous_upload: bool,
}

impl<R: ContentRepository> AppState<R> {
    /// Create application state without a session signer.
    pub fn new(photos: PhotoService<R>, accounts: Accounts) -> Self {
        Self {
            photos: Arc::new(photos),
            accounts,
            sessions: SessionKeys::default(),
            allow_anonymous_upload: false,
        }
    }

    /// Set the session signer.
    pub fn with_sessions(mut self, sessions: SessionKeys) -> Self {
        self.sessions = sessions;
        self
    }

    /// Allow uploads without a session.
    pub fn with_anonymous_upload(mut self, allow: bool) -> Self {
        self.allow_anonymous_upload = allow;
        self
    }
}

impl<R: ContentRepository> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            photos: Arc::clone(&self.photos),
            accounts: self.accounts.clone(),
            sessions: self.sessions.clone(),
            allow_anonymous_upload: self.allow_anonymous_upload,
        }
    }
}

impl<R: ContentRepository> FromRef<AppState<R>> for SessionKeys {
    fn from_ref(state: &AppState<R>) -> Self {
        state.sessions.clone()
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// JSON body extractor that reports rejections as [`ApiError`].
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(ApiError::PayloadTooLarge(rejection.body_text()))
            }
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

/// Body of login and signup requests.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsRequest {
    fn required(&self) -> Result<(&str, &str), ApiError> {
        match (non_empty(&self.username), non_empty(&self.password)) {
            (Some(username), Some(password)) => Ok((username, password)),
            _ => Err(ApiError::Validation("Missing credentials".to_string())),
        }
    }
}

/// Body of upload requests.
#[derive(Debug, Default, Deserialize)]
pub struct UploadRequest {
    /// Base64 image data, optionally as a data URI
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub filename: Option<String>,

    /// Target collection; absent means the root
    #[serde(default)]
    pub folder: Option<String>,
}

/// Body of move requests.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    #[serde(default)]
    pub filename: Option<String>,

    /// Destination collection; empty or `home` means the root
    #[serde(default)]
    pub target_folder: Option<String>,

    /// Collection the file currently lives in
    #[serde(default)]
    pub current_folder: Option<String>,
}

/// Body of delete requests.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub filename: Option<String>,
}

/// Body of metadata update requests.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExifRequest {
    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default, alias = "exifFields")]
    pub exif_data: Option<ExifFields>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// =============================================================================
// Response Types
// =============================================================================

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Error kind identifier (e.g., "not_found", "invalid_request")
    pub code: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        code: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: Role,
}

/// Plain confirmation.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,

    /// Repository path of the stored photo
    pub path: String,
}

/// Successful move.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    pub message: String,
    pub new_path: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Backing repository identifier
    pub repository: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ApiError to HTTP response.
///
/// Client errors are logged at DEBUG, server errors at ERROR.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            ApiError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            ApiError::Repo(RepoError::Connection(_)) => {
                (StatusCode::BAD_GATEWAY, "connection_error")
            }
            ApiError::Repo(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(code = code, status = status.as_u16(), "Server error: {}", message);
        } else {
            debug!(code = code, status = status.as_u16(), "Client error: {}", message);
        }

        let body = ErrorResponse::with_status(code, message, status);
        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden { .. } => ApiError::Forbidden(err.to_string()),
            AuthError::NotConfigured => {
                ApiError::Configuration("session secret is not set".to_string())
            }
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle login requests.
///
/// # Request
///
/// `POST /api/login` with `{"username": "...", "password": "..."}`
///
/// # Response
///
/// `{"token": "...", "username": "...", "role": "admin"|"user"}`
pub async fn login_handler<R: ContentRepository + 'static>(
    State(state): State<AppState<R>>,
    JsonBody(request): JsonBody<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (username, password) = request.required()?;
    let SessionKeys(signer) = &state.sessions;
    let signer = signer.as_ref().ok_or(AuthError::NotConfigured)?;

    let record = state.accounts.authenticate(username, password).await?;
    let token = signer.sign(&record.username, record.role);

    info!(username = %record.username, role = %record.role, "User logged in");
    Ok(Json(LoginResponse {
        token,
        username: record.username,
        role: record.role,
    }))
}

/// Handle signup requests. New accounts always get the `user` role.
pub async fn signup_handler<R: ContentRepository + 'static>(
    State(state): State<AppState<R>>,
    JsonBody(request): JsonBody<CredentialsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (username, password) = request.required()?;
    state.accounts.register(username, password).await?;

    Ok(Json(MessageResponse {
        message: "Signup successful! You can now log in.".to_string(),
    }))
}

/// Handle photo uploads.
///
/// Requires an admin session unless anonymous uploads are enabled.
pub async fn upload_handler<R: ContentRepository + 'static>(
    State(state): State<AppState<R>>,
    session: Result<AdminSession, AuthError>,
    JsonBody(request): JsonBody<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    if !state.allow_anonymous_upload {
        session?;
    }

    let path = state
        .photos
        .upload(
            request.image.as_deref().unwrap_or_default(),
            request.filename.as_deref().unwrap_or_default(),
            request.folder.as_deref(),
        )
        .await?;

    Ok(Json(UploadResponse {
        message: "Upload successful!".to_string(),
        path,
    }))
}

/// Handle photo moves between collections.
pub async fn move_photo_handler<R: ContentRepository + 'static>(
    State(state): State<AppState<R>>,
    AdminSession(claims): AdminSession,
    JsonBody(request): JsonBody<MoveRequest>,
) -> Result<Json<MoveResponse>, ApiError> {
    let new_path = state
        .photos
        .move_photo(
            request.filename.as_deref().unwrap_or_default(),
            request.target_folder.as_deref(),
            request.current_folder.as_deref(),
        )
        .await?;

    debug!(username = %claims.username, new_path = %new_path, "Move requested");
    Ok(Json(MoveResponse {
        message: "Move successful!".to_string(),
        new_path,
    }))
}

/// Handle photo deletion.
pub async fn delete_photo_handler<R: ContentRepository + 'static>(
    State(state): State<AppState<R>>,
    AdminSession(claims): AdminSession,
    JsonBody(request): JsonBody<DeleteRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let path = state
        .photos
        .delete(request.filename.as_deref().unwrap_or_default())
        .await?;

    debug!(username = %claims.username, path = %path, "Delete requested");
    Ok(Json(MessageResponse {
        message: "Photo deleted successfully".to_string(),
    }))
}

/// Handle metadata updates.
///
/// # Request
///
/// ```json
/// {"filename": "Dogs/a.jpg", "exifData": {"fNumber": 1.8, "exposureTime": "1/250"}}
/// ```
pub async fn update_exif_handler<R: ContentRepository + 'static>(
    State(state): State<AppState<R>>,
    AdminSession(_): AdminSession,
    JsonBody(request): JsonBody<UpdateExifRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (Some(filename), Some(fields)) = (non_empty(&request.filename), &request.exif_data) else {
        return Err(ApiError::Validation(
            "Missing filename or exifData".to_string(),
        ));
    };

    state.photos.update_metadata(filename, fields).await?;

    Ok(Json(MessageResponse {
        message: "EXIF Updated Successfully".to_string(),
    }))
}

/// Handle health check requests.
pub async fn health_handler<R: ContentRepository + 'static>(
    State(state): State<AppState<R>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        repository: state.photos.repo().identifier().to_string(),
    })
}

/// Fallback for unsupported methods on API routes.
pub async fn method_not_allowed_handler() -> Response {
    let status = StatusCode::METHOD_NOT_ALLOWED;
    let body = ErrorResponse::with_status("method_not_allowed", "Method Not Allowed", status);
    (status, Json(body)).into_response()
}
