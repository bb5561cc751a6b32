//! Router configuration for the gallery API.
//!
//! This module defines the HTTP routes and applies the body limit, CORS and
//! tracing layers.
//!
//! # Route Structure
//!
//! ```text
//! /health              - Health check (public)
//! /api/login           - Issue a session token (public)
//! /api/signup          - Create an account (public)
//! /api/upload          - Upload a photo (admin unless anonymous uploads are on)
//! /api/move_photo      - Move a photo (admin)
//! /api/delete_photo    - Delete a photo (admin)
//! /api/update_exif     - Rewrite photo metadata (admin)
//! ```
//!
//! Every `/api` route answers other methods with a JSON 405.
//!
//! # Example
//!
//! ```ignore
//! use repo_gallery::server::routes::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new()
//!     .with_session_secret("my-secret-key")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(photos, accounts, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::auth::{SessionKeys, SessionSigner, DEFAULT_SESSION_TTL};
use super::handlers::{
    delete_photo_handler, health_handler, login_handler, method_not_allowed_handler,
    move_photo_handler, signup_handler, update_exif_handler, upload_handler, AppState,
};
use crate::gallery::PhotoService;
use crate::repo::ContentRepository;
use crate::users::Accounts;

/// Default request body limit: 25 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 25 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Secret for signing session tokens (None = token operations fail closed)
    pub session_secret: Option<String>,

    /// Session token lifetime
    pub session_ttl: Duration,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Maximum request body size in bytes
    pub body_limit: usize,

    /// Whether uploads are accepted without a session
    pub allow_anonymous_upload: bool,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - No session secret (login and admin routes answer 500)
    /// - Sessions last 7 days
    /// - CORS allows any origin
    /// - Bodies are limited to 25 MiB
    /// - Uploads require an admin session
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            session_secret: None,
            session_ttl: DEFAULT_SESSION_TTL,
            cors_origins: None,
            body_limit: DEFAULT_BODY_LIMIT,
            allow_anonymous_upload: false,
            enable_tracing: true,
        }
    }

    /// Set the session signing secret.
    pub fn with_session_secret(mut self, secret: impl Into<String>) -> Self {
        self.session_secret = Some(secret.into());
        self
    }

    /// Set the session token lifetime.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the maximum request body size.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Accept uploads without a session.
    pub fn with_anonymous_upload(mut self, allow: bool) -> Self {
        self.allow_anonymous_upload = allow;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Build the session signer, if a secret is configured.
    fn session_keys(&self) -> SessionKeys {
        let secret = self.session_secret.as_deref().unwrap_or_default();
        match SessionSigner::new(secret, self.session_ttl) {
            Ok(signer) => SessionKeys(Some(Arc::new(signer))),
            Err(_) => {
                warn!("No session secret configured; login and admin routes will answer 500");
                SessionKeys(None)
            }
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `photos` - Photo operations over the content repository
/// * `accounts` - Login and signup over the user store
/// * `config` - Router configuration
pub fn create_router<R>(photos: PhotoService<R>, accounts: Accounts, config: RouterConfig) -> Router
where
    R: ContentRepository + 'static,
{
    let app_state = AppState::new(photos, accounts)
        .with_sessions(config.session_keys())
        .with_anonymous_upload(config.allow_anonymous_upload);

    let cors = build_cors_layer(&config);

    let api_routes = Router::new()
        .route(
            "/login",
            post(login_handler::<R>).fallback(method_not_allowed_handler),
        )
        .route(
            "/signup",
            post(signup_handler::<R>).fallback(method_not_allowed_handler),
        )
        .route(
            "/upload",
            post(upload_handler::<R>).fallback(method_not_allowed_handler),
        )
        .route(
            "/move_photo",
            post(move_photo_handler::<R>).fallback(method_not_allowed_handler),
        )
        .route(
            "/delete_photo",
            post(delete_photo_handler::<R>).fallback(method_not_allowed_handler),
        )
        .route(
            "/update_exif",
            post(update_exif_handler::<R>).fallback(method_not_allowed_handler),
        );

    let router = Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_handler::<R>))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        // no origins: cross-origin requests get no CORS headers
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
