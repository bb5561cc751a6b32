//! Test utilities for integration tests.
//!
//! This module builds a router over an in-memory repository and provides
//! helpers for sending JSON requests and creating test JPEGs.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use serde_json::Value;
use tower::ServiceExt;

use repo_gallery::users::{RepoUserStore, DEFAULT_USERS_PATH};
use repo_gallery::{
    create_router, Accounts, Argon2Hasher, MemoryRepository, PhotoPaths, PhotoService, Role,
    RouterConfig, SessionSigner,
};

pub const TEST_SECRET: &str = "test-secret-key-for-sessions";

/// Record file with only the header line.
pub const EMPTY_USERS: &str = "username,hash,role\n";

// =============================================================================
// Test Application
// =============================================================================

/// A router wired to an in-memory repository.
pub struct TestApp {
    pub router: Router,
    pub repo: MemoryRepository,
    pub signer: SessionSigner,
}

impl TestApp {
    /// App with a session secret and an empty user file.
    pub async fn new() -> Self {
        Self::with_config(RouterConfig::new().with_session_secret(TEST_SECRET)).await
    }

    /// App with custom router configuration and an empty user file.
    pub async fn with_config(config: RouterConfig) -> Self {
        let repo = MemoryRepository::new();
        repo.insert(DEFAULT_USERS_PATH, EMPTY_USERS).await;
        Self::build(repo, config)
    }

    /// App over an existing repository.
    pub fn build(repo: MemoryRepository, config: RouterConfig) -> Self {
        let shared = Arc::new(repo.clone());
        let store = RepoUserStore::new(Arc::clone(&shared), DEFAULT_USERS_PATH);
        let accounts = Accounts::new(Arc::new(store), Arc::new(fast_hasher()));
        let photos = PhotoService::new(shared, PhotoPaths::default());

        let router = create_router(photos, accounts, config.with_tracing(false));
        let signer = SessionSigner::new(TEST_SECRET, Duration::from_secs(3600))
            .expect("test secret is not empty");

        Self {
            router,
            repo,
            signer,
        }
    }

    pub fn admin_token(&self) -> String {
        self.signer.sign("admin", Role::Admin)
    }

    pub fn user_token(&self) -> String {
        self.signer.sign("viewer", Role::User)
    }

    /// POST a JSON body, optionally with a bearer token.
    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, path, token, body.to_string()).await
    }

    /// Send a request with a raw body and decode the JSON response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: impl Into<Body>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(body.into()).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Argon2 with minimal cost so tests stay fast.
pub fn fast_hasher() -> Argon2Hasher {
    Argon2Hasher::new(1024, 1, 1).unwrap()
}

/// Create a small baseline JPEG.
pub fn create_test_jpeg() -> Vec<u8> {
    let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 64]));
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, 90);
    encoder.encode_image(&img).unwrap();
    buf
}

pub fn to_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Check if data is a JPEG stream.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0xFF && data[1] == 0xD8
}

/// Assert the common error body shape.
pub fn assert_error_body(body: &Value, status: StatusCode) {
    assert!(body["error"].is_string(), "missing error message: {body}");
    assert!(body["code"].is_string(), "missing error code: {body}");
    assert_eq!(body["status"], status.as_u16());
}
