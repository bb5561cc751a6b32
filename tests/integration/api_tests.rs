//! HTTP surface integration tests.
//!
//! Tests verify:
//! - Health endpoint
//! - Non-POST methods on API routes answer 405 with a JSON body
//! - Malformed and oversized bodies
//! - CORS headers

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use repo_gallery::RouterConfig;

use super::test_utils::{assert_error_body, to_base64, TestApp, TEST_SECRET};

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/health", None, Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["repository"], "memory://");
}

#[tokio::test]
async fn test_method_not_allowed_is_json() {
    let app = TestApp::new().await;

    for path in [
        "/api/login",
        "/api/signup",
        "/api/upload",
        "/api/move_photo",
        "/api/delete_photo",
        "/api/update_exif",
    ] {
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let (status, body) = app.send(method.clone(), path, None, Body::empty()).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {path}");
            assert_error_body(&body, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body["code"], "method_not_allowed");
        }
    }
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new().await;
    let (status, _) = app
        .send(Method::POST, "/api/rename_photo", None, "{}".to_string())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::POST, "/api/login", None, "{not json".to_string())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let config = RouterConfig::new()
        .with_session_secret(TEST_SECRET)
        .with_body_limit(2048);
    let app = TestApp::with_config(config).await;

    let image = to_base64(&vec![0u8; 8192]);
    let (status, body) = app
        .post(
            "/api/upload",
            Some(&app.admin_token()),
            json!({"image": image, "filename": "big.jpg"}),
        )
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "payload_too_large");
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_cors_preflight() {
    let config = RouterConfig::new()
        .with_session_secret(TEST_SECRET)
        .with_cors_origins(vec!["https://gallery.example".to_string()]);
    let app = TestApp::with_config(config).await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/login")
        .header(header::ORIGIN, "https://gallery.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://gallery.example"
    );
}

#[tokio::test]
async fn test_cors_any_origin_by_default() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://anywhere.example")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
