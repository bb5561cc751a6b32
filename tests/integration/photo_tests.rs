//! Photo mutation integration tests.
//!
//! Tests verify:
//! - Uploads land at timestamped, sanitized paths
//! - Moves between collections and back home
//! - Same-path moves and missing files fail without writing
//! - Deletes of missing files return 404 without writing

use axum::http::StatusCode;
use serde_json::json;

use repo_gallery::{MemoryRepository, RouterConfig};

use super::test_utils::{create_test_jpeg, is_valid_jpeg, to_base64, TestApp, TEST_SECRET};

/// Split an upload path into folder part and `{millis}-{name}` part.
fn split_upload_path(path: &str) -> (&str, i64, &str) {
    let (dir, file) = path.rsplit_once('/').unwrap();
    let (millis, name) = file.split_once('-').unwrap();
    (dir, millis.parse().unwrap(), name)
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_upload_to_root() {
    let app = TestApp::new().await;
    let jpeg = create_test_jpeg();

    let (status, body) = app
        .post(
            "/api/upload",
            Some(&app.admin_token()),
            json!({"image": to_base64(&jpeg), "filename": "My Photo (1).jpg"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Upload successful!");

    let path = body["path"].as_str().unwrap();
    let (dir, millis, name) = split_upload_path(path);
    assert_eq!(dir, "Photos");
    assert!(millis > 1_600_000_000_000);
    assert_eq!(name, "MyPhoto1.jpg");

    assert_eq!(app.repo.contents(path).await.unwrap().as_ref(), jpeg.as_slice());
    assert_eq!(
        app.repo.commit_messages().await,
        vec!["Web Upload: MyPhoto1.jpg".to_string()]
    );
}

#[tokio::test]
async fn test_upload_data_uri_into_folder() {
    let app = TestApp::new().await;
    let jpeg = create_test_jpeg();
    let data_uri = format!("data:image/jpeg;base64,{}", to_base64(&jpeg));

    let (status, body) = app
        .post(
            "/api/upload",
            Some(&app.admin_token()),
            json!({"image": data_uri, "filename": "a.jpg", "folder": " Road Trip! "}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let path = body["path"].as_str().unwrap();
    assert!(path.starts_with("Photos/Road Trip/"), "{path}");
    assert!(is_valid_jpeg(&app.repo.contents(path).await.unwrap()));
}

#[tokio::test]
async fn test_upload_rejects_bad_input() {
    let app = TestApp::new().await;
    let token = app.admin_token();
    let image = to_base64(&create_test_jpeg());

    let cases = [
        json!({"filename": "a.jpg"}),
        json!({"image": image}),
        json!({"image": image, "filename": "日本"}),
        json!({"image": "***not base64***", "filename": "a.jpg"}),
    ];
    for body in cases {
        let (status, response) = app.post("/api/upload", Some(&token), body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["code"], "invalid_request");
    }
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_anonymous_upload_when_enabled() {
    let config = RouterConfig::new()
        .with_session_secret(TEST_SECRET)
        .with_anonymous_upload(true);
    let app = TestApp::with_config(config).await;

    let (status, body) = app
        .post(
            "/api/upload",
            None,
            json!({"image": to_base64(&create_test_jpeg()), "filename": "a.jpg"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["path"].as_str().unwrap().starts_with("Photos/"));

    // other admin routes stay gated
    let (status, _) = app
        .post("/api/delete_photo", None, json!({"filename": "a.jpg"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Move
// =============================================================================

async fn app_with_photo(path: &str) -> TestApp {
    let repo = MemoryRepository::new();
    repo.insert("data/users.csv", "username,hash,role\n").await;
    repo.insert(path, create_test_jpeg()).await;
    TestApp::build(repo, RouterConfig::new().with_session_secret(TEST_SECRET))
}

#[tokio::test]
async fn test_move_into_collection() {
    let app = app_with_photo("Photos/a.jpg").await;

    let (status, body) = app
        .post(
            "/api/move_photo",
            Some(&app.admin_token()),
            json!({"filename": "a.jpg", "targetFolder": "Dogs"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newPath"], "Photos/Dogs/a.jpg");

    assert!(app.repo.exists("Photos/Dogs/a.jpg").await);
    assert!(!app.repo.exists("Photos/a.jpg").await);
    assert_eq!(
        app.repo.commit_messages().await,
        vec![
            "Move a.jpg to Dogs".to_string(),
            "Cleanup moved file: a.jpg".to_string()
        ]
    );
}

#[tokio::test]
async fn test_move_home() {
    for target in ["", "home", "HOME"] {
        let app = app_with_photo("Photos/Dogs/a.jpg").await;

        let (status, body) = app
            .post(
                "/api/move_photo",
                Some(&app.admin_token()),
                json!({"filename": "a.jpg", "targetFolder": target, "currentFolder": "Dogs"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{target:?}");
        assert_eq!(body["newPath"], "Photos/a.jpg");
        assert!(app.repo.exists("Photos/a.jpg").await);
        assert_eq!(app.repo.commit_messages().await[0], "Move a.jpg to Home");
    }
}

#[tokio::test]
async fn test_move_with_root_prefixed_filename() {
    let app = app_with_photo("Photos/Dogs/a.jpg").await;

    let (status, body) = app
        .post(
            "/api/move_photo",
            Some(&app.admin_token()),
            json!({"filename": "Photos/Dogs/a.jpg", "targetFolder": "Cats"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newPath"], "Photos/Cats/a.jpg");
}

#[tokio::test]
async fn test_same_path_move_rejected_without_write() {
    let app = app_with_photo("Photos/a.jpg").await;

    let (status, body) = app
        .post(
            "/api/move_photo",
            Some(&app.admin_token()),
            json!({"filename": "a.jpg", "targetFolder": "home"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Source and destination are the same.");
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_move_missing_source() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/move_photo",
            Some(&app.admin_token()),
            json!({"filename": "ghost.jpg", "targetFolder": "Dogs"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Source file not found: Photos/ghost.jpg");
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_move_onto_existing_photo_is_conflict() {
    let app = app_with_photo("Photos/a.jpg").await;
    app.repo.insert("Photos/Dogs/a.jpg", "already here").await;

    let (status, body) = app
        .post(
            "/api/move_photo",
            Some(&app.admin_token()),
            json!({"filename": "a.jpg", "targetFolder": "Dogs"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
    assert!(app.repo.exists("Photos/a.jpg").await);
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_move_reverts_when_cleanup_fails() {
    let app = app_with_photo("Photos/a.jpg").await;
    app.repo.fail_deletes_for("Photos/a.jpg").await;

    let (status, body) = app
        .post(
            "/api/move_photo",
            Some(&app.admin_token()),
            json!({"filename": "a.jpg", "targetFolder": "Dogs"}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Move failed"));

    assert!(app.repo.exists("Photos/a.jpg").await);
    assert!(!app.repo.exists("Photos/Dogs/a.jpg").await);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_photo() {
    let app = app_with_photo("Photos/Dogs/a.jpg").await;

    let (status, body) = app
        .post(
            "/api/delete_photo",
            Some(&app.admin_token()),
            json!({"filename": "Photos/Dogs/a.jpg"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Photo deleted successfully");
    assert!(!app.repo.exists("Photos/Dogs/a.jpg").await);
    assert_eq!(
        app.repo.commit_messages().await,
        vec!["Delete photo: Photos/Dogs/a.jpg".to_string()]
    );
}

#[tokio::test]
async fn test_delete_missing_file_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/delete_photo",
            Some(&app.admin_token()),
            json!({"filename": "ghost.jpg"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_delete_rejects_traversal() {
    let app = app_with_photo("Photos/a.jpg").await;

    for filename in ["../data/users.csv", "Dogs/../../secret", ""] {
        let (status, _) = app
            .post(
                "/api/delete_photo",
                Some(&app.admin_token()),
                json!({"filename": filename}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{filename:?}");
    }
    assert_eq!(app.repo.write_count(), 0);
}
