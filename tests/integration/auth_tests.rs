//! Authentication integration tests.
//!
//! Tests verify:
//! - Signup then login yields a user-role session
//! - Invalid and duplicate signups perform no write
//! - Admin-gated operations reject missing, invalid and non-admin tokens
//! - A server without a session secret fails closed

use axum::http::StatusCode;
use serde_json::json;

use repo_gallery::users::DEFAULT_USERS_PATH;
use repo_gallery::{MemoryRepository, Role, RouterConfig, SessionSigner};

use super::test_utils::{assert_error_body, TestApp, TEST_SECRET};

const ADMIN_ROUTES: &[&str] = &[
    "/api/upload",
    "/api/move_photo",
    "/api/delete_photo",
    "/api/update_exif",
];

// =============================================================================
// Signup and Login
// =============================================================================

#[tokio::test]
async fn test_signup_then_login_issues_user_token() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/signup",
            None,
            json!({"username": "alice", "password": "correct horse"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Signup successful"));

    let (status, body) = app
        .post(
            "/api/login",
            None,
            json!({"username": "alice", "password": "correct horse"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");

    let claims = app.signer.verify(body["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.role, Role::User);
    assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);

    assert_eq!(app.repo.commit_messages().await, vec!["Signup: alice".to_string()]);
}

#[tokio::test]
async fn test_signup_stores_argon2_hash() {
    let app = TestApp::new().await;
    app.post(
        "/api/signup",
        None,
        json!({"username": "alice", "password": "pw-1234"}),
    )
    .await;

    let content = app.repo.contents(DEFAULT_USERS_PATH).await.unwrap();
    let text = String::from_utf8(content.to_vec()).unwrap();
    let line = text.lines().find(|l| l.starts_with("alice,")).unwrap();
    assert!(line.contains("$argon2id$"));
    assert!(line.ends_with(",user"));
    assert!(!line.contains("pw-1234"));
}

#[tokio::test]
async fn test_invalid_signup_does_not_write() {
    let app = TestApp::new().await;

    for username in ["al", "a,lice", "ali\nce"] {
        let (status, body) = app
            .post(
                "/api/signup",
                None,
                json!({"username": username, "password": "pw"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{username:?}");
        assert_error_body(&body, StatusCode::BAD_REQUEST);
    }

    let (status, _) = app.post("/api/signup", None, json!({"username": "alice"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_duplicate_signup_is_conflict() {
    let app = TestApp::new().await;
    let credentials = json!({"username": "alice", "password": "pw"});

    let (status, _) = app.post("/api/signup", None, credentials.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/api/signup", None, credentials).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
    assert_eq!(app.repo.write_count(), 1);
}

#[tokio::test]
async fn test_padded_usernames_rejected_without_write() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post("/api/signup", None, json!({"username": "alice", "password": "pw"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    for username in [" bob", "alice ", " alice"] {
        let (status, body) = app
            .post(
                "/api/signup",
                None,
                json!({"username": username, "password": "pw"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{username:?}");
        assert_eq!(body["code"], "invalid_request");
    }
    assert_eq!(app.repo.write_count(), 1);

    let content = app.repo.contents(DEFAULT_USERS_PATH).await.unwrap();
    let text = String::from_utf8(content.to_vec()).unwrap();
    assert_eq!(text.lines().filter(|l| l.trim_start().starts_with("alice")).count(), 1);
}

#[tokio::test]
async fn test_bcrypt_record_logs_in_and_is_upgraded() {
    let hash = bcrypt::hash("legacy-pw", 4).unwrap();
    let repo = MemoryRepository::new();
    repo.insert(
        DEFAULT_USERS_PATH,
        format!("username,hash,role\nadmin,{hash},admin\nbob,{hash},user\n"),
    )
    .await;
    let app = TestApp::build(repo, RouterConfig::new().with_session_secret(TEST_SECRET));

    let (status, body) = app
        .post(
            "/api/login",
            None,
            json!({"username": "admin", "password": "legacy-pw"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let content = app.repo.contents(DEFAULT_USERS_PATH).await.unwrap();
    let text = String::from_utf8(content.to_vec()).unwrap();
    let admin = text.lines().find(|l| l.starts_with("admin,")).unwrap();
    assert!(admin.starts_with("admin,$argon2id$"), "{admin}");
    assert!(admin.ends_with(",admin"));
    // other rows are left alone
    assert!(text.contains(&format!("bob,{hash},user")));
    assert_eq!(
        app.repo.commit_messages().await,
        vec!["Upgrade credential: admin".to_string()]
    );

    // the upgraded row still accepts the same password
    let (status, _) = app
        .post(
            "/api/login",
            None,
            json!({"username": "admin", "password": "legacy-pw"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.repo.write_count(), 1);
}

#[tokio::test]
async fn test_bcrypt_record_wrong_password() {
    let hash = bcrypt::hash("legacy-pw", 4).unwrap();
    let repo = MemoryRepository::new();
    repo.insert(DEFAULT_USERS_PATH, format!("username,hash,role\nadmin,{hash},admin\n"))
        .await;
    let app = TestApp::build(repo, RouterConfig::new().with_session_secret(TEST_SECRET));

    let (status, body) = app
        .post("/api/login", None, json!({"username": "admin", "password": "nope"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new().await;
    app.post(
        "/api/signup",
        None,
        json!({"username": "alice", "password": "pw"}),
    )
    .await;

    let (wrong_status, wrong) = app
        .post(
            "/api/login",
            None,
            json!({"username": "alice", "password": "nope"}),
        )
        .await;
    let (unknown_status, unknown) = app
        .post(
            "/api/login",
            None,
            json!({"username": "mallory", "password": "nope"}),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["error"], unknown["error"]);
}

#[tokio::test]
async fn test_login_missing_fields() {
    let app = TestApp::new().await;
    let (status, body) = app.post("/api/login", None, json!({"username": "alice"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing credentials");
}

#[tokio::test]
async fn test_login_plaintext_record_rejected() {
    let repo = MemoryRepository::new();
    repo.insert(DEFAULT_USERS_PATH, "username,hash,role\nalice,secret,admin\n")
        .await;
    let app = TestApp::build(repo, RouterConfig::new().with_session_secret(TEST_SECRET));

    let (status, _) = app
        .post(
            "/api/login",
            None,
            json!({"username": "alice", "password": "secret"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Admin Gate
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    for route in ADMIN_ROUTES {
        let (status, body) = app.post(route, None, json!({"filename": "a.jpg"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{route}");
        assert_error_body(&body, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_non_admin_token_is_forbidden() {
    let app = TestApp::new().await;
    let token = app.user_token();

    for route in ADMIN_ROUTES {
        let (status, body) = app
            .post(route, Some(&token), json!({"filename": "a.jpg"}))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{route}");
        assert_eq!(body["code"], "forbidden");
    }
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_tampered_and_foreign_tokens_rejected() {
    let app = TestApp::new().await;

    let token = app.admin_token();
    let mut tampered = token.clone();
    tampered.pop();
    tampered.push(if token.ends_with('A') { 'B' } else { 'A' });

    let foreign = SessionSigner::new("some-other-secret", std::time::Duration::from_secs(60))
        .unwrap()
        .sign("admin", Role::Admin);

    for bad in [tampered.as_str(), foreign.as_str(), "not-a-token"] {
        let (status, _) = app
            .post("/api/delete_photo", Some(bad), json!({"filename": "a.jpg"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{bad}");
    }
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = TestApp::new().await;
    let expired = app.signer.sign_at("admin", Role::Admin, 1_000);

    let (status, body) = app
        .post("/api/delete_photo", Some(&expired), json!({"filename": "a.jpg"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_expired");
}

// =============================================================================
// Missing Secret
// =============================================================================

#[tokio::test]
async fn test_missing_secret_fails_closed() {
    let app = TestApp::with_config(RouterConfig::new()).await;

    let (status, body) = app
        .post(
            "/api/login",
            None,
            json!({"username": "alice", "password": "pw"}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "configuration_error");

    // a token signed with any key cannot be checked without a secret
    let token = app.admin_token();
    let (status, _) = app
        .post("/api/delete_photo", Some(&token), json!({"filename": "a.jpg"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = app
        .post("/api/delete_photo", None, json!({"filename": "a.jpg"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
