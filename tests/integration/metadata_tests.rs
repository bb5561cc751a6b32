//! Metadata update integration tests.
//!
//! Tests verify:
//! - Requested fields are written into the stored JPEG's Exif block
//! - Exposure, f-number, focal length and ISO conversions
//! - Existing tags survive an update
//! - Missing files, non-JPEG payloads and bad numbers are rejected

use axum::http::StatusCode;
use serde_json::{json, Value};

use repo_gallery::exif::tags::{exif, image};
use repo_gallery::exif::{insert_exif, read_exif, ExifData, IfdKind, Rational, TagValue};
use repo_gallery::{MemoryRepository, RouterConfig};

use super::test_utils::{create_test_jpeg, is_valid_jpeg, TestApp, TEST_SECRET};

const PHOTO: &str = "Photos/Dogs/a.jpg";

async fn app_with(content: Vec<u8>) -> TestApp {
    let repo = MemoryRepository::new();
    repo.insert("data/users.csv", "username,hash,role\n").await;
    repo.insert(PHOTO, content).await;
    TestApp::build(repo, RouterConfig::new().with_session_secret(TEST_SECRET))
}

async fn update(app: &TestApp, body: Value) -> (StatusCode, Value) {
    app.post("/api/update_exif", Some(&app.admin_token()), body).await
}

async fn stored_exif(app: &TestApp) -> ExifData {
    let content = app.repo.contents(PHOTO).await.unwrap();
    assert!(is_valid_jpeg(&content));
    read_exif(&content).unwrap().expect("photo should carry an Exif block")
}

fn rational(data: &ExifData, tag: u16) -> Rational {
    match data.get(IfdKind::Exif, tag) {
        Some(TagValue::Rational(values)) => values[0],
        other => panic!("expected rational for 0x{tag:04X}, got {other:?}"),
    }
}

// =============================================================================
// Successful Updates
// =============================================================================

#[tokio::test]
async fn test_update_writes_all_fields() {
    let app = app_with(create_test_jpeg()).await;

    let (status, body) = update(
        &app,
        json!({
            "filename": "Dogs/a.jpg",
            "exifData": {
                "title": "Rex at the beach",
                "make": "Fujifilm",
                "model": "X-T5",
                "lens": "XF35mmF1.4 R",
                "iso": "400",
                "focalLength": "35.4mm",
                "fNumber": 1.8,
                "exposureTime": "1/50"
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "EXIF Updated Successfully");

    let data = stored_exif(&app).await;
    let text = |kind, tag| data.get(kind, tag).and_then(TagValue::as_str).map(str::to_string);
    assert_eq!(
        text(IfdKind::Zeroth, image::IMAGE_DESCRIPTION).as_deref(),
        Some("Rex at the beach")
    );
    assert_eq!(text(IfdKind::Zeroth, image::MAKE).as_deref(), Some("Fujifilm"));
    assert_eq!(text(IfdKind::Zeroth, image::MODEL).as_deref(), Some("X-T5"));
    assert_eq!(text(IfdKind::Exif, exif::LENS_MODEL).as_deref(), Some("XF35mmF1.4 R"));

    assert_eq!(
        data.get(IfdKind::Exif, exif::ISO_SPEED_RATINGS),
        Some(&TagValue::Short(vec![400]))
    );
    assert_eq!(rational(&data, exif::FOCAL_LENGTH), Rational::new(35, 1));
    assert_eq!(rational(&data, exif::F_NUMBER), Rational::new(180, 100));
    assert_eq!(rational(&data, exif::EXPOSURE_TIME), Rational::new(1, 50));

    assert_eq!(
        app.repo.commit_messages().await,
        vec!["Update EXIF for Dogs/a.jpg".to_string()]
    );
}

#[tokio::test]
async fn test_exposure_conversions() {
    let cases = [
        (json!("1/50"), Rational::new(1, 50)),
        (json!("2"), Rational::new(2, 1)),
        (json!("0.02"), Rational::new(1, 50)),
        (json!(2.5), Rational::new(250, 100)),
        (json!(0.004), Rational::new(1, 250)),
    ];

    for (input, expected) in cases {
        let app = app_with(create_test_jpeg()).await;
        let (status, _) = update(
            &app,
            json!({"filename": PHOTO, "exifData": {"exposureTime": input}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{input}");
        assert_eq!(
            rational(&stored_exif(&app).await, exif::EXPOSURE_TIME),
            expected,
            "{input}"
        );
    }
}

#[tokio::test]
async fn test_existing_tags_survive() {
    let mut original = ExifData::default();
    original.set(IfdKind::Zeroth, image::MAKE, TagValue::Ascii("Canon".into()));
    original.set(
        IfdKind::Exif,
        exif::DATE_TIME_ORIGINAL,
        TagValue::Ascii("2023:07:14 18:30:00".into()),
    );
    let jpeg = insert_exif(&create_test_jpeg(), &original.encode().unwrap())
        .unwrap()
        .to_vec();
    let app = app_with(jpeg).await;

    let (status, _) = update(
        &app,
        json!({"filename": PHOTO, "exifFields": {"model": "EOS R5", "iso": 0}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let data = stored_exif(&app).await;
    assert_eq!(
        data.get(IfdKind::Zeroth, image::MAKE),
        Some(&TagValue::Ascii("Canon".into()))
    );
    assert_eq!(
        data.get(IfdKind::Zeroth, image::MODEL),
        Some(&TagValue::Ascii("EOS R5".into()))
    );
    assert_eq!(
        data.get(IfdKind::Exif, exif::DATE_TIME_ORIGINAL),
        Some(&TagValue::Ascii("2023:07:14 18:30:00".into()))
    );
    // zero ISO counts as not provided
    assert!(data.get(IfdKind::Exif, exif::ISO_SPEED_RATINGS).is_none());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_update_missing_file() {
    let app = TestApp::new().await;

    let (status, _) = update(
        &app,
        json!({"filename": "ghost.jpg", "exifData": {"title": "x"}}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_update_rejects_non_jpeg() {
    let app = app_with(b"GIF89a not a jpeg".to_vec()).await;

    let (status, body) = update(
        &app,
        json!({"filename": PHOTO, "exifData": {"title": "x"}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_update_rejects_bad_numbers() {
    let app = app_with(create_test_jpeg()).await;

    for fields in [
        json!({"fNumber": "wide open"}),
        json!({"exposureTime": "1/0"}),
        json!({"iso": "fast"}),
    ] {
        let (status, _) = update(&app, json!({"filename": PHOTO, "exifData": fields})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{fields}");
    }
    assert_eq!(app.repo.write_count(), 0);
}

#[tokio::test]
async fn test_update_requires_fields() {
    let app = app_with(create_test_jpeg()).await;

    for body in [
        json!({"filename": PHOTO}),
        json!({"exifData": {"title": "x"}}),
        json!({"filename": PHOTO, "exifData": {"iso": "", "fNumber": 0}}),
    ] {
        let (status, _) = update(&app, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
    assert_eq!(app.repo.write_count(), 0);
}
