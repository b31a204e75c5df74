mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use chrono::{Duration, Utc};

const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
    0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[tokio::test]
async fn profile_can_be_read_and_updated() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    let user = env.verified_user(&server, "Ali Veli", "ali@metu.edu.tr").await;

    let response = server.get("/profile").authorization_bearer(&user.token).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["email"], "ali@metu.edu.tr");
    assert_eq!(body["phone"], "05551234567");

    let response = server
        .put("/profile")
        .authorization_bearer(&user.token)
        .json(&serde_json::json!({ "full_name": "Ali Can Veli", "phone": "0532 111 22 33" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "Ali Can Veli");
    assert_eq!(body["phone"], "0532 111 22 33");

    let response = server
        .put("/profile")
        .authorization_bearer(&user.token)
        .json(&serde_json::json!({ "full_name": "Al", "phone": "05321112233" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["field"], "full_name");
}

#[tokio::test]
async fn renamed_owner_shows_on_their_ads() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    let user = env.verified_user(&server, "Ali Veli", "ali@metu.edu.tr").await;

    let now = Utc::now();
    let ad_id = env.insert_ad(&user, now, now + Duration::days(7));

    let body: serde_json::Value = server
        .get(&format!("/ads/{ad_id}"))
        .authorization_bearer(&user.token)
        .await
        .json();
    assert_eq!(body["owner"]["name"], "Ali Veli");

    server
        .put("/profile")
        .authorization_bearer(&user.token)
        .json(&serde_json::json!({ "full_name": "Ali Can Veli", "phone": "05321112233" }))
        .await
        .assert_status_ok();

    let body: serde_json::Value = server
        .get(&format!("/ads/{ad_id}"))
        .authorization_bearer(&user.token)
        .await
        .json();
    assert_eq!(body["owner"]["name"], "Ali Can Veli");
}

#[tokio::test]
async fn photo_upload_is_stored_and_served() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    let user = env.verified_user(&server, "Ali Veli", "ali@metu.edu.tr").await;

    let form = MultipartForm::new().add_part(
        "photo",
        Part::bytes(PNG_BYTES.to_vec())
            .file_name("my photo.png")
            .mime_type("image/png"),
    );
    let response = server
        .post("/profile/photo")
        .authorization_bearer(&user.token)
        .multipart(form)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let url = body["profile_photo_url"].as_str().unwrap().to_string();
    let prefix = format!("/files/profile_photos/{}/", user.uid);
    assert!(url.starts_with(&prefix), "unexpected url {url}");
    assert!(url.ends_with("_my_photo.png"), "unexpected url {url}");

    let served = server.get(&url).await;
    served.assert_status_ok();
    assert_eq!(served.as_bytes().as_ref(), PNG_BYTES);

    let body: serde_json::Value = server
        .get("/profile")
        .authorization_bearer(&user.token)
        .await
        .json();
    assert_eq!(body["profile_photo_url"], url);
}

#[tokio::test]
async fn photo_upload_rejects_non_images_and_large_files() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    let user = env.verified_user(&server, "Ali Veli", "ali@metu.edu.tr").await;

    let form = MultipartForm::new().add_part(
        "photo",
        Part::bytes(b"hello".to_vec())
            .file_name("notes.txt")
            .mime_type("text/plain"),
    );
    let response = server
        .post("/profile/photo")
        .authorization_bearer(&user.token)
        .multipart(form)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "invalid_upload");

    let form = MultipartForm::new().add_part(
        "photo",
        Part::bytes(vec![0u8; 2 * 1024 * 1024 + 1])
            .file_name("big.jpg")
            .mime_type("image/jpeg"),
    );
    let response = server
        .post("/profile/photo")
        .authorization_bearer(&user.token)
        .multipart(form)
        .await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "file_too_large");

    let form = MultipartForm::new().add_text("caption", "no photo here");
    server
        .post("/profile/photo")
        .authorization_bearer(&user.token)
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reports_are_validated() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    let reporter = env.verified_user(&server, "Ali Veli", "ali@metu.edu.tr").await;
    let reported = env.verified_user(&server, "Zeynep Ak", "zeynep@itu.edu.tr").await;

    let now = Utc::now();
    let ad_id = env.insert_ad(&reported, now, now + Duration::days(7));

    let response = server
        .post("/reports")
        .authorization_bearer(&reporter.token)
        .json(&serde_json::json!({
            "reported_user_id": reported.uid,
            "ad_id": ad_id,
            "reason": "Spam",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["reporter_id"], reporter.uid.to_string());
    assert_eq!(body["reported_user_id"], reported.uid.to_string());
    assert_eq!(body["ad_id"], ad_id.to_string());
    assert_eq!(body["reason"], "Spam");

    let response = server
        .post("/reports")
        .authorization_bearer(&reporter.token)
        .json(&serde_json::json!({
            "reported_user_id": reported.uid,
            "reason": "Boring",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Geçersiz rapor nedeni.");

    let response = server
        .post("/reports")
        .authorization_bearer(&reporter.token)
        .json(&serde_json::json!({
            "reported_user_id": reporter.uid,
            "reason": "Abuse",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "self_report");
}
