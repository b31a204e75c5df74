mod common;

use axum::http::StatusCode;

fn signup_body(email: &str) -> serde_json::Value {
    serde_json::json!({
        "full_name": "Ayşe Yılmaz",
        "email": email,
        "phone": "+90 555 123 45 67",
        "password": "gizli123",
    })
}

#[tokio::test]
async fn signup_verify_login_flow() {
    let env = common::TestEnv::start().await;
    let server = env.server();

    let response = server
        .post("/auth/signup")
        .json(&signup_body("Ayse@Hacettepe.edu.tr"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["email"], "ayse@hacettepe.edu.tr");

    let email = env.mailer.last_to("ayse@hacettepe.edu.tr").await.unwrap();
    // Links open frontend pages, which call the API themselves.
    assert!(email.html.contains("http://takas.test/verify-email?token="));

    // Unverified accounts cannot log in yet.
    let response = server
        .post("/auth/login")
        .json(&serde_json::json!({ "email": "ayse@hacettepe.edu.tr", "password": "gizli123" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "email_not_verified");

    let token = env.emailed_token("ayse@hacettepe.edu.tr").await;
    server
        .get("/auth/verify")
        .add_query_param("token", &token)
        .await
        .assert_status_ok();

    let response = server
        .post("/auth/login")
        .json(&serde_json::json!({ "email": "AYSE@hacettepe.edu.tr", "password": "gizli123" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["name"], "Ayşe Yılmaz");
    assert_eq!(body["user"]["university_domain"], "hacettepe.edu.tr");
    assert_eq!(body["user"]["email_verified"], true);
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn verification_token_is_single_use() {
    let env = common::TestEnv::start().await;
    let server = env.server();

    server
        .post("/auth/signup")
        .json(&signup_body("mert@itu.edu.tr"))
        .await
        .assert_status(StatusCode::CREATED);
    let token = env.emailed_token("mert@itu.edu.tr").await;

    server
        .get("/auth/verify")
        .add_query_param("token", &token)
        .await
        .assert_status_ok();

    let response = server
        .get("/auth/verify")
        .add_query_param("token", &token)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "invalid_token");
}

#[tokio::test]
async fn signup_rejects_duplicates_and_foreign_domains() {
    let env = common::TestEnv::start().await;
    let server = env.server();

    server
        .post("/auth/signup")
        .json(&signup_body("can@boun.edu.tr"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/auth/signup")
        .json(&signup_body("CAN@boun.edu.tr"))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "email_already_in_use");
    assert_eq!(body["message"], "Bu e-posta adresi zaten kayıtlı.");

    let response = server
        .post("/auth/signup")
        .json(&signup_body("can@gmail.com"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "invalid_argument");
    assert_eq!(body["field"], "email");
}

#[tokio::test]
async fn signup_validates_phone() {
    let env = common::TestEnv::start().await;
    let server = env.server();

    let mut body = signup_body("ece@odtu.edu.tr");
    body["phone"] = "12345".into();
    let response = server.post("/auth/signup").json(&body).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["field"], "phone");
}

#[tokio::test]
async fn login_with_wrong_password_or_unknown_email() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    env.verified_user(&server, "Deniz Kara", "deniz@ege.edu.tr").await;

    for (email, password) in [
        ("deniz@ege.edu.tr", "yanlis123"),
        ("nobody@ege.edu.tr", "gizli123"),
    ] {
        let response = server
            .post("/auth/login")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "invalid_credential");
        assert_eq!(body["message"], "E-posta veya şifre hatalı.");
    }
}

#[tokio::test]
async fn resend_verification_sends_a_fresh_link() {
    let env = common::TestEnv::start().await;
    let server = env.server();

    server
        .post("/auth/signup")
        .json(&signup_body("selin@ankara.edu.tr"))
        .await
        .assert_status(StatusCode::CREATED);
    let first = env.emailed_token("selin@ankara.edu.tr").await;

    server
        .post("/auth/verification/resend")
        .json(&serde_json::json!({ "email": "selin@ankara.edu.tr", "password": "gizli123" }))
        .await
        .assert_status_ok();
    let second = env.emailed_token("selin@ankara.edu.tr").await;
    assert_ne!(first, second);

    // Only the newest link is valid.
    server
        .get("/auth/verify")
        .add_query_param("token", &first)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/auth/verify")
        .add_query_param("token", &second)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn password_reset_flow() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    let user = env.verified_user(&server, "Emre Aslan", "emre@deu.edu.tr").await;

    let response = server
        .post("/auth/password-reset")
        .json(&serde_json::json!({ "email": "ghost@deu.edu.tr" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "user_not_found");

    server
        .post("/auth/password-reset")
        .json(&serde_json::json!({ "email": user.email }))
        .await
        .assert_status_ok();
    let email = env.mailer.last_to(&user.email).await.unwrap();
    assert!(email.html.contains("http://takas.test/reset-password?token="));
    let token = common::extract_token(&email.html).unwrap();

    let response = server
        .post("/auth/password-reset/confirm")
        .json(&serde_json::json!({ "token": token, "new_password": "123" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/auth/password-reset/confirm")
        .json(&serde_json::json!({ "token": token, "new_password": "yenisifre" }))
        .await
        .assert_status_ok();

    server
        .post("/auth/login")
        .json(&serde_json::json!({ "email": user.email, "password": user.password }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/auth/login")
        .json(&serde_json::json!({ "email": user.email, "password": "yenisifre" }))
        .await
        .assert_status_ok();

    server
        .post("/auth/password-reset/confirm")
        .json(&serde_json::json!({ "token": token, "new_password": "baskasifre" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let env = common::TestEnv::start().await;
    let server = env.server();

    let response = server.get("/ads").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "unauthenticated");

    server
        .get("/profile")
        .authorization_bearer("not-a-jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn concurrent_signups_with_one_email_get_a_conflict() {
    let env = common::TestEnv::start().await;
    let server = env.server();

    let body = signup_body("ikiz@metu.edu.tr");
    let (first, second) = tokio::join!(
        server.post("/auth/signup").json(&body).into_future(),
        server.post("/auth/signup").json(&body).into_future(),
    );

    let mut statuses = vec![first.status_code(), second.status_code()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

    let loser = if first.status_code() == StatusCode::CONFLICT { first } else { second };
    let body: serde_json::Value = loser.json();
    assert_eq!(body["code"], "email_already_in_use");
}
