#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use takas_api::mailer::RecordingMailer;
use takas_api::state::{AppState, AppStateInner};
use takas_api::storage::PhotoStorage;
use takas_db::models::AdRow;
use takas_db::{Database, format_ts};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const APP_URL: &str = "http://takas.test";

/// A fresh service backed by a temporary SQLite file and upload directory.
/// Everything is removed when this struct is dropped.
pub struct TestEnv {
    _dir: TempDir,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub router: Router,
}

/// A verified, logged-in account.
pub struct TestUser {
    pub uid: Uuid,
    pub email: String,
    pub password: String,
    pub token: String,
}

impl TestEnv {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = Arc::new(
            Database::open(&dir.path().join("takas.db")).expect("Failed to open database"),
        );
        let storage = PhotoStorage::new(dir.path().join("storage"))
            .await
            .expect("Failed to create storage");
        let mailer = Arc::new(RecordingMailer::new());

        let state: AppState = Arc::new(AppStateInner::new(
            db,
            JWT_SECRET.to_string(),
            mailer.clone(),
            storage,
            APP_URL,
        ));
        let router = takas_api::router(state.clone());

        Self {
            _dir: dir,
            state,
            mailer,
            router,
        }
    }

    /// A `TestServer` that does not assert on status codes; every test
    /// checks the status it expects.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// A `TestServer` on a real local port, needed for WebSocket upgrades.
    pub fn http_server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .http_transport()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Signs up, follows the emailed verification link and logs in.
    pub async fn verified_user(
        &self,
        server: &axum_test::TestServer,
        name: &str,
        email: &str,
    ) -> TestUser {
        let password = "gizli123".to_string();
        let response = server
            .post("/auth/signup")
            .json(&serde_json::json!({
                "full_name": name,
                "email": email,
                "phone": "05551234567",
                "password": password,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let token = self.emailed_token(email).await;
        server
            .get("/auth/verify")
            .add_query_param("token", &token)
            .await
            .assert_status_ok();

        let response = server
            .post("/auth/login")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();

        TestUser {
            uid: body["user"]["uid"].as_str().unwrap().parse().unwrap(),
            email: email.to_string(),
            password,
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// The token from the most recent link emailed to `to`.
    pub async fn emailed_token(&self, to: &str) -> String {
        let email = self
            .mailer
            .last_to(to)
            .await
            .unwrap_or_else(|| panic!("No email sent to {to}"));
        extract_token(&email.html).expect("Email has no token link")
    }

    /// Waits for a background email to `to` whose subject contains `subject`.
    pub async fn wait_for_email(&self, to: &str, subject: &str) -> takas_api::mailer::Email {
        for _ in 0..100 {
            if let Some(email) = self
                .mailer
                .sent()
                .await
                .into_iter()
                .find(|e| e.to == to && e.subject.contains(subject))
            {
                return email;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("No '{subject}' email sent to {to}");
    }

    /// Inserts an ad directly, bypassing validation, with the given
    /// creation and expiry times.
    pub fn insert_ad(
        &self,
        owner: &TestUser,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let domain = owner.email.rsplit('@').next().unwrap().to_string();
        self.state
            .db
            .create_ad_within_limit(
                &AdRow {
                    id: id.to_string(),
                    user_id: owner.uid.to_string(),
                    university_domain: domain,
                    requested: "1 Paket Marlboro".into(),
                    offered: "2 Dal Camel".into(),
                    message: None,
                    created_at: format_ts(created_at),
                    expires_at: format_ts(expires_at),
                    updated_at: None,
                },
                usize::MAX,
                Utc::now(),
            )
            .expect("Failed to insert ad");
        id
    }
}

pub fn extract_token(html: &str) -> Option<String> {
    let start = html.find("token=")? + "token=".len();
    let token: String = html[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!token.is_empty()).then_some(token)
}

pub fn ad_payload(brand: &str) -> serde_json::Value {
    serde_json::json!({
        "requested_brand": brand,
        "requested_quantity": "1",
        "requested_unit": "Paket",
        "offered": "2 Paket Camel",
        "message": "Kampüste buluşabiliriz",
    })
}
