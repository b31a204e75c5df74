mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn identify_returns_ready_with_current_name() {
    let env = common::TestEnv::start().await;
    let server = env.http_server();
    let user = env.verified_user(&server, "Ali Veli", "ali@metu.edu.tr").await;

    server
        .put("/profile")
        .authorization_bearer(&user.token)
        .json(&json!({ "full_name": "Ali Yeni", "phone": "05321112233" }))
        .await
        .assert_status_ok();

    let mut ws = server.get_websocket("/gateway").await.into_websocket().await;
    ws.send_json(&json!({ "type": "Identify", "data": { "token": user.token } }))
        .await;

    let ready: Value = ws.receive_json().await;
    assert_eq!(ready["type"], "Ready");
    assert_eq!(ready["data"]["user_id"], user.uid.to_string());
    assert_eq!(ready["data"]["name"], "Ali Yeni");
}

#[tokio::test]
async fn only_subscribed_rooms_are_delivered() {
    let env = common::TestEnv::start().await;
    let server = env.http_server();
    let user = env.verified_user(&server, "Ali Veli", "ali@metu.edu.tr").await;

    let mut ws = server.get_websocket("/gateway").await.into_websocket().await;
    ws.send_json(&json!({ "type": "Identify", "data": { "token": user.token } }))
        .await;
    let ready: Value = ws.receive_json().await;
    assert_eq!(ready["type"], "Ready");

    ws.send_json(&json!({ "type": "Subscribe", "data": { "room_ids": ["general"] } }))
        .await;
    let subscribed: Value = ws.receive_json().await;
    assert_eq!(subscribed["type"], "Subscribed");
    assert_eq!(subscribed["data"]["room_ids"], json!(["general"]));

    for (room, text) in [("random", "duyulmamalı"), ("general", "herkese selam")] {
        server
            .post(&format!("/chat/rooms/{room}/messages"))
            .authorization_bearer(&user.token)
            .json(&json!({ "text": text }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let event: Value = ws.receive_json().await;
    assert_eq!(event["type"], "MessageCreate");
    assert_eq!(event["data"]["message"]["room_id"], "general");
    assert_eq!(event["data"]["message"]["text"], "herkese selam");

    ws.send_json(&json!({ "type": "Unsubscribe", "data": { "room_ids": ["general"] } }))
        .await;
    let subscribed: Value = ws.receive_json().await;
    assert_eq!(subscribed["data"]["room_ids"], json!([]));

    server
        .post("/chat/rooms/general/messages")
        .authorization_bearer(&user.token)
        .json(&json!({ "text": "artık duyulmamalı" }))
        .await
        .assert_status(StatusCode::CREATED);

    // The next frame is the reply to this command, not the general message.
    ws.send_json(&json!({ "type": "Subscribe", "data": { "room_ids": ["tech"] } }))
        .await;
    let subscribed: Value = ws.receive_json().await;
    assert_eq!(subscribed["type"], "Subscribed");
    assert_eq!(subscribed["data"]["room_ids"], json!(["tech"]));
}

#[tokio::test]
async fn malformed_command_gets_an_error_reply() {
    let env = common::TestEnv::start().await;
    let server = env.http_server();
    let user = env.verified_user(&server, "Ali Veli", "ali@metu.edu.tr").await;

    let mut ws = server.get_websocket("/gateway").await.into_websocket().await;
    ws.send_json(&json!({ "type": "Identify", "data": { "token": user.token } }))
        .await;
    let _ready: Value = ws.receive_json().await;

    ws.send_text("{\"type\":\"Dance\"}").await;
    let error: Value = ws.receive_json().await;
    assert_eq!(error["type"], "Error");
    assert_eq!(error["data"]["message"], "Geçersiz komut.");
}

#[tokio::test]
async fn bad_token_closes_the_connection() {
    let env = common::TestEnv::start().await;
    let server = env.http_server();

    let mut ws = server.get_websocket("/gateway").await.into_websocket().await;
    ws.send_json(&json!({ "type": "Identify", "data": { "token": "not-a-jwt" } }))
        .await;

    let message = ws.receive_message().await;
    assert!(
        matches!(message, axum_test::WsMessage::Close(_)),
        "expected close, got {message:?}"
    );
}
