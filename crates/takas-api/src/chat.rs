use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use takas_db::format_ts;
use takas_db::models::{ChatMessageRow, ChatRoomRow};
use takas_gateway::connection;
use takas_types::api::{Claims, SendChatMessageRequest};
use takas_types::events::GatewayEvent;
use takas_types::models::{ChatMessage, ChatRoom};
use takas_types::validation::validate_chat_message;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

const DEFAULT_HISTORY_LIMIT: u32 = 50;
const MAX_HISTORY_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// GET /chat/rooms
pub async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<ChatRoom>>, ApiError> {
    let rooms = run_db(&state.db, |db| db.list_chat_rooms()).await?;
    Ok(Json(rooms.into_iter().map(ChatRoomRow::into_model).collect()))
}

/// GET /chat/rooms/{room_id}/messages?limit=: latest messages, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    ensure_room(&state, &room_id).await?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let rows = run_db(&state.db, move |db| db.list_chat_messages(&room_id, limit)).await?;

    Ok(Json(rows.into_iter().map(ChatMessageRow::into_model).collect()))
}

/// POST /chat/rooms/{room_id}/messages: stores the message and fans it
/// out to gateway clients subscribed to the room.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(room_id): Path<String>,
    Json(req): Json<SendChatMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = validate_chat_message(&req.text)?;
    ensure_room(&state, &room_id).await?;

    let sender = state.user_cache.get(claims.sub).await;
    // Placeholders carry no email; keep the login-time name then.
    let sender_name = if sender.email.is_empty() {
        claims.name.clone()
    } else {
        sender.name
    };
    let row = ChatMessageRow {
        id: Uuid::new_v4().to_string(),
        room_id,
        sender_id: claims.sub.to_string(),
        sender_name,
        sender_avatar_url: sender.profile_photo_url,
        text,
        created_at: format_ts(Utc::now()),
    };
    let row = run_db(&state.db, move |db| {
        db.insert_chat_message(&row)?;
        Ok(row)
    })
    .await?;

    let message = row.into_model();
    debug!("{} posted in #{}", message.sender.name, message.room_id);
    state.dispatcher.broadcast(GatewayEvent::MessageCreate {
        message: message.clone(),
    });

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /gateway: WebSocket upgrade. Authentication happens inside the
/// socket with an Identify command.
pub async fn gateway(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let db = state.db.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, db, jwt_secret))
}

async fn ensure_room(state: &AppState, room_id: &str) -> Result<(), ApiError> {
    let id = room_id.to_string();
    run_db(&state.db, move |db| db.get_chat_room(&id))
        .await?
        .map(|_| ())
        .ok_or(ApiError::RoomNotFound)
}
