use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use takas_db::Database;
use takas_types::api::Claims;
use takas_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// Server sends a Ping every 15 seconds. Two consecutive missed Pongs
/// (~30s) drop the connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const MAX_MISSED_HEARTBEATS: u8 = 2;

/// Time allowed between upgrade and a valid Identify command.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

type Subscriptions = Arc<RwLock<HashSet<String>>>;

/// Handle a single gateway connection: Identify handshake, Ready, then the
/// event loop until either side goes away.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    jwt_secret: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let Some(claims) = wait_for_identify(&mut receiver, &jwt_secret).await else {
        warn!("WebSocket client failed to identify, closing");
        let _ = sender.send(Message::Close(None)).await;
        return;
    };

    let name = current_name(&db, &claims).await;
    info!("{} ({}) connected to gateway", name, claims.sub);

    let ready = GatewayEvent::Ready {
        user_id: claims.sub,
        name: name.clone(),
    };
    if send_event(&mut sender, &ready).await.is_err() {
        return;
    }

    run_connection_loop(sender, receiver, &dispatcher, claims.sub, &name).await;

    info!("{} ({}) disconnected from gateway", name, claims.sub);
}

/// The token carries the name at login time; profile edits since then
/// live in the database.
async fn current_name(db: &Arc<Database>, claims: &Claims) -> String {
    let db = db.clone();
    let id = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || db.get_user_by_id(&id)).await;
    match row {
        Ok(Ok(Some(user))) => user.name,
        Ok(Ok(None)) => claims.name.clone(),
        Ok(Err(e)) => {
            warn!("Failed to load user {} for gateway: {:#}", claims.sub, e);
            claims.name.clone()
        }
        Err(e) => {
            warn!("Gateway user lookup task failed: {}", e);
            claims.name.clone()
        }
    }
}

async fn run_connection_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    dispatcher: &Dispatcher,
    user_id: Uuid,
    name: &str,
) {
    let mut broadcast_rx = dispatcher.subscribe();

    // Replies meant only for this connection (Subscribed, Error).
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<GatewayEvent>();

    let subscriptions: Subscriptions = Arc::new(RwLock::new(HashSet::new()));
    let send_subscriptions = subscriptions.clone();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let msg = match result {
                        Ok(msg) => msg,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Broadcast receiver lagged by {} messages", n);
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    };

                    let visible = match send_subscriptions.read() {
                        Ok(subs) => msg.is_visible_to(&subs),
                        Err(_) => break,
                    };
                    if !visible {
                        continue;
                    }

                    if sender.send(Message::Text(msg.json.to_string().into())).await.is_err() {
                        break;
                    }
                }
                reply = reply_rx.recv() => {
                    let Some(event) = reply else { break };
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= MAX_MISSED_HEARTBEATS {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let name_recv = name.to_string();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let reply = match serde_json::from_str::<GatewayCommand>(&text) {
                        Ok(cmd) => handle_command(cmd, &subscriptions, user_id, &name_recv),
                        Err(e) => {
                            warn!(
                                "{} ({}) bad command: {} -- raw: {}",
                                name_recv,
                                user_id,
                                e,
                                truncate(&text, 200)
                            );
                            Some(GatewayEvent::Error {
                                message: "Geçersiz komut.".to_string(),
                            })
                        }
                    };
                    if let Some(event) = reply {
                        if reply_tx.send(event).is_err() {
                            break;
                        }
                    }
                }
                Message::Pong(_) => {
                    pong_received.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), ()> {
    let text = serde_json::to_string(event).map_err(|e| {
        warn!("Failed to serialize gateway event: {}", e);
    })?;
    sender
        .send(Message::Text(text.into()))
        .await
        .map_err(|_| ())
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

async fn wait_for_identify(
    receiver: &mut SplitStream<WebSocket>,
    jwt_secret: &str,
) -> Option<Claims> {
    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    return decode_claims(&token, jwt_secret);
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify)
        .await
        .ok()
        .flatten()
}

fn decode_claims(token: &str, jwt_secret: &str) -> Option<Claims> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!("Gateway token rejected: {}", e);
            None
        }
    }
}

/// Apply a command to the connection's subscriptions and return the reply
/// to send back, if any.
fn handle_command(
    cmd: GatewayCommand,
    subscriptions: &Subscriptions,
    user_id: Uuid,
    name: &str,
) -> Option<GatewayEvent> {
    let Ok(mut subs) = subscriptions.write() else {
        return Some(GatewayEvent::Error {
            message: "Bir hata oluştu. Lütfen tekrar deneyin.".to_string(),
        });
    };

    match cmd {
        GatewayCommand::Identify { .. } => None,

        GatewayCommand::Subscribe { room_ids } => {
            info!("{} ({}) subscribing to {} rooms", name, user_id, room_ids.len());
            subs.extend(room_ids);
            Some(subscribed(&subs))
        }

        GatewayCommand::Unsubscribe { room_ids } => {
            for room_id in &room_ids {
                subs.remove(room_id);
            }
            Some(subscribed(&subs))
        }
    }
}

fn subscribed(subs: &HashSet<String>) -> GatewayEvent {
    let mut room_ids: Vec<String> = subs.iter().cloned().collect();
    room_ids.sort();
    GatewayEvent::Subscribed { room_ids }
}
