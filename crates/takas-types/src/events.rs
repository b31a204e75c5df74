use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ChatMessage;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, name: String },

    /// Acknowledges the current set of subscribed rooms
    Subscribed { room_ids: Vec<String> },

    /// A new chat message was posted to a room
    MessageCreate { message: ChatMessage },

    /// A command could not be processed
    Error { message: String },
}

impl GatewayEvent {
    /// Returns the room id if this event is scoped to a single room.
    /// Events that return `None` are connection-level.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::MessageCreate { message } => Some(message.room_id.as_str()),
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Start receiving messages for these rooms
    Subscribe { room_ids: Vec<String> },

    /// Stop receiving messages for these rooms
    Unsubscribe { room_ids: Vec<String> },
}
