use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error};

use takas_types::events::GatewayEvent;

/// A gateway event serialized once and shared by every connection.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub room_id: Option<String>,
    pub json: Arc<str>,
}

impl Outbound {
    /// Room-scoped events only reach connections subscribed to that room.
    pub fn is_visible_to(&self, subscriptions: &HashSet<String>) -> bool {
        match &self.room_id {
            Some(room_id) => subscriptions.contains(room_id),
            None => true,
        }
    }
}

/// Fans chat events out to all connected gateway clients.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<Outbound>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to every connection. Delivery is best-effort:
    /// with no connected clients the event is dropped.
    pub fn broadcast(&self, event: GatewayEvent) {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize gateway event: {}", e);
                return;
            }
        };
        let outbound = Outbound {
            room_id: event.room_id().map(str::to_string),
            json: json.into(),
        };
        if self.inner.broadcast_tx.send(outbound).is_err() {
            debug!("No gateway clients connected, event dropped");
        }
    }
}
