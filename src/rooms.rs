use crate::protocol::ServerMessage;
use crate::types::{CaseId, UserId};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

/// A logical broadcast group. User rooms carry notifications, case rooms
/// carry chat and case events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    User(UserId),
    Case(CaseId),
}

/// Registry of broadcast channels, one per room, created lazily on first
/// subscribe. Delivery is best-effort and at-most-once: publishing to a room
/// with no subscribers is a no-op, and lagged receivers drop messages.
pub struct Rooms {
    channels: RwLock<HashMap<Room, broadcast::Sender<ServerMessage>>>,
}

impl Rooms {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to a room, creating its channel if this is the first
    /// subscriber.
    pub async fn subscribe(&self, room: Room) -> broadcast::Receiver<ServerMessage> {
        let mut channels = self.channels.write().await;
        channels
            .entry(room)
            .or_insert_with(|| broadcast::channel(100).0)
            .subscribe()
    }

    /// Broadcast a message to everyone in a room. A send error means the last
    /// receiver is gone, so the room's channel is dropped rather than kept in
    /// the registry forever.
    pub async fn publish(&self, room: Room, msg: ServerMessage) {
        let mut channels = self.channels.write().await;
        if let Some(tx) = channels.get(&room) {
            if tx.send(msg).is_err() {
                channels.remove(&room);
            }
        }
    }
}

impl Default for Rooms {
    fn default() -> Self {
        Self::new()
    }
}
