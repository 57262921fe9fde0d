use anyhow::Result;

use crate::config::ServerConfig;
use crate::db::Database;
use crate::protocol::ServerMessage;
use crate::rooms::{Room, Rooms};
use crate::types::UserId;

/// Shared application state: the store, the room registry, and config.
pub struct AppState {
    pub db: Database,
    pub rooms: Rooms,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db,
            rooms: Rooms::new(),
            config,
        }
    }

    /// Insert a notification row and fan the stored payload out to the
    /// user's room. The write happens first; broadcast delivery is
    /// best-effort.
    pub async fn notify_user(&self, user_id: UserId, message: String) -> Result<()> {
        let notification = self.db.add_notification(user_id, &message)?;
        self.rooms
            .publish(
                Room::User(user_id),
                ServerMessage::NotificationReceived {
                    id: notification.id,
                    message: notification.message,
                    timestamp: notification.timestamp,
                    is_read: notification.is_read,
                },
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        let db = Database::open(":memory:").expect("in-memory database should open");
        let config = ServerConfig {
            port: 0,
            database_path: ":memory:".to_string(),
            static_dir: "public".into(),
            upload_dir: "public/uploads".into(),
        };
        AppState::new(db, config)
    }

    #[tokio::test]
    async fn test_notify_user_persists_and_broadcasts() {
        let state = test_state();
        let user_id = state
            .db
            .create_user("Ana", "ana@test.com", "pw", "estudiante")
            .unwrap();

        let mut rx = state.rooms.subscribe(Room::User(user_id)).await;
        state
            .notify_user(user_id, "Your grade was updated".to_string())
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            ServerMessage::NotificationReceived {
                message, is_read, ..
            } => {
                assert_eq!(message, "Your grade was updated");
                assert_eq!(is_read, 0);
            }
            other => panic!("Unexpected message: {:?}", other),
        }

        let stored = state.db.notifications_for_user(user_id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message, "Your grade was updated");
    }

    #[tokio::test]
    async fn test_notify_user_without_listener_still_persists() {
        let state = test_state();
        let user_id = state
            .db
            .create_user("Ana", "ana@test.com", "pw", "estudiante")
            .unwrap();

        state
            .notify_user(user_id, "offline notification".to_string())
            .await
            .unwrap();

        assert_eq!(state.db.notifications_for_user(user_id).unwrap().len(), 1);
    }
}
