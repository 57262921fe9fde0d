use crate::types::{CaseId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the notification room for this user. Sent once after login.
    LoginUser { user_id: UserId },
    /// Join a case room to receive chat and case events.
    JoinCase { case_id: CaseId },
    /// Send a chat message to a case room.
    SendMessage {
        case_id: CaseId,
        user_id: UserId,
        user: String,
        text: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A chat message was posted in a case the client joined.
    NewMessage {
        case_id: CaseId,
        user_id: UserId,
        user: String,
        text: String,
        timestamp: String,
    },
    /// A notification was created for this user.
    NotificationReceived {
        id: i64,
        message: String,
        timestamp: String,
        is_read: i64,
    },
    /// The case details were edited; clients should refetch.
    CaseUpdated { case_id: CaseId },
    /// The case file list changed (upload or deletion); clients should refetch.
    FileUploaded { case_id: CaseId },
    Error { code: String, msg: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"login_user","user_id":7}"#).unwrap();
        assert!(matches!(msg, ClientMessage::LoginUser { user_id: 7 }));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"t":"send_message","case_id":1,"user_id":2,"user":"Ana","text":"hola"}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::SendMessage { case_id, user, .. } => {
                assert_eq!(case_id, 1);
                assert_eq!(user, "Ana");
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_server_message_tag() {
        let json = serde_json::to_string(&ServerMessage::FileUploaded { case_id: 3 }).unwrap();
        assert!(json.contains(r#""t":"file_uploaded""#));
        assert!(json.contains(r#""case_id":3"#));

        let json = serde_json::to_string(&ServerMessage::NotificationReceived {
            id: 1,
            message: "graded".to_string(),
            timestamp: "12:30".to_string(),
            is_read: 0,
        })
        .unwrap();
        assert!(json.contains(r#""t":"notification_received""#));
        assert!(json.contains(r#""is_read":0"#));
    }
}
