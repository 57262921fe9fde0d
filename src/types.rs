use serde::{Deserialize, Serialize};

/// Row ID aliases for readability
pub type UserId = i64;
pub type CaseId = i64;
pub type FileId = i64;

/// Role string used by instructor-only checks. Roles are stored as free text
/// the way the client sends them; only this value carries meaning.
pub const INSTRUCTOR_ROLE: &str = "instructor";

/// A registered account. Login serializes the full row (password included);
/// clients depend on that shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
    pub description: String,
}

impl User {
    pub fn is_instructor(&self) -> bool {
        self.role == INSTRUCTOR_ROLE
    }
}

/// Profile view of a user, without the password column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub description: String,
}

/// A clinical teaching case. Students join via `code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub title: String,
    pub description: String,
    pub age: String,
    pub gender: String,
    pub event_date: String,
    pub code: String,
    pub instructor_id: UserId,
}

/// A case as seen by a joined student: the case row plus their grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentCase {
    #[serde(flatten)]
    pub case: Case,
    pub grade: i64,
}

/// A student's membership summary within a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseStudent {
    pub id: UserId,
    pub name: String,
    pub grade: i64,
}

/// A chat message within a case room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub case_id: CaseId,
    pub user_name: String,
    pub user_id: UserId,
    pub content: String,
    pub timestamp: String,
}

/// A file attached to a case. `filename` is the stored name on disk,
/// `original_name` what the uploader called it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    pub id: FileId,
    pub case_id: CaseId,
    pub filename: String,
    pub original_name: String,
    pub uploader_name: String,
    pub uploader_id: UserId,
    pub timestamp: String,
}

/// A notification for a single user. `is_read` is an integer flag (0/1) to
/// match the stored column and the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: UserId,
    pub message: String,
    pub is_read: i64,
    pub timestamp: String,
}
