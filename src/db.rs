// SQLite persistence layer for users, cases, chat, files, and notifications.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::types::{
    Case, CaseFile, CaseId, CaseStudent, ChatMessage, FileId, Notification, StudentCase, User,
    UserId, UserProfile,
};

/// Wall-clock time stamp stored on chat messages and notifications.
fn clock_time() -> String {
    chrono::Utc::now().format("%H:%M").to_string()
}

/// Date stamp stored on file rows.
fn date_stamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// SQLite-backed persistence for the whole platform.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path`, ensure all tables exist,
    /// and seed the two demo accounts if the users table is empty. Pass
    /// `":memory:"` for an ephemeral in-memory database (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id          INTEGER PRIMARY KEY,
                email       TEXT UNIQUE,
                password    TEXT,
                name        TEXT,
                role        TEXT,
                description TEXT
            );

            CREATE TABLE IF NOT EXISTS cases (
                id            INTEGER PRIMARY KEY,
                title         TEXT,
                description   TEXT,
                age           TEXT,
                gender        TEXT,
                event_date    TEXT,
                code          TEXT UNIQUE,
                instructor_id INTEGER
            );

            CREATE TABLE IF NOT EXISTS case_members (
                case_id INTEGER,
                user_id INTEGER,
                grade   INTEGER DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS messages (
                id        INTEGER PRIMARY KEY,
                case_id   INTEGER,
                user_name TEXT,
                user_id   INTEGER,
                content   TEXT,
                timestamp TEXT
            );

            CREATE TABLE IF NOT EXISTS case_files (
                id            INTEGER PRIMARY KEY,
                case_id       INTEGER,
                filename      TEXT,
                original_name TEXT,
                uploader_name TEXT,
                uploader_id   INTEGER,
                timestamp     TEXT
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id        INTEGER PRIMARY KEY,
                user_id   INTEGER,
                message   TEXT,
                is_read   INTEGER DEFAULT 0,
                timestamp TEXT
            );
            ",
        )
        .context("failed to create database schema")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.seed_demo_accounts()?;
        Ok(db)
    }

    /// Insert the demo instructor and student accounts on first run so the
    /// platform is usable without a registration step.
    fn seed_demo_accounts(&self) -> Result<()> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM users", [], |row| row.get(0))
            .context("failed to count users")?;
        if count > 0 {
            return Ok(());
        }

        tracing::info!("Empty users table, seeding demo accounts");
        conn.execute(
            "INSERT INTO users (email, password, name, role, description)
             VALUES ('prof@test.com', '123', 'Dr. House', 'instructor', 'Jefe de Diagnóstico')",
            [],
        )
        .context("failed to seed instructor account")?;
        conn.execute(
            "INSERT INTO users (email, password, name, role, description)
             VALUES ('alumno@test.com', '123', 'Juan Pérez', 'estudiante', 'Residente')",
            [],
        )
        .context("failed to seed student account")?;
        Ok(())
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Look up a user by credentials. Passwords are compared as stored,
    /// in plaintext.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, password, name, role, description
             FROM users WHERE email = ?1 AND password = ?2",
            params![email, password],
            user_from_row,
        )
        .optional()
        .context("failed to authenticate user")
    }

    /// Create an account. Fails on duplicate email (UNIQUE constraint).
    pub fn create_user(&self, name: &str, email: &str, password: &str, role: &str) -> Result<UserId> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (name, email, password, role, description)
             VALUES (?1, ?2, ?3, ?4, '')",
            params![name, email, password, role],
        )
        .context("failed to create user")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, password, name, role, description FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()
        .context("failed to load user")
    }

    /// Profile view of a user, without the password column.
    pub fn get_user_profile(&self, id: UserId) -> Result<Option<UserProfile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, email, role, description FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(UserProfile {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    role: row.get(3)?,
                    description: row.get(4)?,
                })
            },
        )
        .optional()
        .context("failed to load user profile")
    }

    pub fn update_description(&self, user_id: UserId, description: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE users SET description = ?1 WHERE id = ?2",
            params![description, user_id],
        )
        .context("failed to update profile description")?;
        Ok(())
    }

    pub fn update_password(&self, user_id: UserId, new_password: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE users SET password = ?1 WHERE id = ?2",
            params![new_password, user_id],
        )
        .context("failed to update password")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cases
    // ------------------------------------------------------------------

    /// Insert a case and return its row id. The join `code` must be unique.
    #[allow(clippy::too_many_arguments)]
    pub fn create_case(
        &self,
        title: &str,
        description: &str,
        age: &str,
        gender: &str,
        event_date: &str,
        code: &str,
        instructor_id: UserId,
    ) -> Result<CaseId> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO cases (title, description, age, gender, event_date, code, instructor_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![title, description, age, gender, event_date, code, instructor_id],
        )
        .context("failed to create case")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_case(&self, id: CaseId) -> Result<Option<Case>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, title, description, age, gender, event_date, code, instructor_id
             FROM cases WHERE id = ?1",
            params![id],
            case_from_row,
        )
        .optional()
        .context("failed to load case")
    }

    pub fn get_case_by_code(&self, code: &str) -> Result<Option<Case>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, title, description, age, gender, event_date, code, instructor_id
             FROM cases WHERE code = ?1",
            params![code],
            case_from_row,
        )
        .optional()
        .context("failed to load case by code")
    }

    pub fn update_case(
        &self,
        id: CaseId,
        title: &str,
        description: &str,
        age: &str,
        gender: &str,
        event_date: &str,
    ) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE cases SET title = ?1, description = ?2, age = ?3, gender = ?4, event_date = ?5
             WHERE id = ?6",
            params![title, description, age, gender, event_date, id],
        )
        .context("failed to update case")?;
        Ok(())
    }

    /// Cases owned by an instructor.
    pub fn cases_for_instructor(&self, instructor_id: UserId) -> Result<Vec<Case>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, age, gender, event_date, code, instructor_id
                 FROM cases WHERE instructor_id = ?1",
            )
            .context("failed to prepare instructor cases query")?;
        let cases = stmt
            .query_map(params![instructor_id], case_from_row)
            .context("failed to query instructor cases")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map case rows")?;
        Ok(cases)
    }

    /// Cases a student has joined, including their grade in each.
    pub fn cases_for_student(&self, user_id: UserId) -> Result<Vec<StudentCase>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT c.id, c.title, c.description, c.age, c.gender, c.event_date, c.code,
                        c.instructor_id, cm.grade
                 FROM cases c
                 JOIN case_members cm ON c.id = cm.case_id
                 WHERE cm.user_id = ?1",
            )
            .context("failed to prepare student cases query")?;
        let cases = stmt
            .query_map(params![user_id], |row| {
                Ok(StudentCase {
                    case: case_from_row(row)?,
                    grade: row.get(8)?,
                })
            })
            .context("failed to query student cases")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map student case rows")?;
        Ok(cases)
    }

    /// Students who joined a case, with their grades.
    pub fn case_students(&self, case_id: CaseId) -> Result<Vec<CaseStudent>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT u.id, u.name, cm.grade
                 FROM users u
                 JOIN case_members cm ON u.id = cm.user_id
                 WHERE cm.case_id = ?1",
            )
            .context("failed to prepare case students query")?;
        let students = stmt
            .query_map(params![case_id], |row| {
                Ok(CaseStudent {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    grade: row.get(2)?,
                })
            })
            .context("failed to query case students")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map case student rows")?;
        Ok(students)
    }

    pub fn is_member(&self, case_id: CaseId, user_id: UserId) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM case_members WHERE case_id = ?1 AND user_id = ?2)",
                params![case_id, user_id],
                |row| row.get(0),
            )
            .context("failed to check case membership")?;
        Ok(exists)
    }

    /// Add a student to a case with an initial grade of 0.
    pub fn add_member(&self, case_id: CaseId, user_id: UserId) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO case_members (case_id, user_id, grade) VALUES (?1, ?2, 0)",
            params![case_id, user_id],
        )
        .context("failed to add case member")?;
        Ok(())
    }

    pub fn update_grade(&self, case_id: CaseId, student_id: UserId, grade: i64) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE case_members SET grade = ?1 WHERE case_id = ?2 AND user_id = ?3",
            params![grade, case_id, student_id],
        )
        .context("failed to update grade")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Chat messages
    // ------------------------------------------------------------------

    /// Persist a chat message. The timestamp is generated here so the stored
    /// row and the broadcast payload agree.
    pub fn add_message(
        &self,
        case_id: CaseId,
        user_id: UserId,
        user_name: &str,
        content: &str,
    ) -> Result<ChatMessage> {
        let timestamp = clock_time();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO messages (case_id, user_name, user_id, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![case_id, user_name, user_id, content, timestamp],
        )
        .context("failed to store chat message")?;
        Ok(ChatMessage {
            id: conn.last_insert_rowid(),
            case_id,
            user_name: user_name.to_string(),
            user_id,
            content: content.to_string(),
            timestamp,
        })
    }

    pub fn messages_for_case(&self, case_id: CaseId) -> Result<Vec<ChatMessage>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, case_id, user_name, user_id, content, timestamp
                 FROM messages WHERE case_id = ?1",
            )
            .context("failed to prepare messages query")?;
        let messages = stmt
            .query_map(params![case_id], |row| {
                Ok(ChatMessage {
                    id: row.get(0)?,
                    case_id: row.get(1)?,
                    user_name: row.get(2)?,
                    user_id: row.get(3)?,
                    content: row.get(4)?,
                    timestamp: row.get(5)?,
                })
            })
            .context("failed to query messages")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map message rows")?;
        Ok(messages)
    }

    // ------------------------------------------------------------------
    // Case files
    // ------------------------------------------------------------------

    /// Record an uploaded file. The date stamp is generated here.
    pub fn add_file(
        &self,
        case_id: CaseId,
        filename: &str,
        original_name: &str,
        uploader_name: &str,
        uploader_id: UserId,
    ) -> Result<CaseFile> {
        let timestamp = date_stamp();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO case_files (case_id, filename, original_name, uploader_name, uploader_id, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![case_id, filename, original_name, uploader_name, uploader_id, timestamp],
        )
        .context("failed to record case file")?;
        Ok(CaseFile {
            id: conn.last_insert_rowid(),
            case_id,
            filename: filename.to_string(),
            original_name: original_name.to_string(),
            uploader_name: uploader_name.to_string(),
            uploader_id,
            timestamp,
        })
    }

    pub fn get_file(&self, id: FileId) -> Result<Option<CaseFile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, case_id, filename, original_name, uploader_name, uploader_id, timestamp
             FROM case_files WHERE id = ?1",
            params![id],
            file_from_row,
        )
        .optional()
        .context("failed to load case file")
    }

    pub fn delete_file(&self, id: FileId) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM case_files WHERE id = ?1", params![id])
            .context("failed to delete case file")?;
        Ok(())
    }

    pub fn files_for_case(&self, case_id: CaseId) -> Result<Vec<CaseFile>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, case_id, filename, original_name, uploader_name, uploader_id, timestamp
                 FROM case_files WHERE case_id = ?1",
            )
            .context("failed to prepare case files query")?;
        let files = stmt
            .query_map(params![case_id], file_from_row)
            .context("failed to query case files")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map case file rows")?;
        Ok(files)
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Insert a notification row (unread) and return it, timestamp included,
    /// so callers can broadcast the exact stored payload.
    pub fn add_notification(&self, user_id: UserId, message: &str) -> Result<Notification> {
        let timestamp = clock_time();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO notifications (user_id, message, timestamp) VALUES (?1, ?2, ?3)",
            params![user_id, message, timestamp],
        )
        .context("failed to store notification")?;
        Ok(Notification {
            id: conn.last_insert_rowid(),
            user_id,
            message: message.to_string(),
            is_read: 0,
            timestamp,
        })
    }

    /// The 20 most recent notifications for a user, newest first.
    pub fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, message, is_read, timestamp
                 FROM notifications WHERE user_id = ?1 ORDER BY id DESC LIMIT 20",
            )
            .context("failed to prepare notifications query")?;
        let notifications = stmt
            .query_map(params![user_id], |row| {
                Ok(Notification {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    message: row.get(2)?,
                    is_read: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })
            .context("failed to query notifications")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map notification rows")?;
        Ok(notifications)
    }

    /// Mark every notification for this user as read.
    pub fn mark_notifications_read(&self, user_id: UserId) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ?1",
            params![user_id],
        )
        .context("failed to mark notifications read")?;
        Ok(())
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        name: row.get(3)?,
        role: row.get(4)?,
        description: row.get(5)?,
    })
}

fn case_from_row(row: &Row<'_>) -> rusqlite::Result<Case> {
    Ok(Case {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        age: row.get(3)?,
        gender: row.get(4)?,
        event_date: row.get(5)?,
        code: row.get(6)?,
        instructor_id: row.get(7)?,
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<CaseFile> {
    Ok(CaseFile {
        id: row.get(0)?,
        case_id: row.get(1)?,
        filename: row.get(2)?,
        original_name: row.get(3)?,
        uploader_name: row.get(4)?,
        uploader_id: row.get(5)?,
        timestamp: row.get(6)?,
    })
}
