//! HTTP API route handlers.
//!
//! Each handler is one or two store calls plus an optional room broadcast.

pub mod auth;
pub mod cases;
pub mod chat;
pub mod error;
pub mod files;
pub mod notifications;

use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Generic `{ "success": bool }` response used by most write endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub fn ok() -> Self {
        Self { success: true }
    }

    pub fn failed() -> Self {
        Self { success: false }
    }
}

/// Build the `/api` route surface.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/register", post(auth::register))
        .route("/api/user-profile/{id}", get(auth::user_profile))
        .route("/api/update-profile", post(auth::update_profile))
        .route("/api/change-password", post(auth::change_password))
        .route("/api/create-case", post(cases::create_case))
        .route("/api/join-case", post(cases::join_case))
        .route("/api/my-cases", post(cases::my_cases))
        .route("/api/case-students/{case_id}", get(cases::case_students))
        .route("/api/update-grade", post(cases::update_grade))
        .route("/api/edit-case", post(cases::edit_case))
        .route("/api/case-details/{id}", get(cases::case_details))
        .route("/api/upload-file", post(files::upload_file))
        .route("/api/delete-file", post(files::delete_file))
        .route("/api/case-files/{id}", get(files::case_files))
        .route("/api/messages/{case_id}", get(chat::messages))
        .route("/api/notifications/{user_id}", get(notifications::list))
        .route(
            "/api/notifications/mark-read",
            post(notifications::mark_read),
        )
}
