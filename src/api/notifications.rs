//! Notification handlers: recent list and mark-read.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::error::ApiError;
use super::Success;
use crate::state::AppState;
use crate::types::{Notification, UserId};

/// GET /api/notifications/{user_id}
///
/// The 20 most recent notifications, newest first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.db.notifications_for_user(user_id)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub user_id: UserId,
}

/// POST /api/notifications/mark-read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<Success>, ApiError> {
    state.db.mark_notifications_read(req.user_id)?;
    Ok(Json(Success::ok()))
}
