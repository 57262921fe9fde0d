//! Chat history handler. Live messages travel over the WebSocket; this
//! endpoint backfills the history when a case view opens.

use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;
use crate::types::{CaseId, ChatMessage};

/// GET /api/messages/{case_id}
pub async fn messages(
    State(state): State<Arc<AppState>>,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.db.messages_for_case(case_id)?))
}
