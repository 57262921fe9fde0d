//! Case file handlers: upload, delete, list.

use anyhow::{Context, Result};
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Deserialize;
use std::path::Path as FsPath;
use std::sync::Arc;

use super::error::ApiError;
use super::Success;
use crate::protocol::ServerMessage;
use crate::rooms::Room;
use crate::state::AppState;
use crate::types::{CaseFile, CaseId, FileId, UserId, INSTRUCTOR_ROLE};

/// Write an uploaded file into `upload_dir` and return the stored filename.
///
/// Stored names are prefixed with the upload time in unix millis so repeated
/// uploads of the same file never collide. Only the final path component of
/// the client-supplied name is kept.
pub async fn save_upload(upload_dir: &FsPath, original_name: &str, data: &[u8]) -> Result<String> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .context("failed to create upload directory")?;

    let base = FsPath::new(original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let stored = format!("{}-{}", chrono::Utc::now().timestamp_millis(), base);

    tokio::fs::write(upload_dir.join(&stored), data)
        .await
        .with_context(|| format!("failed to write uploaded file {stored}"))?;
    Ok(stored)
}

/// POST /api/upload-file (multipart)
///
/// Text fields: caseId, uploaderName, uploaderId; the file goes in `file`.
/// A request without a file is reported as `{success: false}`.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Success>, ApiError> {
    let mut case_id: Option<CaseId> = None;
    let mut uploader_name = String::new();
    let mut uploader_id: Option<UserId> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .context("failed to read multipart field")?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "caseId" => {
                let text = field.text().await.context("invalid caseId field")?;
                case_id = Some(
                    text.parse()
                        .map_err(|_| ApiError::BadRequest("invalid caseId".to_string()))?,
                );
            }
            "uploaderName" => {
                uploader_name = field.text().await.context("invalid uploaderName field")?
            }
            "uploaderId" => {
                let text = field.text().await.context("invalid uploaderId field")?;
                uploader_id = Some(
                    text.parse()
                        .map_err(|_| ApiError::BadRequest("invalid uploaderId".to_string()))?,
                );
            }
            "file" => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.context("failed to read file field")?;
                upload = Some((original_name, data.to_vec()));
            }
            _ => {}
        }
    }

    let Some((original_name, data)) = upload else {
        return Ok(Json(Success::failed()));
    };
    let case_id = case_id.ok_or_else(|| ApiError::BadRequest("missing caseId".to_string()))?;
    let uploader_id =
        uploader_id.ok_or_else(|| ApiError::BadRequest("missing uploaderId".to_string()))?;

    let stored = save_upload(&state.config.upload_dir, &original_name, &data).await?;
    state
        .db
        .add_file(case_id, &stored, &original_name, &uploader_name, uploader_id)?;
    tracing::info!("File {} uploaded to case {}", original_name, case_id);

    state
        .rooms
        .publish(Room::Case(case_id), ServerMessage::FileUploaded { case_id })
        .await;
    Ok(Json(Success::ok()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileRequest {
    pub file_id: FileId,
    pub user_id: UserId,
    pub user_role: String,
}

/// POST /api/delete-file
///
/// Only the uploader or an instructor may delete a file. The case room gets
/// the same refetch event as uploads.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteFileRequest>,
) -> Result<Json<Success>, ApiError> {
    let Some(file) = state.db.get_file(req.file_id)? else {
        return Err(ApiError::NotFound);
    };

    let allowed = req.user_role == INSTRUCTOR_ROLE || file.uploader_id == req.user_id;
    if !allowed {
        tracing::debug!(
            "User {} denied deleting file {} owned by {}",
            req.user_id,
            file.id,
            file.uploader_id
        );
        return Ok(Json(Success::failed()));
    }

    state.db.delete_file(file.id)?;
    state
        .rooms
        .publish(
            Room::Case(file.case_id),
            ServerMessage::FileUploaded {
                case_id: file.case_id,
            },
        )
        .await;
    Ok(Json(Success::ok()))
}

/// GET /api/case-files/{id}
pub async fn case_files(
    State(state): State<Arc<AppState>>,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Vec<CaseFile>>, ApiError> {
    Ok(Json(state.db.files_for_case(case_id)?))
}
