//! Case lifecycle handlers: create, join, list, grade, edit.

use anyhow::Context;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::files::save_upload;
use super::Success;
use crate::protocol::ServerMessage;
use crate::rooms::Room;
use crate::state::AppState;
use crate::types::{Case, CaseId, CaseStudent, UserId, INSTRUCTOR_ROLE};

/// Join codes are short, uppercase, and unambiguous enough to read aloud.
const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LENGTH: usize = 6;

fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

#[derive(Debug, Serialize)]
pub struct CreateCaseResponse {
    pub success: bool,
    pub code: String,
}

/// POST /api/create-case (multipart)
///
/// Text fields: title, description, age, gender, eventDate, instructorId.
/// An optional `pdf` file is stored and recorded as the first case file.
pub async fn create_case(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<CreateCaseResponse>, ApiError> {
    let mut title = String::new();
    let mut description = String::new();
    let mut age = String::new();
    let mut gender = String::new();
    let mut event_date = String::new();
    let mut instructor_id: Option<UserId> = None;
    let mut attachment: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .context("failed to read multipart field")?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = field.text().await.context("invalid title field")?,
            "description" => {
                description = field.text().await.context("invalid description field")?
            }
            "age" => age = field.text().await.context("invalid age field")?,
            "gender" => gender = field.text().await.context("invalid gender field")?,
            "eventDate" => event_date = field.text().await.context("invalid eventDate field")?,
            "instructorId" => {
                let text = field.text().await.context("invalid instructorId field")?;
                instructor_id = Some(
                    text.parse()
                        .map_err(|_| ApiError::BadRequest("invalid instructorId".to_string()))?,
                );
            }
            "pdf" => {
                let original_name = field.file_name().unwrap_or("upload.pdf").to_string();
                let data = field.bytes().await.context("failed to read pdf field")?;
                attachment = Some((original_name, data.to_vec()));
            }
            _ => {}
        }
    }

    let instructor_id =
        instructor_id.ok_or_else(|| ApiError::BadRequest("missing instructorId".to_string()))?;

    // Generate a unique join code (check for collisions)
    let code = loop {
        let candidate = generate_join_code();
        if state.db.get_case_by_code(&candidate)?.is_none() {
            break candidate;
        }
        // Collision - try again (extremely rare with 36^6 combinations)
    };

    let case_id = state.db.create_case(
        &title,
        &description,
        &age,
        &gender,
        &event_date,
        &code,
        instructor_id,
    )?;
    tracing::info!("Created case {} with code {}", case_id, code);

    if let Some((original_name, data)) = attachment {
        let stored = save_upload(&state.config.upload_dir, &original_name, &data).await?;
        state
            .db
            .add_file(case_id, &stored, &original_name, "Instructor", instructor_id)?;
    }

    Ok(Json(CreateCaseResponse {
        success: true,
        code,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCaseRequest {
    pub code: String,
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct JoinCaseResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "caseId", skip_serializing_if = "Option::is_none")]
    pub case_id: Option<CaseId>,
}

impl JoinCaseResponse {
    fn rejected(message: &str) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
            case_id: None,
        }
    }
}

/// POST /api/join-case
///
/// Adds the student to the case and notifies the instructor in real time.
/// Bad codes and duplicate joins are rejected with a message, not an error
/// status.
pub async fn join_case(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JoinCaseRequest>,
) -> Result<Json<JoinCaseResponse>, ApiError> {
    let Some(case) = state.db.get_case_by_code(&req.code)? else {
        return Ok(Json(JoinCaseResponse::rejected("Invalid code")));
    };

    if state.db.is_member(case.id, req.user_id)? {
        return Ok(Json(JoinCaseResponse::rejected("Already joined")));
    }

    state.db.add_member(case.id, req.user_id)?;

    let user_name = state
        .db
        .get_user(req.user_id)?
        .map(|u| u.name)
        .unwrap_or_else(|| "A student".to_string());
    state
        .notify_user(
            case.instructor_id,
            format!("{} has joined your case: \"{}\"", user_name, case.title),
        )
        .await?;

    Ok(Json(JoinCaseResponse {
        success: true,
        message: None,
        case_id: Some(case.id),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyCasesRequest {
    pub user_id: UserId,
    pub role: String,
}

/// POST /api/my-cases
///
/// Instructors get the cases they own; students get the cases they joined,
/// grade included.
pub async fn my_cases(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MyCasesRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cases = if req.role == INSTRUCTOR_ROLE {
        serde_json::to_value(state.db.cases_for_instructor(req.user_id)?)
    } else {
        serde_json::to_value(state.db.cases_for_student(req.user_id)?)
    }
    .context("failed to serialize case list")?;
    Ok(Json(cases))
}

/// GET /api/case-students/{case_id}
pub async fn case_students(
    State(state): State<Arc<AppState>>,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Vec<CaseStudent>>, ApiError> {
    Ok(Json(state.db.case_students(case_id)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGradeRequest {
    pub case_id: CaseId,
    pub student_id: UserId,
    pub grade: i64,
}

/// POST /api/update-grade
///
/// Updates the grade and notifies the student in real time.
pub async fn update_grade(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateGradeRequest>,
) -> Result<Json<Success>, ApiError> {
    state
        .db
        .update_grade(req.case_id, req.student_id, req.grade)?;
    state
        .notify_user(
            req.student_id,
            format!("Your grade in the case has been updated to: {}", req.grade),
        )
        .await?;
    Ok(Json(Success::ok()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCaseRequest {
    pub id: CaseId,
    pub title: String,
    pub description: String,
    pub age: String,
    pub gender: String,
    pub event_date: String,
}

/// POST /api/edit-case
///
/// Updates the case details and tells the case room to refetch.
pub async fn edit_case(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EditCaseRequest>,
) -> Result<Json<Success>, ApiError> {
    state.db.update_case(
        req.id,
        &req.title,
        &req.description,
        &req.age,
        &req.gender,
        &req.event_date,
    )?;
    state
        .rooms
        .publish(Room::Case(req.id), ServerMessage::CaseUpdated { case_id: req.id })
        .await;
    Ok(Json(Success::ok()))
}

/// GET /api/case-details/{id}
pub async fn case_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<CaseId>,
) -> Result<Json<Case>, ApiError> {
    state.db.get_case(id)?.map(Json).ok_or(ApiError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_code_shape() {
        for _ in 0..100 {
            let code = generate_join_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_join_response_omits_empty_fields() {
        let rejected = serde_json::to_value(JoinCaseResponse::rejected("Invalid code")).unwrap();
        assert_eq!(rejected["success"], false);
        assert_eq!(rejected["message"], "Invalid code");
        assert!(rejected.get("caseId").is_none());

        let joined = serde_json::to_value(JoinCaseResponse {
            success: true,
            message: None,
            case_id: Some(4),
        })
        .unwrap();
        assert_eq!(joined["caseId"], 4);
        assert!(joined.get("message").is_none());
    }
}
