//! Login, registration, and profile handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::Success;
use crate::state::AppState;
use crate::types::{User, UserId, UserProfile};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: User,
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state.db.authenticate(&req.email, &req.password)? {
        Some(user) => Ok(Json(LoginResponse {
            success: true,
            user,
        })),
        None => {
            tracing::debug!("Failed login attempt for {}", req.email);
            Err(ApiError::InvalidCredentials)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// POST /api/register
///
/// A duplicate email is reported as `{success: false}` rather than an error
/// status; the client treats both the same way.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Json<Success> {
    match state
        .db
        .create_user(&req.name, &req.email, &req.password, &req.role)
    {
        Ok(id) => {
            tracing::info!("Registered user {} ({})", id, req.email);
            Json(Success::ok())
        }
        Err(e) => {
            tracing::warn!("Registration failed for {}: {e:#}", req.email);
            Json(Success::failed())
        }
    }
}

/// GET /api/user-profile/{id}
pub async fn user_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .db
        .get_user_profile(id)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub user_id: UserId,
    pub description: String,
}

/// POST /api/update-profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Success>, ApiError> {
    state.db.update_description(req.user_id, &req.description)?;
    Ok(Json(Success::ok()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub user_id: UserId,
    pub new_password: String,
}

/// POST /api/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Success>, ApiError> {
    state.db.update_password(req.user_id, &req.new_password)?;
    Ok(Json(Success::ok()))
}
