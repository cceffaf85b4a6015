use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::handlers::{bearer_token, current_user, now};
use crate::models::User;
use crate::services::directory::NewAccount;
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    token: String,
    user: User,
}

// POST /api/auth/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let user = state
        .directory
        .create_account(NewAccount {
            name: req.name,
            email: req.email,
            phone: req.phone,
            password: req.password,
        })
        .await?;
    let token = state.directory.issue_session(&user, now()).await?;

    Ok((StatusCode::CREATED, Json(SessionResponse { token, user })))
}

// POST /api/auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("email and password are required".to_string()));
    }

    let user = state.directory.authenticate(&req.email, &req.password).await?;
    let token = state.directory.issue_session(&user, now()).await?;
    tracing::info!(user_id = %user.id, "logged in");

    Ok(Json(SessionResponse { token, user }))
}

// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    state.directory.revoke_session(token).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<User>, AppError> {
    Ok(Json(current_user(&state, &headers).await?))
}
