pub mod admin;
pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod health;
pub mod slots;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDate, NaiveDateTime};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::models::User;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        .route("/api/services", get(catalog::list_services))
        .route("/api/plans", get(catalog::list_plans))
        .route("/api/staff", get(catalog::list_staff))
        .route("/api/slots", get(slots::get_slots))
        .route("/api/availability", get(slots::get_availability))
        .route(
            "/api/bookings",
            get(bookings::list_own).post(bookings::create_booking),
        )
        .route("/api/bookings/events", get(bookings::events_stream))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/admin/bookings", get(admin::get_bookings))
        .route("/api/admin/roster", get(admin::get_roster))
        .route(
            "/api/admin/bookings/:id/complete",
            post(admin::complete_booking),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// "Now" on the shop's wall clock, sampled once per request.
pub(crate) fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub(crate) async fn user_for_token(state: &AppState, token: &str) -> Result<User, AppError> {
    state
        .directory
        .user_for_session(token, now())
        .await?
        .ok_or(AppError::Unauthorized)
}

pub(crate) async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    user_for_token(state, token).await
}

pub(crate) async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let user = current_user(state, headers).await?;
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

pub(crate) fn parse_date(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::BadRequest("date is required".to_string()))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date: {raw}")))
}
