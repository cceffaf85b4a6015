use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::errors::{AppError, BookingError};
use crate::handlers::{now, parse_date, require_admin};
use crate::models::{Booking, BookingStatus};
use crate::services::ledger::BookingFilter;
use crate::services::roster::{load_roster, RosterDay};
use crate::state::AppState;

const MAX_ROSTER_DAYS: u32 = 31;

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require_admin(&state, &headers).await?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            BookingStatus::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status: {raw}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let bookings = state
        .ledger
        .list_bookings(BookingFilter::Recent { status, limit })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to load bookings for admin");
            BookingError::from(e)
        })?;

    Ok(Json(bookings))
}

// GET /api/admin/roster?date=&days=
#[derive(Deserialize)]
pub struct RosterQuery {
    pub date: Option<String>,
    pub days: Option<u32>,
}

pub async fn get_roster(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RosterQuery>,
) -> Result<Json<Vec<RosterDay>>, AppError> {
    require_admin(&state, &headers).await?;

    let start = match query.date.as_deref() {
        Some(raw) => parse_date(Some(raw))?,
        None => now().date(),
    };
    let days = query.days.unwrap_or(1).clamp(1, MAX_ROSTER_DAYS);

    let roster = load_roster(state.ledger.as_ref(), state.resolver.roster(), start, days)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, %start, days, "failed to load roster");
            e
        })?;

    Ok(Json(roster))
}

// POST /api/admin/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let booking = state.committer.complete(&id).await?;
    tracing::info!(booking_id = %id, admin_id = %admin.id, "marked completed by admin");
    Ok(Json(booking))
}
