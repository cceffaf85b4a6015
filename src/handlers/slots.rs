use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::handlers::{now, parse_date};
use crate::models::{group_by_period, Period, TimeSlot};
use crate::services::availability::StaffAvailability;
use crate::state::AppState;

// GET /api/slots?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct PeriodSlots {
    period: Period,
    label: &'static str,
    slots: Vec<TimeSlot>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    date: NaiveDate,
    periods: Vec<PeriodSlots>,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let date = parse_date(query.date.as_deref())?;
    let free = state.resolver.slots_with_capacity(date, now()).await?;

    let groups = group_by_period(free);
    let periods = groups
        .labelled()
        .into_iter()
        .map(|(period, slots)| PeriodSlots {
            period,
            label: period.label(),
            slots: slots.to_vec(),
        })
        .collect();

    Ok(Json(SlotsResponse { date, periods }))
}

// GET /api/availability?date=YYYY-MM-DD&slot=HH:MM
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
    pub slot: Option<String>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<StaffAvailability>, AppError> {
    let date = parse_date(query.date.as_deref())?;
    let slot: TimeSlot = query
        .slot
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("slot is required".to_string()))?
        .trim()
        .parse()
        .map_err(|e| AppError::BadRequest(format!("{e}")))?;

    Ok(Json(state.resolver.staff_availability(date, slot).await?))
}
