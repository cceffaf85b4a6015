use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::errors::{AppError, BookingError};
use crate::handlers::{current_user, now, user_for_token};
use crate::models::{Booking, BookingRequest, BookingStatus};
use crate::services::ledger::BookingFilter;
use crate::state::AppState;

// GET /api/bookings
#[derive(Serialize)]
pub struct OwnBookingsResponse {
    upcoming: Vec<Booking>,
    history: Vec<Booking>,
}

pub async fn list_own(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<OwnBookingsResponse>, AppError> {
    let user = current_user(&state, &headers).await?;
    let bookings = state
        .ledger
        .list_bookings(BookingFilter::ByUser(user.id.clone()))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user.id, "failed to load own bookings");
            BookingError::from(e)
        })?;

    let (upcoming, mut history): (Vec<_>, Vec<_>) = bookings
        .into_iter()
        .partition(|b| b.status == BookingStatus::Scheduled);
    history.reverse();

    Ok(Json(OwnBookingsResponse { upcoming, history }))
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let user = current_user(&state, &headers).await?;
    let booking = state.committer.commit(&user, &req, now()).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let user = current_user(&state, &headers).await?;
    let booking = state.committer.find(&id).await?;
    if booking.user_id != user.id && !user.is_admin() {
        tracing::warn!(booking_id = %id, user_id = %user.id, "cancel refused for non-owner");
        return Err(AppError::Forbidden);
    }

    Ok(Json(state.committer.cancel(&id).await?))
}

// GET /api/bookings/events?token=
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // EventSource can't set headers
    let token = query.token.as_deref().ok_or(AppError::Unauthorized)?;
    let user = user_for_token(&state, token).await?;

    let rx = state.committer.subscribe();
    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.visible_to(&user) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().data(data).event(event.name())))
        }
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "booking event subscriber lagged");
            None
        }
    });

    let keepalive_stream = StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    Ok(Sse::new(StreamExt::merge(live_stream, keepalive_stream)))
}
