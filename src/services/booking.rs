use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::errors::BookingError;
use crate::models::{Booking, BookingRequest, BookingStatus, ServiceType, Staff, TimeSlot, User};
use crate::services::availability::AvailabilityResolver;
use crate::services::ledger::{
    ledger_timestamp, BookingFilter, BookingLedger, LedgerError, StatusUpdate,
};

/// Service prices in cents. The only place a booking's price comes from.
pub const fn price_for(service: ServiceType) -> i64 {
    match service {
        ServiceType::SimpleCut => 2500,
        ServiceType::CutAndBeard => 4000,
        ServiceType::PremiumCut => 5000,
        ServiceType::Beard => 2000,
    }
}

/// Every service with its price, in catalog order.
pub const PRICE_TABLE: [(ServiceType, i64); ServiceType::ALL.len()] = {
    let mut table = [(ServiceType::SimpleCut, 0); ServiceType::ALL.len()];
    let mut i = 0;
    while i < table.len() {
        let service = ServiceType::ALL[i];
        table[i] = (service, price_for(service));
        i += 1;
    }
    table
};

/// Change notification for anyone holding a cached view of the ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "booking", rename_all = "lowercase")]
pub enum LedgerEvent {
    Created(Booking),
    Cancelled(Booking),
    Completed(Booking),
}

impl LedgerEvent {
    pub fn booking(&self) -> &Booking {
        match self {
            LedgerEvent::Created(b) | LedgerEvent::Cancelled(b) | LedgerEvent::Completed(b) => b,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Created(_) => "created",
            LedgerEvent::Cancelled(_) => "cancelled",
            LedgerEvent::Completed(_) => "completed",
        }
    }

    /// Clients only hear about their own bookings; staff hear everything.
    pub fn visible_to(&self, user: &User) -> bool {
        user.is_admin() || self.booking().user_id == user.id
    }
}

/// A request whose fields all parsed and refer to known things.
#[derive(Debug, Clone)]
pub struct Selection {
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub staff: Staff,
    pub service: ServiceType,
}

/// Records new bookings and moves existing ones out of `scheduled`.
///
/// The availability check done here is only a fast path. The ledger's own
/// uniqueness constraint decides who wins a race for the same barber.
#[derive(Clone)]
pub struct BookingCommitter {
    ledger: Arc<dyn BookingLedger>,
    resolver: AvailabilityResolver,
    events: broadcast::Sender<LedgerEvent>,
}

impl BookingCommitter {
    pub fn new(
        ledger: Arc<dyn BookingLedger>,
        resolver: AvailabilityResolver,
        events: broadcast::Sender<LedgerEvent>,
    ) -> Self {
        Self {
            ledger,
            resolver,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Checks a raw request without touching the ledger.
    pub fn validate(
        &self,
        request: &BookingRequest,
        now: NaiveDateTime,
    ) -> Result<Selection, BookingError> {
        let date = required(&request.date, "date")?;
        let slot = required(&request.slot, "slot")?;
        let staff_id = required(&request.staff_id, "staff_id")?;
        let service = required(&request.service, "service")?;

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| BookingError::Validation(format!("invalid date: {date}")))?;
        let slot: TimeSlot = slot
            .parse()
            .map_err(|e| BookingError::Validation(format!("{e}")))?;
        let service: ServiceType = service
            .parse()
            .map_err(|e| BookingError::Validation(format!("{e}")))?;
        let staff = self
            .resolver
            .roster()
            .get(staff_id)
            .cloned()
            .ok_or_else(|| BookingError::Validation(format!("unknown staff member: {staff_id}")))?;

        if date < now.date() {
            return Err(BookingError::Validation(format!("{date} is in the past")));
        }
        if !self.resolver.generator().is_bookable(date, slot, now) {
            return Err(BookingError::Validation(format!(
                "{slot} is not a bookable time on {date}"
            )));
        }

        Ok(Selection {
            date,
            slot,
            staff,
            service,
        })
    }

    pub async fn commit(
        &self,
        client: &User,
        request: &BookingRequest,
        now: NaiveDateTime,
    ) -> Result<Booking, BookingError> {
        let selection = self.validate(request, now)?;
        let conflict = || BookingError::Conflict {
            date: selection.date,
            slot: selection.slot,
            staff_id: selection.staff.id.clone(),
        };

        let availability = self
            .resolver
            .staff_availability(selection.date, selection.slot)
            .await?;
        if !availability.is_available(&selection.staff.id) {
            tracing::info!(
                date = %selection.date,
                slot = %selection.slot,
                staff = %selection.staff.id,
                "requested barber already booked"
            );
            return Err(conflict());
        }

        let created_at = ledger_timestamp(now);
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: client.id.clone(),
            date: selection.date,
            slot: selection.slot,
            service: selection.service,
            price_cents: price_for(selection.service),
            staff_id: selection.staff.id.clone(),
            status: BookingStatus::Scheduled,
            client_name: client.name.clone(),
            client_phone: client.phone.clone(),
            created_at,
            updated_at: created_at,
        };

        let booking = match self.ledger.insert_booking(booking).await {
            Ok(b) => b,
            Err(LedgerError::ConstraintViolation) => {
                tracing::warn!(
                    date = %selection.date,
                    slot = %selection.slot,
                    staff = %selection.staff.id,
                    "lost booking race at the ledger"
                );
                return Err(conflict());
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to record booking");
                return Err(e.into());
            }
        };

        tracing::info!(
            booking_id = %booking.id,
            user_id = %booking.user_id,
            date = %booking.date,
            slot = %booking.slot,
            staff = %booking.staff_id,
            service = booking.service.as_str(),
            "booking created"
        );
        self.publish(LedgerEvent::Created(booking.clone()));

        Ok(booking)
    }

    /// Cancelling an already cancelled booking succeeds without change and
    /// without a new event.
    pub async fn cancel(&self, booking_id: &str) -> Result<Booking, BookingError> {
        match self.transition(booking_id, BookingStatus::Cancelled).await? {
            StatusUpdate::Changed(booking) => {
                tracing::info!(booking_id, "booking cancelled");
                self.publish(LedgerEvent::Cancelled(booking.clone()));
                Ok(booking)
            }
            StatusUpdate::Unchanged(booking) => {
                tracing::debug!(booking_id, "booking already cancelled");
                Ok(booking)
            }
        }
    }

    pub async fn complete(&self, booking_id: &str) -> Result<Booking, BookingError> {
        match self.transition(booking_id, BookingStatus::Completed).await? {
            StatusUpdate::Changed(booking) => {
                tracing::info!(booking_id, "booking completed");
                self.publish(LedgerEvent::Completed(booking.clone()));
                Ok(booking)
            }
            StatusUpdate::Unchanged(booking) => Ok(booking),
        }
    }

    pub async fn find(&self, booking_id: &str) -> Result<Booking, BookingError> {
        self.ledger
            .list_bookings(BookingFilter::ById(booking_id.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::NotFound(booking_id.to_string()))
    }

    async fn transition(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<StatusUpdate, BookingError> {
        match self.ledger.update_status(booking_id, status).await {
            Ok(update) => Ok(update),
            Err(LedgerError::InvalidTransition { from, .. }) => Err(BookingError::InvalidTransition {
                id: booking_id.to_string(),
                status: from,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn publish(&self, event: LedgerEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, BookingError> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BookingError::Validation(format!("{name} is required")))
}
