use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rusqlite::{Connection, ErrorCode};

use crate::db::queries;
use crate::errors::BookingError;
use crate::models::{Booking, BookingStatus, TimeSlot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingFilter {
    All,
    ById(String),
    ByUser(String),
    ByDate(NaiveDate),
    ByDateAndSlot(NaiveDate, TimeSlot),
    /// Inclusive on both ends.
    DateRange(NaiveDate, NaiveDate),
    /// Newest appointments first, optionally one status only.
    Recent {
        status: Option<BookingStatus>,
        limit: u32,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("booking violates a ledger constraint")]
    ConstraintViolation,

    #[error("booking not found: {0}")]
    NotFound(String),

    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },
}

/// Outcome of [`BookingLedger::update_status`].
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Changed(Booking),
    /// The booking already had the requested status; nothing was written.
    Unchanged(Booking),
}

impl StatusUpdate {
    pub fn booking(&self) -> &Booking {
        match self {
            StatusUpdate::Changed(b) | StatusUpdate::Unchanged(b) => b,
        }
    }

    pub fn into_booking(self) -> Booking {
        match self {
            StatusUpdate::Changed(b) | StatusUpdate::Unchanged(b) => b,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, StatusUpdate::Changed(_))
    }
}

impl From<LedgerError> for BookingError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(id) => BookingError::NotFound(id),
            other => BookingError::StoreUnavailable(other.to_string()),
        }
    }
}

/// The shared record of bookings. It is the only source of truth for
/// occupancy and must itself reject a second scheduled booking on the same
/// (date, slot, staff) triple.
#[async_trait]
pub trait BookingLedger: Send + Sync {
    /// Ordered by date, slot, then roster position.
    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, LedgerError>;

    async fn insert_booking(&self, booking: Booking) -> Result<Booking, LedgerError>;

    /// Setting the status a booking already has is a no-op success.
    async fn update_status(
        &self,
        id: &str,
        status: BookingStatus,
    ) -> Result<StatusUpdate, LedgerError>;
}

pub struct SqliteLedger {
    db: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.db
            .lock()
            .map_err(|_| LedgerError::Unavailable("database lock poisoned".to_string()))
    }
}

fn classify(e: anyhow::Error) -> LedgerError {
    match e.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(failure, _))
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            LedgerError::ConstraintViolation
        }
        _ => LedgerError::Unavailable(format!("{e:#}")),
    }
}

#[async_trait]
impl BookingLedger for SqliteLedger {
    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, LedgerError> {
        let conn = self.conn()?;
        let bookings = match &filter {
            BookingFilter::All => queries::get_all_bookings(&conn),
            BookingFilter::ById(id) => {
                queries::get_booking_by_id(&conn, id).map(|b| b.into_iter().collect())
            }
            BookingFilter::ByUser(user_id) => queries::get_bookings_for_user(&conn, user_id),
            BookingFilter::ByDate(date) => queries::get_bookings_on_date(&conn, date),
            BookingFilter::ByDateAndSlot(date, slot) => {
                queries::get_bookings_at_slot(&conn, date, slot)
            }
            BookingFilter::DateRange(start, end) => {
                queries::get_bookings_in_range(&conn, start, end)
            }
            BookingFilter::Recent { status, limit } => {
                queries::get_recent_bookings(&conn, *status, i64::from(*limit))
            }
        };
        bookings.map_err(classify)
    }

    async fn insert_booking(&self, booking: Booking) -> Result<Booking, LedgerError> {
        let conn = self.conn()?;
        queries::create_booking(&conn, &booking).map_err(classify)?;
        Ok(booking)
    }

    async fn update_status(
        &self,
        id: &str,
        status: BookingStatus,
    ) -> Result<StatusUpdate, LedgerError> {
        let conn = self.conn()?;
        let current = queries::get_booking_by_id(&conn, id)
            .map_err(classify)?
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;

        if current.status == status {
            return Ok(StatusUpdate::Unchanged(current));
        }
        if !current.status.can_transition_to(status) {
            return Err(LedgerError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let now = chrono::Local::now().naive_local();
        queries::update_booking_status(&conn, id, status, &now).map_err(classify)?;

        queries::get_booking_by_id(&conn, id)
            .map_err(classify)?
            .map(StatusUpdate::Changed)
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }
}

/// Seconds-precision timestamp, matching what the ledger stores.
pub fn ledger_timestamp(now: NaiveDateTime) -> NaiveDateTime {
    now.with_nanosecond(0).unwrap_or(now)
}
