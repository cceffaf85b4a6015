use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::errors::BookingError;
use crate::models::{Booking, BookingStatus, Roster, Staff, TimeSlot};
use crate::services::ledger::{BookingFilter, BookingLedger};
use crate::services::slots::SlotGenerator;

/// Who can still take a given (date, slot). Both lists keep roster order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StaffAvailability {
    pub available: Vec<Staff>,
    pub unavailable: Vec<Staff>,
}

impl StaffAvailability {
    pub fn is_available(&self, staff_id: &str) -> bool {
        self.available.iter().any(|s| s.id == staff_id)
    }
}

/// Answers "which slots still have a free barber" and "which barbers are
/// free at this slot" from the ledger. Ledger failures are returned, never
/// papered over with a default answer.
#[derive(Clone)]
pub struct AvailabilityResolver {
    ledger: Arc<dyn BookingLedger>,
    roster: Roster,
    generator: SlotGenerator,
}

impl AvailabilityResolver {
    pub fn new(ledger: Arc<dyn BookingLedger>, roster: Roster) -> Self {
        Self {
            ledger,
            roster,
            generator: SlotGenerator::new(),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn generator(&self) -> &SlotGenerator {
        &self.generator
    }

    pub async fn slots_with_capacity(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<TimeSlot>, BookingError> {
        let slots: Vec<TimeSlot> = self.generator.slots_for(date, now).collect();
        if slots.is_empty() {
            return Ok(vec![]);
        }

        let bookings = self
            .ledger
            .list_bookings(BookingFilter::ByDate(date))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, %date, "failed to load bookings for slot capacity");
                BookingError::from(e)
            })?;

        Ok(free_slots(slots, &bookings, self.roster.len()))
    }

    pub async fn staff_availability(
        &self,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<StaffAvailability, BookingError> {
        let bookings = self
            .ledger
            .list_bookings(BookingFilter::ByDateAndSlot(date, slot))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, %date, %slot, "failed to load bookings for staff availability");
                BookingError::from(e)
            })?;

        Ok(partition_roster(&self.roster, &bookings))
    }
}

/// Keeps the slots where fewer than `roster_size` scheduled bookings exist.
/// `bookings` are expected to belong to a single day.
pub fn free_slots<I>(slots: I, bookings: &[Booking], roster_size: usize) -> Vec<TimeSlot>
where
    I: IntoIterator<Item = TimeSlot>,
{
    let mut occupied: HashMap<TimeSlot, usize> = HashMap::new();
    for booking in bookings.iter().filter(|b| b.status == BookingStatus::Scheduled) {
        *occupied.entry(booking.slot).or_default() += 1;
    }

    slots
        .into_iter()
        .filter(|slot| occupied.get(slot).copied().unwrap_or(0) < roster_size)
        .collect()
}

/// Splits the roster by whether a scheduled booking already holds each barber.
/// `bookings` are expected to belong to a single (date, slot).
pub fn partition_roster(roster: &Roster, bookings: &[Booking]) -> StaffAvailability {
    let booked: HashSet<&str> = bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Scheduled)
        .map(|b| b.staff_id.as_str())
        .collect();

    let (unavailable, available): (Vec<Staff>, Vec<Staff>) = roster
        .iter()
        .cloned()
        .partition(|staff| booked.contains(staff.id.as_str()));

    StaffAvailability {
        available,
        unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ledger::tests::{booking, date, setup_db, slot};
    use crate::services::ledger::{LedgerError, SqliteLedger, StatusUpdate};
    use async_trait::async_trait;

    fn roster_abc() -> Roster {
        Roster::new(
            ["A", "B", "C"]
                .iter()
                .map(|id| Staff {
                    id: id.to_string(),
                    name: format!("Barber {id}"),
                })
                .collect(),
        )
    }

    fn ids(staff: &[Staff]) -> Vec<&str> {
        staff.iter().map(|s| s.id.as_str()).collect()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_two_of_three_booked() {
        let bookings = vec![
            booking("b1", "2025-06-16", "14:00", "A"),
            booking("b2", "2025-06-16", "14:00", "B"),
        ];

        let split = partition_roster(&roster_abc(), &bookings);
        assert_eq!(ids(&split.available), vec!["C"]);
        assert_eq!(ids(&split.unavailable), vec!["A", "B"]);

        let free = free_slots(vec![slot("13:45"), slot("14:00")], &bookings, 3);
        assert_eq!(free, vec![slot("13:45"), slot("14:00")]);
    }

    #[test]
    fn test_fully_booked_slot_has_no_capacity() {
        let bookings = vec![
            booking("b1", "2025-06-16", "14:00", "C"),
            booking("b2", "2025-06-16", "14:00", "A"),
            booking("b3", "2025-06-16", "14:00", "B"),
        ];

        let split = partition_roster(&roster_abc(), &bookings);
        assert!(split.available.is_empty());
        // roster order, not booking order
        assert_eq!(ids(&split.unavailable), vec!["A", "B", "C"]);

        let free = free_slots(vec![slot("13:45"), slot("14:00"), slot("14:15")], &bookings, 3);
        assert_eq!(free, vec![slot("13:45"), slot("14:15")]);
    }

    #[test]
    fn test_only_scheduled_bookings_occupy() {
        let mut cancelled = booking("b1", "2025-06-16", "14:00", "A");
        cancelled.status = BookingStatus::Cancelled;
        let mut completed = booking("b2", "2025-06-16", "14:00", "B");
        completed.status = BookingStatus::Completed;
        let bookings = vec![cancelled, completed, booking("b3", "2025-06-16", "14:00", "C")];

        let split = partition_roster(&roster_abc(), &bookings);
        assert_eq!(ids(&split.available), vec!["A", "B"]);
        assert_eq!(ids(&split.unavailable), vec!["C"]);
        assert!(free_slots(vec![slot("14:00")], &bookings, 1).is_empty());
        assert_eq!(free_slots(vec![slot("14:00")], &bookings, 2), vec![slot("14:00")]);
    }

    #[test]
    fn test_fresh_slot_has_everyone_available() {
        let split = partition_roster(&roster_abc(), &[]);
        assert_eq!(ids(&split.available), vec!["A", "B", "C"]);
        assert!(split.unavailable.is_empty());
    }

    #[test]
    fn test_partition_covers_roster_exactly() {
        let roster = roster_abc();
        let cases = [vec![], vec!["A"], vec!["B", "C"], vec!["A", "B", "C"]];
        for booked in cases {
            let bookings: Vec<_> = booked
                .iter()
                .enumerate()
                .map(|(i, id)| booking(&format!("b{i}"), "2025-06-16", "10:00", id))
                .collect();
            let split = partition_roster(&roster, &bookings);

            assert_eq!(split.available.len() + split.unavailable.len(), roster.len());
            for staff in &roster {
                let in_available = split.available.contains(staff);
                let in_unavailable = split.unavailable.contains(staff);
                assert!(in_available != in_unavailable);
                assert_eq!(in_unavailable, booked.contains(&staff.id.as_str()));
            }
        }
    }

    #[tokio::test]
    async fn test_resolver_reads_the_ledger() {
        let db = setup_db();
        let ledger = Arc::new(SqliteLedger::new(db));
        for (id, staff) in [("b1", "1"), ("b2", "2"), ("b3", "3"), ("b4", "4")] {
            ledger
                .insert_booking(booking(id, "2025-06-17", "14:00", staff))
                .await
                .unwrap();
        }
        ledger
            .insert_booking(booking("b5", "2025-06-17", "15:00", "3"))
            .await
            .unwrap();

        let conn = crate::db::init_db(":memory:").unwrap();
        let roster = Roster::new(crate::db::queries::list_staff(&conn).unwrap());
        let resolver = AvailabilityResolver::new(ledger, roster);
        let now = at("2025-06-16 18:00");

        let free = resolver.slots_with_capacity(date("2025-06-17"), now).await.unwrap();
        assert_eq!(free.len(), 40);
        assert!(!free.contains(&slot("14:00")));
        assert!(free.contains(&slot("15:00")));

        let split = resolver
            .staff_availability(date("2025-06-17"), slot("15:00"))
            .await
            .unwrap();
        assert_eq!(ids(&split.available), vec!["1", "2", "4"]);
        assert_eq!(ids(&split.unavailable), vec!["3"]);
    }

    struct DownLedger;

    #[async_trait]
    impl BookingLedger for DownLedger {
        async fn list_bookings(&self, _filter: BookingFilter) -> Result<Vec<Booking>, LedgerError> {
            Err(LedgerError::Unavailable("connection refused".to_string()))
        }

        async fn insert_booking(&self, _booking: Booking) -> Result<Booking, LedgerError> {
            Err(LedgerError::Unavailable("connection refused".to_string()))
        }

        async fn update_status(
            &self,
            _id: &str,
            _status: BookingStatus,
        ) -> Result<StatusUpdate, LedgerError> {
            Err(LedgerError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_ledger_failure_is_surfaced() {
        let resolver = AvailabilityResolver::new(Arc::new(DownLedger), roster_abc());
        let now = at("2025-06-16 08:00");

        let err = resolver
            .slots_with_capacity(date("2025-06-16"), now)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::StoreUnavailable(_)));

        let err = resolver
            .staff_availability(date("2025-06-16"), slot("14:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::StoreUnavailable(_)));
    }
}
