use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::errors::BookingError;
use crate::models::{Booking, BookingStatus, Roster};
use crate::services::ledger::{BookingFilter, BookingLedger};

/// One day of the staff view.
#[derive(Debug, Clone, Serialize)]
pub struct RosterDay {
    pub date: NaiveDate,
    pub bookings: Vec<RosterEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    #[serde(flatten)]
    pub booking: Booking,
    pub staff_name: String,
}

/// Scheduled bookings for `days` consecutive days starting at `start`, one
/// entry per day (empty days included), each sorted by slot then roster order.
pub async fn load_roster(
    ledger: &dyn BookingLedger,
    roster: &Roster,
    start: NaiveDate,
    days: u32,
) -> Result<Vec<RosterDay>, BookingError> {
    let days = days.max(1);
    let end = start + Duration::days(i64::from(days) - 1);
    let bookings = ledger
        .list_bookings(BookingFilter::DateRange(start, end))
        .await?;
    Ok(build_roster(roster, bookings, start, days))
}

pub fn build_roster(
    roster: &Roster,
    bookings: Vec<Booking>,
    start: NaiveDate,
    days: u32,
) -> Vec<RosterDay> {
    let mut by_day: BTreeMap<NaiveDate, Vec<RosterEntry>> = (0..days)
        .map(|offset| (start + Duration::days(i64::from(offset)), Vec::new()))
        .collect();

    for booking in bookings
        .into_iter()
        .filter(|b| b.status == BookingStatus::Scheduled)
    {
        let Some(entries) = by_day.get_mut(&booking.date) else {
            continue;
        };
        let staff_name = roster
            .get(&booking.staff_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| booking.staff_id.clone());
        entries.push(RosterEntry {
            booking,
            staff_name,
        });
    }

    by_day
        .into_iter()
        .map(|(date, mut bookings)| {
            bookings.sort_by_key(|e| {
                (
                    e.booking.slot,
                    roster.position(&e.booking.staff_id).unwrap_or(usize::MAX),
                )
            });
            RosterDay { date, bookings }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Staff;
    use crate::services::ledger::tests::{booking, date};

    fn roster() -> Roster {
        Roster::new(vec![
            Staff {
                id: "1".to_string(),
                name: "Carlos Silva".to_string(),
            },
            Staff {
                id: "2".to_string(),
                name: "João Santos".to_string(),
            },
        ])
    }

    #[test]
    fn test_day_view_sorted_by_slot_then_roster() {
        let mut cancelled = booking("x", "2025-06-16", "09:45", "1");
        cancelled.status = BookingStatus::Cancelled;
        let bookings = vec![
            booking("b1", "2025-06-16", "15:00", "1"),
            booking("b2", "2025-06-16", "10:00", "2"),
            booking("b3", "2025-06-16", "10:00", "1"),
            cancelled,
        ];

        let days = build_roster(&roster(), bookings, date("2025-06-16"), 1);
        assert_eq!(days.len(), 1);
        let ids: Vec<_> = days[0].bookings.iter().map(|e| e.booking.id.as_str()).collect();
        assert_eq!(ids, vec!["b3", "b2", "b1"]);
        assert_eq!(days[0].bookings[1].staff_name, "João Santos");
    }

    #[test]
    fn test_week_view_includes_empty_days() {
        let bookings = vec![
            booking("b1", "2025-06-18", "10:00", "1"),
            booking("b2", "2025-06-23", "10:00", "1"),
        ];

        let week = build_roster(&roster(), bookings, date("2025-06-16"), 7);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, date("2025-06-16"));
        assert_eq!(week[6].date, date("2025-06-22"));
        assert_eq!(week[2].bookings.len(), 1);
        assert_eq!(week.iter().map(|d| d.bookings.len()).sum::<usize>(), 1);
    }
}
