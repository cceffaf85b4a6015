use std::cmp::Ordering;
use std::iter::FusedIterator;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::models::{TimeSlot, SLOT_STEP_MINUTES};

/// First bookable start time of the day.
pub const OPENING_MINUTES: u32 = 10 * 60;
/// Last bookable start time of the day (inclusive).
pub const CLOSING_MINUTES: u32 = 20 * 60;
/// How far ahead of "now" a same-day booking must start.
pub const LEAD_MINUTES: u32 = 15;

/// Produces the bookable start times for a day.
///
/// Operating hours and granularity are fixed; the generator only decides
/// which part of the window is still ahead of the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotGenerator;

impl SlotGenerator {
    pub fn new() -> Self {
        SlotGenerator
    }

    /// Slots for "today", i.e. the calendar day of `now`.
    pub fn generate_slots(&self, now: NaiveDateTime) -> Slots {
        self.slots_for(now.date(), now)
    }

    /// Slots for `date` as seen at `now`.
    ///
    /// Today drops everything before the lead-time cutoff, a future day gets
    /// the full window and a past day gets nothing.
    pub fn slots_for(&self, date: NaiveDate, now: NaiveDateTime) -> Slots {
        let start = match date.cmp(&now.date()) {
            Ordering::Less => return Slots::empty(),
            Ordering::Equal => OPENING_MINUTES.max(earliest_start(now)),
            Ordering::Greater => OPENING_MINUTES,
        };
        Slots {
            next: start,
            last: CLOSING_MINUTES,
        }
    }

    /// Whether `slot` would be offered for `date` at `now`.
    pub fn is_bookable(&self, date: NaiveDate, slot: TimeSlot, now: NaiveDateTime) -> bool {
        let minutes = slot.minutes_since_midnight();
        let slots = self.slots_for(date, now);
        minutes >= slots.next && minutes <= slots.last
    }
}

/// `now.hour:00` plus `ceil((now.minute + lead) / step) * step` minutes.
fn earliest_start(now: NaiveDateTime) -> u32 {
    let minute = now.minute() + LEAD_MINUTES;
    let rounded = minute.div_ceil(SLOT_STEP_MINUTES) * SLOT_STEP_MINUTES;
    now.hour() * 60 + rounded
}

/// Ascending, finite run of slots. Clone it to walk the same run again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slots {
    next: u32,
    last: u32,
}

impl Slots {
    fn empty() -> Self {
        Slots {
            next: CLOSING_MINUTES + SLOT_STEP_MINUTES,
            last: CLOSING_MINUTES,
        }
    }
}

impl Iterator for Slots {
    type Item = TimeSlot;

    fn next(&mut self) -> Option<TimeSlot> {
        if self.next > self.last {
            return None;
        }
        let slot = TimeSlot::from_minutes(self.next)?;
        self.next += SLOT_STEP_MINUTES;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.next > self.last {
            0
        } else {
            ((self.last - self.next) / SLOT_STEP_MINUTES + 1) as usize
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Slots {}

impl FusedIterator for Slots {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{group_by_period, Period};
    use std::collections::HashSet;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn labels(slots: Slots) -> Vec<String> {
        slots.map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_future_day_gets_full_window() {
        let now = at("2025-06-16 15:07");
        let tomorrow = now.date().succ_opt().unwrap();
        let slots: Vec<_> = SlotGenerator::new().slots_for(tomorrow, now).collect();

        // 10:00..=20:00 every 15 minutes
        assert_eq!(slots.len(), 41);
        assert_eq!(slots.first().unwrap().to_string(), "10:00");
        assert_eq!(slots.last().unwrap().to_string(), "20:00");
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_past_day_is_empty() {
        let now = at("2025-06-16 08:00");
        let yesterday = now.date().pred_opt().unwrap();
        assert_eq!(SlotGenerator::new().slots_for(yesterday, now).count(), 0);
    }

    #[test]
    fn test_before_opening_starts_at_opening() {
        let slots = SlotGenerator::new().generate_slots(at("2025-06-16 07:30"));
        assert_eq!(slots.clone().next().unwrap().to_string(), "10:00");
        assert_eq!(slots.len(), 41);
    }

    #[test]
    fn test_lead_time_cutoff() {
        let gen = SlotGenerator::new();
        // 40 + 15 = 55, rounded up to 60
        assert_eq!(labels(gen.generate_slots(at("2025-06-16 09:40")))[0], "10:00");
        // 50 + 15 = 65, rounded up to 75 -> 10:15
        assert_eq!(labels(gen.generate_slots(at("2025-06-16 09:50")))[0], "10:15");
        // exactly on a boundary still needs the full lead
        assert_eq!(labels(gen.generate_slots(at("2025-06-16 14:00")))[0], "14:15");
        assert_eq!(labels(gen.generate_slots(at("2025-06-16 14:01")))[0], "14:30");
    }

    #[test]
    fn test_end_of_day() {
        let gen = SlotGenerator::new();
        assert_eq!(labels(gen.generate_slots(at("2025-06-16 19:45"))), vec!["20:00"]);
        assert!(labels(gen.generate_slots(at("2025-06-16 19:50"))).is_empty());
        assert!(labels(gen.generate_slots(at("2025-06-16 23:59"))).is_empty());
    }

    #[test]
    fn test_every_minute_of_the_day_respects_cutoff_and_window() {
        let gen = SlotGenerator::new();
        let day = at("2025-06-16 00:00");
        for offset in 0..(24 * 60) {
            let now = day + chrono::Duration::minutes(offset);
            let slots: Vec<_> = gen.generate_slots(now).collect();

            let cutoff = now.hour() * 60 + (now.minute() + 15).div_ceil(15) * 15;
            let unique: HashSet<_> = slots.iter().collect();
            assert_eq!(unique.len(), slots.len(), "duplicates at {now}");

            for slot in &slots {
                let m = slot.minutes_since_midnight();
                assert!(m >= cutoff, "{slot} before cutoff at {now}");
                assert!(m >= OPENING_MINUTES && m <= CLOSING_MINUTES);
                assert_eq!(m % SLOT_STEP_MINUTES, 0);
            }
            assert_eq!(slots.len(), gen.generate_slots(now).len());
        }
    }

    #[test]
    fn test_restartable() {
        let slots = SlotGenerator::new().generate_slots(at("2025-06-16 12:20"));
        let first: Vec<_> = slots.clone().collect();
        let second: Vec<_> = slots.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_grouping_reconstructs_the_list() {
        let gen = SlotGenerator::new();
        for now in ["2025-06-16 06:00", "2025-06-16 11:10", "2025-06-16 17:30", "2025-06-16 19:45"] {
            let slots: Vec<_> = gen.generate_slots(at(now)).collect();
            let groups = group_by_period(slots.clone());

            assert!(groups.morning.iter().all(|s| s.period() == Period::Morning));
            assert!(groups.afternoon.iter().all(|s| s.period() == Period::Afternoon));
            assert!(groups.evening.iter().all(|s| s.period() == Period::Evening));
            assert_eq!(groups.len(), slots.len());
            assert_eq!(groups.into_flat(), slots);
        }
    }

    #[test]
    fn test_is_bookable() {
        let gen = SlotGenerator::new();
        let now = at("2025-06-16 13:00");
        let today = now.date();
        let tomorrow = today.succ_opt().unwrap();

        assert!(!gen.is_bookable(today, "13:00".parse().unwrap(), now));
        assert!(gen.is_bookable(today, "13:15".parse().unwrap(), now));
        assert!(gen.is_bookable(tomorrow, "10:00".parse().unwrap(), now));
        assert!(!gen.is_bookable(tomorrow, "09:45".parse().unwrap(), now));
        assert!(!gen.is_bookable(tomorrow, "20:15".parse().unwrap(), now));
    }
}
