use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Granularity of the appointment grid, in minutes.
pub const SLOT_STEP_MINUTES: u32 = 15;

/// A bookable start time, quantized to [`SLOT_STEP_MINUTES`].
///
/// Serialized as `"HH:MM"`, the same text stored in the `bookings.slot` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(NaiveTime);

impl TimeSlot {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if minute % SLOT_STEP_MINUTES != 0 {
            return None;
        }
        NaiveTime::from_hms_opt(hour, minute, 0).map(TimeSlot)
    }

    pub(crate) fn from_minutes(minutes: u32) -> Option<Self> {
        Self::from_hm(minutes / 60, minutes % 60)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }

    pub fn period(&self) -> Period {
        Period::of(*self)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time slot: {0}")]
pub struct InvalidSlot(String);

impl FromStr for TimeSlot {
    type Err = InvalidSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map_err(|_| InvalidSlot(s.to_string()))?;
        TimeSlot::from_hm(time.hour(), time.minute()).ok_or_else(|| InvalidSlot(s.to_string()))
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = InvalidSlot;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

/// Presentation bucket for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Afternoon,
    Evening,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Morning, Period::Afternoon, Period::Evening];

    pub fn of(slot: TimeSlot) -> Self {
        match slot.hour() {
            h if h < 12 => Period::Morning,
            h if h < 18 => Period::Afternoon,
            _ => Period::Evening,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Morning => "Morning",
            Period::Afternoon => "Afternoon",
            Period::Evening => "Evening",
        }
    }
}

/// Slots split into [`Period`] buckets, each keeping the input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotGroups {
    pub morning: Vec<TimeSlot>,
    pub afternoon: Vec<TimeSlot>,
    pub evening: Vec<TimeSlot>,
}

impl SlotGroups {
    pub fn get(&self, period: Period) -> &[TimeSlot] {
        match period {
            Period::Morning => &self.morning,
            Period::Afternoon => &self.afternoon,
            Period::Evening => &self.evening,
        }
    }

    /// Non-empty buckets in day order.
    pub fn labelled(&self) -> Vec<(Period, &[TimeSlot])> {
        Period::ALL
            .iter()
            .map(|p| (*p, self.get(*p)))
            .filter(|(_, slots)| !slots.is_empty())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.morning.len() + self.afternoon.len() + self.evening.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_flat(self) -> Vec<TimeSlot> {
        let mut all = self.morning;
        all.extend(self.afternoon);
        all.extend(self.evening);
        all
    }
}

pub fn group_by_period<I>(slots: I) -> SlotGroups
where
    I: IntoIterator<Item = TimeSlot>,
{
    let mut groups = SlotGroups::default();
    for slot in slots {
        match slot.period() {
            Period::Morning => groups.morning.push(slot),
            Period::Afternoon => groups.afternoon.push(slot),
            Period::Evening => groups.evening.push(slot),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(slot("14:00").to_string(), "14:00");
        assert_eq!(slot("09:45").to_string(), "09:45");
        assert_eq!(slot(" 10:15 ").to_string(), "10:15");
    }

    #[test]
    fn test_parse_rejects_off_grid() {
        assert!("14:10".parse::<TimeSlot>().is_err());
        assert!("25:00".parse::<TimeSlot>().is_err());
        assert!("noon".parse::<TimeSlot>().is_err());
        assert!("".parse::<TimeSlot>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&slot("10:30")).unwrap();
        assert_eq!(json, "\"10:30\"");
        let back: TimeSlot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, slot("10:30"));
        assert!(serde_json::from_str::<TimeSlot>("\"10:31\"").is_err());
    }

    #[test]
    fn test_period_boundaries() {
        assert_eq!(Period::of(slot("10:00")), Period::Morning);
        assert_eq!(Period::of(slot("11:45")), Period::Morning);
        assert_eq!(Period::of(slot("12:00")), Period::Afternoon);
        assert_eq!(Period::of(slot("17:45")), Period::Afternoon);
        assert_eq!(Period::of(slot("18:00")), Period::Evening);
        assert_eq!(Period::of(slot("20:00")), Period::Evening);
    }

    #[test]
    fn test_group_keeps_order_and_skips_empty() {
        let groups = group_by_period(vec![slot("10:00"), slot("10:15"), slot("19:00")]);
        assert_eq!(groups.morning, vec![slot("10:00"), slot("10:15")]);
        assert!(groups.afternoon.is_empty());
        assert_eq!(groups.evening, vec![slot("19:00")]);

        let labelled = groups.labelled();
        assert_eq!(labelled.len(), 2);
        assert_eq!(labelled[0].0, Period::Morning);
        assert_eq!(labelled[1].0, Period::Evening);
    }
}
