use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::TimeSlot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub service: ServiceType,
    pub price_cents: i64,
    pub staff_id: String,
    pub status: BookingStatus,
    /// Contact details frozen at creation; later profile edits do not touch them.
    pub client_name: String,
    pub client_phone: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Scheduled => "scheduled",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(BookingStatus::Scheduled),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Scheduled)
    }

    /// Only a scheduled booking may move, and only to a terminal state.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        !self.is_terminal() && next.is_terminal()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    SimpleCut,
    CutAndBeard,
    PremiumCut,
    Beard,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::SimpleCut,
        ServiceType::CutAndBeard,
        ServiceType::PremiumCut,
        ServiceType::Beard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::SimpleCut => "simple_cut",
            ServiceType::CutAndBeard => "cut_and_beard",
            ServiceType::PremiumCut => "premium_cut",
            ServiceType::Beard => "beard",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::SimpleCut => "Simple cut",
            ServiceType::CutAndBeard => "Cut + beard",
            ServiceType::PremiumCut => "Premium cut",
            ServiceType::Beard => "Beard only",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service: {0}")]
pub struct UnknownService(String);

impl FromStr for ServiceType {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|svc| svc.as_str() == s.trim())
            .ok_or_else(|| UnknownService(s.to_string()))
    }
}

/// What a client submits to book. Every field is required; they are optional
/// here so a missing one surfaces as a validation failure instead of a
/// deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub date: Option<String>,
    pub slot: Option<String>,
    pub staff_id: Option<String>,
    pub service: Option<String>,
}
