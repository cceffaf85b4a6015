pub mod booking;
pub mod plan;
pub mod slot;
pub mod staff;
pub mod user;

pub use booking::{Booking, BookingRequest, BookingStatus, ServiceType};
pub use plan::{SubscriptionPlan, PLANS};
pub use slot::{group_by_period, Period, SlotGroups, TimeSlot, SLOT_STEP_MINUTES};
pub use staff::{Roster, Staff};
pub use user::{Role, User};
