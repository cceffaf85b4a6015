pub mod availability;
pub mod booking;
pub mod directory;
pub mod ledger;
pub mod roster;
pub mod slots;
