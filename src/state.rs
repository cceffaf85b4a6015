use std::sync::Arc;

use crate::services::availability::AvailabilityResolver;
use crate::services::booking::BookingCommitter;
use crate::services::directory::UserDirectory;
use crate::services::ledger::BookingLedger;

/// Collaborators are built once in `main` (or a test) and handed in here.
pub struct AppState {
    pub directory: Arc<dyn UserDirectory>,
    pub ledger: Arc<dyn BookingLedger>,
    pub resolver: AvailabilityResolver,
    pub committer: BookingCommitter,
}
