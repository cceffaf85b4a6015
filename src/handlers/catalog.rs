use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::models::{Roster, ServiceType, SubscriptionPlan, PLANS};
use crate::services::booking::PRICE_TABLE;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ServiceResponse {
    service: ServiceType,
    label: &'static str,
    price_cents: i64,
}

// GET /api/services
pub async fn list_services() -> Json<Vec<ServiceResponse>> {
    Json(
        PRICE_TABLE
            .iter()
            .map(|(service, price_cents)| ServiceResponse {
                service: *service,
                label: service.label(),
                price_cents: *price_cents,
            })
            .collect(),
    )
}

// GET /api/plans
pub async fn list_plans() -> Json<&'static [SubscriptionPlan]> {
    Json(PLANS)
}

// GET /api/staff
pub async fn list_staff(State(state): State<Arc<AppState>>) -> Json<Roster> {
    Json(state.resolver.roster().clone())
}
