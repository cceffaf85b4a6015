use serde::Serialize;

use crate::models::ServiceType;

/// A monthly subscription offered at the counter. Browse-only.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionPlan {
    pub id: &'static str,
    pub name: &'static str,
    pub monthly_price_cents: i64,
    pub services: &'static [ServiceType],
    /// Restricted to Monday through Wednesday.
    pub weekdays_only: bool,
}

const CUT: &[ServiceType] = &[ServiceType::SimpleCut];
const CUT_AND_BEARD: &[ServiceType] = &[
    ServiceType::SimpleCut,
    ServiceType::CutAndBeard,
    ServiceType::Beard,
];
const BEARD: &[ServiceType] = &[ServiceType::Beard];

pub const PLANS: &[SubscriptionPlan] = &[
    SubscriptionPlan {
        id: "cut-unlimited",
        name: "Unlimited Cut Club",
        monthly_price_cents: 8490,
        services: CUT,
        weekdays_only: false,
    },
    SubscriptionPlan {
        id: "cut-mon-wed",
        name: "Cut Club - Mon to Wed",
        monthly_price_cents: 7690,
        services: CUT,
        weekdays_only: true,
    },
    SubscriptionPlan {
        id: "cut-beard-unlimited",
        name: "Unlimited Cut & Beard Club",
        monthly_price_cents: 14990,
        services: CUT_AND_BEARD,
        weekdays_only: false,
    },
    SubscriptionPlan {
        id: "cut-beard-mon-wed",
        name: "Cut & Beard Club - Mon to Wed",
        monthly_price_cents: 13490,
        services: CUT_AND_BEARD,
        weekdays_only: true,
    },
    SubscriptionPlan {
        id: "beard-unlimited",
        name: "Unlimited Beard Club",
        monthly_price_cents: 9490,
        services: BEARD,
        weekdays_only: false,
    },
    SubscriptionPlan {
        id: "beard-mon-wed",
        name: "Beard Club - Mon to Wed",
        monthly_price_cents: 8590,
        services: BEARD,
        weekdays_only: true,
    },
];
