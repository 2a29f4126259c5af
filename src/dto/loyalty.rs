use serde::Serialize;
use utoipa::ToSchema;

use crate::{domain::loyalty::LoyaltyTier, models::LoyaltyTransaction};

#[derive(Debug, Serialize, ToSchema)]
pub struct LoyaltyAccount {
    pub balance: i64,
    pub lifetime_points: i64,
    pub tier: LoyaltyTier,
    pub next_tier: Option<LoyaltyTier>,
    pub points_to_next_tier: Option<i64>,
    /// Pesos the current balance is worth at checkout.
    pub balance_value: i64,
    pub recent: Vec<LoyaltyTransaction>,
}
