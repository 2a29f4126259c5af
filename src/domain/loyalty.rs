use serde::Serialize;
use utoipa::ToSchema;

/// Pesos of order total per earned point.
pub const PESOS_PER_POINT_EARNED: i64 = 1_000;
/// Pesos of discount per redeemed point.
pub const PESOS_PER_POINT_REDEEMED: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
}

impl LoyaltyTier {
    pub fn for_lifetime_points(lifetime: i64) -> Self {
        match lifetime {
            p if p >= 2_000 => LoyaltyTier::Gold,
            p if p >= 500 => LoyaltyTier::Silver,
            _ => LoyaltyTier::Bronze,
        }
    }

    /// Earn multiplier in percent.
    pub fn multiplier_pct(&self) -> i64 {
        match self {
            LoyaltyTier::Bronze => 100,
            LoyaltyTier::Silver => 125,
            LoyaltyTier::Gold => 150,
        }
    }

    pub fn threshold(&self) -> i64 {
        match self {
            LoyaltyTier::Bronze => 0,
            LoyaltyTier::Silver => 500,
            LoyaltyTier::Gold => 2_000,
        }
    }

    pub fn next(&self) -> Option<LoyaltyTier> {
        match self {
            LoyaltyTier::Bronze => Some(LoyaltyTier::Silver),
            LoyaltyTier::Silver => Some(LoyaltyTier::Gold),
            LoyaltyTier::Gold => None,
        }
    }
}

/// Points earned for an order total at the customer's current tier.
pub fn points_earned(order_total: i64, tier: LoyaltyTier) -> i64 {
    if order_total <= 0 {
        return 0;
    }
    (order_total / PESOS_PER_POINT_EARNED) * tier.multiplier_pct() / 100
}

pub fn redemption_value(points: i64) -> i64 {
    points.max(0).saturating_mul(PESOS_PER_POINT_REDEEMED)
}

/// Most points that can be spent against `payable` pesos.
pub fn max_redeemable(balance: i64, payable: i64) -> i64 {
    balance.max(0).min(payable.max(0) / PESOS_PER_POINT_REDEEMED)
}

pub fn points_to_next_tier(lifetime: i64) -> Option<i64> {
    LoyaltyTier::for_lifetime_points(lifetime)
        .next()
        .map(|next| next.threshold() - lifetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_lifetime_thresholds() {
        assert_eq!(LoyaltyTier::for_lifetime_points(0), LoyaltyTier::Bronze);
        assert_eq!(LoyaltyTier::for_lifetime_points(499), LoyaltyTier::Bronze);
        assert_eq!(LoyaltyTier::for_lifetime_points(500), LoyaltyTier::Silver);
        assert_eq!(LoyaltyTier::for_lifetime_points(2_000), LoyaltyTier::Gold);
    }

    #[test]
    fn earning_applies_tier_multiplier_with_floor() {
        assert_eq!(points_earned(250_999, LoyaltyTier::Bronze), 250);
        assert_eq!(points_earned(250_999, LoyaltyTier::Silver), 312);
        assert_eq!(points_earned(250_999, LoyaltyTier::Gold), 375);
        assert_eq!(points_earned(999, LoyaltyTier::Gold), 0);
    }

    #[test]
    fn redemption_is_bounded_by_balance_and_payable() {
        assert_eq!(max_redeemable(300, 1_000_000), 300);
        assert_eq!(max_redeemable(300, 1_505), 150);
        assert_eq!(max_redeemable(-5, 1_000), 0);
        assert_eq!(redemption_value(150), 1_500);
    }

    #[test]
    fn distance_to_next_tier() {
        assert_eq!(points_to_next_tier(120), Some(380));
        assert_eq!(points_to_next_tier(1_500), Some(500));
        assert_eq!(points_to_next_tier(4_000), None);
    }
}
