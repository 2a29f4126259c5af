use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::pricing::percentage_of;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("coupon not found")]
    NotFound,
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("minimum purchase of {min} not met")]
    MinimumNotMet { min: i64 },
    #[error("invalid coupon definition: {0}")]
    InvalidDefinition(&'static str),
}

/// The parts of a coupon row that decide whether and how much it discounts.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponRule {
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    pub min_purchase: i64,
    pub max_discount_amount: Option<i64>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
}

impl CouponRule {
    /// Discount this coupon grants on `cart_total`, ignoring eligibility.
    pub fn discount_for(&self, cart_total: i64) -> i64 {
        if cart_total <= 0 {
            return 0;
        }
        let raw = match self.kind {
            CouponKind::Percentage => {
                let pct = percentage_of(cart_total, self.value);
                match self.max_discount_amount {
                    Some(cap) if cap >= 0 => pct.min(cap),
                    _ => pct,
                }
            }
            CouponKind::Fixed => self.value,
        };
        raw.clamp(0, cart_total)
    }

    pub fn evaluate(&self, cart_total: i64, now: DateTime<Utc>) -> Result<i64, CouponError> {
        if !self.active {
            return Err(CouponError::Inactive);
        }
        if self.expires_at.is_some_and(|at| at <= now) {
            return Err(CouponError::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.times_used >= limit) {
            return Err(CouponError::UsageLimitReached);
        }
        if cart_total < self.min_purchase {
            return Err(CouponError::MinimumNotMet {
                min: self.min_purchase,
            });
        }
        Ok(self.discount_for(cart_total))
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub fn validate_definition(kind: CouponKind, value: i64) -> Result<(), CouponError> {
    match kind {
        CouponKind::Percentage if !(1..=100).contains(&value) => Err(
            CouponError::InvalidDefinition("percentage must be between 1 and 100"),
        ),
        CouponKind::Fixed if value <= 0 => Err(CouponError::InvalidDefinition(
            "fixed amount must be greater than 0",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rule(kind: CouponKind, value: i64) -> CouponRule {
        CouponRule {
            code: "ARTESANO".into(),
            kind,
            value,
            min_purchase: 0,
            max_discount_amount: None,
            active: true,
            expires_at: None,
            usage_limit: None,
            times_used: 0,
        }
    }

    #[test]
    fn percentage_discount_is_capped() {
        let mut c = rule(CouponKind::Percentage, 20);
        c.max_discount_amount = Some(30_000);
        assert_eq!(c.discount_for(100_000), 20_000);
        assert_eq!(c.discount_for(500_000), 30_000);
    }

    #[test]
    fn fixed_discount_never_exceeds_total() {
        let c = rule(CouponKind::Fixed, 25_000);
        assert_eq!(c.discount_for(10_000), 10_000);
        assert_eq!(c.discount_for(40_000), 25_000);
    }

    #[test]
    fn full_percentage_leaves_zero_not_negative() {
        let c = rule(CouponKind::Percentage, 100);
        assert_eq!(c.discount_for(73_000), 73_000);
    }

    #[test]
    fn minimum_purchase_is_inclusive() {
        let mut c = rule(CouponKind::Percentage, 10);
        c.min_purchase = 50_000;
        let now = Utc::now();
        assert_eq!(
            c.evaluate(49_999, now),
            Err(CouponError::MinimumNotMet { min: 50_000 })
        );
        assert_eq!(c.evaluate(50_000, now), Ok(5_000));
    }

    #[test]
    fn inactive_expired_and_exhausted_are_rejected() {
        let now = Utc::now();

        let mut c = rule(CouponKind::Fixed, 1_000);
        c.active = false;
        assert_eq!(c.evaluate(10_000, now), Err(CouponError::Inactive));

        let mut c = rule(CouponKind::Fixed, 1_000);
        c.expires_at = Some(now - Duration::minutes(1));
        assert_eq!(c.evaluate(10_000, now), Err(CouponError::Expired));

        let mut c = rule(CouponKind::Fixed, 1_000);
        c.usage_limit = Some(3);
        c.times_used = 3;
        assert_eq!(c.evaluate(10_000, now), Err(CouponError::UsageLimitReached));
    }

    #[test]
    fn codes_are_trimmed_and_uppercased() {
        assert_eq!(normalize_code("  bienvenido10 "), "BIENVENIDO10");
    }

    #[test]
    fn definitions_are_range_checked() {
        assert!(validate_definition(CouponKind::Percentage, 0).is_err());
        assert!(validate_definition(CouponKind::Percentage, 101).is_err());
        assert!(validate_definition(CouponKind::Percentage, 100).is_ok());
        assert!(validate_definition(CouponKind::Fixed, 0).is_err());
        assert!(validate_definition(CouponKind::Fixed, 5_000).is_ok());
    }
}
