//! Cart and order arithmetic.
//!
//! All amounts are whole Colombian pesos held in `i64`. Percentages are
//! rounded half up, which keeps a summary reproducible from its lines.

use serde::Serialize;
use utoipa::ToSchema;

/// Tax and shipping settings applied on top of the line subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingConfig {
    /// Tax rate in basis points (1900 = 19 %).
    pub tax_rate_bps: u32,
    pub shipping_flat: i64,
    /// Orders whose discounted subtotal reaches this ship for free.
    pub free_shipping_threshold: i64,
}

impl PricingConfig {
    /// No tax, no shipping: the summary reduces to subtotal minus discount.
    pub fn untaxed() -> Self {
        Self {
            tax_rate_bps: 0,
            shipping_flat: 0,
            free_shipping_threshold: 0,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate_bps: 1900,
            shipping_flat: 15_000,
            free_shipping_threshold: 200_000,
        }
    }
}

/// One priced line: base product price, the variant modifier and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub base_price: i64,
    pub price_modifier: i64,
    pub quantity: i32,
}

impl LineInput {
    pub fn new(base_price: i64, price_modifier: i64, quantity: i32) -> Self {
        Self {
            base_price,
            price_modifier,
            quantity,
        }
    }

    pub fn unit_price(&self) -> i64 {
        unit_price(self.base_price, self.price_modifier)
    }

    pub fn total(&self) -> i64 {
        line_total(self.unit_price(), self.quantity)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartSummary {
    pub item_count: i64,
    pub subtotal: i64,
    pub discount: i64,
    pub points_discount: i64,
    pub tax: i64,
    pub shipping: i64,
    pub total: i64,
}

/// Price of a single unit once the variant modifier is applied.
pub fn unit_price(base: i64, modifier: i64) -> i64 {
    base.saturating_add(modifier).max(0)
}

pub fn line_total(unit: i64, quantity: i32) -> i64 {
    unit.saturating_mul(i64::from(quantity.max(0)))
}

/// `amount * pct / 100`, rounded half up.
pub fn percentage_of(amount: i64, pct: i64) -> i64 {
    if amount <= 0 || pct <= 0 {
        return 0;
    }
    amount.saturating_mul(pct).saturating_add(50) / 100
}

fn basis_points_of(amount: i64, bps: u32) -> i64 {
    if amount <= 0 || bps == 0 {
        return 0;
    }
    amount.saturating_mul(i64::from(bps)).saturating_add(5_000) / 10_000
}

pub fn subtotal(lines: &[LineInput]) -> i64 {
    lines
        .iter()
        .map(LineInput::total)
        .fold(0, i64::saturating_add)
}

/// Derive the full summary for a set of lines.
///
/// The coupon discount is clamped to the subtotal and the loyalty discount
/// to what remains after it, so `total` never goes negative.
pub fn summarize(
    lines: &[LineInput],
    coupon_discount: i64,
    points_discount: i64,
    config: &PricingConfig,
) -> CartSummary {
    let item_count = lines.iter().map(|l| i64::from(l.quantity.max(0))).sum();
    let subtotal = subtotal(lines);
    let discount = coupon_discount.clamp(0, subtotal);
    let points_discount = points_discount.clamp(0, subtotal - discount);
    let taxable = subtotal - discount - points_discount;
    let tax = basis_points_of(taxable, config.tax_rate_bps);
    let shipping = if item_count == 0 || taxable >= config.free_shipping_threshold {
        0
    } else {
        config.shipping_flat
    };

    CartSummary {
        item_count,
        subtotal,
        discount,
        points_discount,
        tax,
        shipping,
        total: taxable.saturating_add(tax).saturating_add(shipping),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtotal_is_sum_of_line_totals() {
        let lines = [LineInput::new(120_000, 0, 2), LineInput::new(45_000, 5_000, 3)];
        assert_eq!(subtotal(&lines), 240_000 + 150_000);
    }

    #[test]
    fn untaxed_summary_matches_percentage_formula() {
        let lines = [LineInput::new(80_000, 0, 1), LineInput::new(20_000, 0, 1)];
        let discount = percentage_of(subtotal(&lines), 15);
        let summary = summarize(&lines, discount, 0, &PricingConfig::untaxed());
        assert_eq!(summary.subtotal, 100_000);
        assert_eq!(summary.discount, 15_000);
        assert_eq!(summary.total, 85_000);
        assert_eq!(summary.shipping, 0);
    }

    #[test]
    fn full_discount_never_goes_negative() {
        let lines = [LineInput::new(10_000, 0, 1)];
        let summary = summarize(&lines, 50_000, 9_999, &PricingConfig::untaxed());
        assert_eq!(summary.discount, 10_000);
        assert_eq!(summary.points_discount, 0);
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn tax_and_flat_shipping_below_threshold() {
        let lines = [LineInput::new(50_000, 0, 1)];
        let summary = summarize(&lines, 0, 0, &PricingConfig::default());
        assert_eq!(summary.tax, 9_500);
        assert_eq!(summary.shipping, 15_000);
        assert_eq!(summary.total, 74_500);
    }

    #[test]
    fn shipping_is_free_at_threshold() {
        let lines = [LineInput::new(100_000, 0, 2)];
        let summary = summarize(&lines, 0, 0, &PricingConfig::default());
        assert_eq!(summary.shipping, 0);
    }

    #[test]
    fn empty_cart_has_no_shipping() {
        let summary = summarize(&[], 0, 0, &PricingConfig::default());
        assert_eq!(summary, CartSummary::default());
    }

    #[test]
    fn negative_modifier_floors_unit_price_at_zero() {
        assert_eq!(unit_price(1_000, -5_000), 0);
        assert_eq!(line_total(1_000, -3), 0);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage_of(999, 5), 50);
        assert_eq!(percentage_of(990, 5), 50);
        assert_eq!(percentage_of(989, 5), 49);
    }

    #[test]
    fn extreme_amounts_saturate_instead_of_overflowing() {
        assert_eq!(percentage_of(i64::MAX, 100), i64::MAX / 100);
        let lines = [
            LineInput::new(i64::MAX, 0, i32::MAX),
            LineInput::new(i64::MAX / 2, 0, 3),
        ];
        assert_eq!(subtotal(&lines), i64::MAX);
        let summary = summarize(&lines, 0, 0, &PricingConfig::default());
        assert_eq!(summary.subtotal, i64::MAX);
        assert_eq!(summary.tax, i64::MAX / 10_000);
        assert_eq!(summary.total, i64::MAX);
    }
}
