//! Order fulfilment lifecycle.
//!
//! Fulfilment runs along a fixed track, `pending → processing → shipped →
//! delivered`, with `cancelled` as a terminal branch off that track. Staff may
//! set any of the five values directly. The helpers here only describe where
//! an order sits and what a customer may still do with it.

use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// The linear fulfilment track. `Cancelled` is not on it.
    pub const TRACK: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];

    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn step_index(&self) -> Option<usize> {
        Self::TRACK.iter().position(|s| s == self)
    }

    /// Fraction of the track completed, `index / (len - 1)`.
    pub fn progress(&self) -> Option<f64> {
        self.step_index()
            .map(|idx| idx as f64 / (Self::TRACK.len() - 1) as f64)
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress()
            .map(|p| (p * 100.0).round() as u8)
            .unwrap_or(0)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn is_customer_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// `(status, reached, current)` for every step on the track.
    pub fn tracking_steps(&self) -> Vec<(OrderStatus, bool, bool)> {
        let current = self.step_index();
        Self::TRACK
            .iter()
            .enumerate()
            .map(|(idx, step)| {
                let reached = current.is_some_and(|c| idx <= c);
                (*step, reached, current == Some(idx))
            })
            .collect()
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_follows_track_position() {
        assert_eq!(OrderStatus::Pending.progress(), Some(0.0));
        assert_eq!(OrderStatus::Shipped.progress_percent(), 67);
        assert_eq!(OrderStatus::Delivered.progress(), Some(1.0));
    }

    #[test]
    fn cancelled_is_off_track() {
        assert_eq!(OrderStatus::Cancelled.step_index(), None);
        assert_eq!(OrderStatus::Cancelled.progress(), None);
        assert_eq!(OrderStatus::Cancelled.progress_percent(), 0);
        assert!(
            OrderStatus::Cancelled
                .tracking_steps()
                .iter()
                .all(|(_, reached, current)| !reached && !current)
        );
    }

    #[test]
    fn tracking_steps_mark_reached_and_current() {
        let steps = OrderStatus::Processing.tracking_steps();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], (OrderStatus::Pending, true, false));
        assert_eq!(steps[1], (OrderStatus::Processing, true, true));
        assert_eq!(steps[2], (OrderStatus::Shipped, false, false));
    }

    #[test]
    fn only_early_orders_are_customer_cancellable() {
        assert!(OrderStatus::Pending.is_customer_cancellable());
        assert!(OrderStatus::Processing.is_customer_cancellable());
        assert!(!OrderStatus::Shipped.is_customer_cancellable());
        assert!(!OrderStatus::Cancelled.is_customer_cancellable());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert!("paid".parse::<OrderStatus>().is_err());
    }
}
