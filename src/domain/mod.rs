//! Storefront rules that do not touch the database.

pub mod coupon;
pub mod invoice;
pub mod loyalty;
pub mod order_status;
pub mod payment_card;
pub mod pricing;
pub mod role;
