use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::order_status::OrderStatus,
    models::{Order, OrderItem, ShippingAddress},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Saved address to ship to. Ignored when `shipping_address` is given.
    pub address_id: Option<Uuid>,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: String,
    pub redeem_points: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    pub invoice_number: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingStep {
    pub status: OrderStatus,
    pub label: String,
    pub reached: bool,
    pub current: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderTracking {
    pub order_id: Uuid,
    pub invoice_number: String,
    pub status: OrderStatus,
    pub cancelled: bool,
    pub progress_percent: u8,
    pub steps: Vec<TrackingStep>,
    pub tracking_number: Option<String>,
}
