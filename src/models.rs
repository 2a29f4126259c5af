//! Records returned by the API, converted from entity rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        coupon::{CouponKind, CouponRule},
        order_status::{OrderStatus, PaymentStatus},
        pricing::CartSummary,
        role::{ApplicationStatus, Role},
    },
    entity::{
        addresses, audit_logs, coupons, loyalty_transactions, order_items, orders,
        payment_methods, product_variants, users, vendor_applications,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub loyalty_points: i64,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            loyalty_points: model.loyalty_points,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Shipping address, also snapshotted as JSON onto each order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub department: String,
    pub postal_code: Option<String>,
    pub country: String,
    pub phone: Option<String>,
}

impl ShippingAddress {
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![self.recipient.clone(), self.line1.clone()];
        if let Some(line2) = self.line2.as_ref().filter(|s| !s.is_empty()) {
            out.push(line2.clone());
        }
        let mut city = format!("{}, {}", self.city, self.department);
        if let Some(code) = self.postal_code.as_ref().filter(|s| !s.is_empty()) {
            city.push_str(&format!(" {code}"));
        }
        out.push(city);
        out.push(self.country.clone());
        if let Some(phone) = self.phone.as_ref().filter(|s| !s.is_empty()) {
            out.push(phone.clone());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Address {
    pub id: Uuid,
    pub label: String,
    #[serde(flatten)]
    pub address: ShippingAddress,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<addresses::Model> for Address {
    fn from(model: addresses::Model) -> Self {
        Self {
            id: model.id,
            label: model.label,
            address: ShippingAddress {
                recipient: model.recipient,
                line1: model.line1,
                line2: model.line2,
                city: model.city,
                department: model.department,
                postal_code: model.postal_code,
                country: model.country,
                phone: model.phone,
            },
            is_default: model.is_default,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub brand: String,
    pub last4: String,
    pub holder_name: String,
    pub exp_month: i32,
    pub exp_year: i32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<payment_methods::Model> for PaymentMethod {
    fn from(model: payment_methods::Model) -> Self {
        Self {
            id: model.id,
            brand: model.brand,
            last4: model.last4,
            holder_name: model.holder_name,
            exp_month: model.exp_month,
            exp_year: model.exp_year,
            is_default: model.is_default,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductVariant {
    pub id: Uuid,
    pub name: String,
    pub price_modifier: i64,
    pub stock: i32,
}

impl From<product_variants::Model> for ProductVariant {
    fn from(model: product_variants::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price_modifier: model.price_modifier,
            stock: model.stock,
        }
    }
}

/// A product rendered in one language.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub color: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub rating: f64,
    pub image_url: Option<String>,
    pub variants: Vec<ProductVariant>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    pub min_purchase: i64,
    pub max_discount_amount: Option<i64>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub created_at: DateTime<Utc>,
}

impl From<coupons::Model> for Coupon {
    fn from(model: coupons::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            kind: model.kind,
            value: model.value,
            min_purchase: model.min_purchase,
            max_discount_amount: model.max_discount_amount,
            active: model.active,
            expires_at: model.expires_at.map(|dt| dt.with_timezone(&Utc)),
            usage_limit: model.usage_limit,
            times_used: model.times_used,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<&coupons::Model> for CouponRule {
    fn from(model: &coupons::Model) -> Self {
        Self {
            code: model.code.clone(),
            kind: model.kind,
            value: model.value,
            min_purchase: model.min_purchase,
            max_discount_amount: model.max_discount_amount,
            active: model.active,
            expires_at: model.expires_at.map(|dt| dt.with_timezone(&Utc)),
            usage_limit: model.usage_limit,
            times_used: model.times_used,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subtotal: i64,
    pub discount: i64,
    pub points_discount: i64,
    pub tax: i64,
    pub shipping: i64,
    pub total: i64,
    pub coupon_code: Option<String>,
    pub points_redeemed: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    #[schema(value_type = Object)]
    pub shipping_address: serde_json::Value,
    pub invoice_number: String,
    pub tracking_number: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn summary(&self, item_count: i64) -> CartSummary {
        CartSummary {
            item_count,
            subtotal: self.subtotal,
            discount: self.discount,
            points_discount: self.points_discount,
            tax: self.tax,
            shipping: self.shipping,
            total: self.total,
        }
    }
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            subtotal: model.subtotal,
            discount: model.discount,
            points_discount: model.points_discount,
            tax: model.tax,
            shipping: model.shipping,
            total: model.total,
            coupon_code: model.coupon_code,
            points_redeemed: model.points_redeemed,
            status: model.status,
            payment_status: model.payment_status,
            payment_method: model.payment_method,
            shipping_address: model.shipping_address,
            invoice_number: model.invoice_number,
            tracking_number: model.tracking_number,
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
    pub created_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            variant_id: model.variant_id,
            product_name: model.product_name,
            variant_name: model.variant_name,
            quantity: model.quantity,
            unit_price: model.unit_price,
            line_total: model.line_total,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoyaltyTransaction {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub points: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl From<loyalty_transactions::Model> for LoyaltyTransaction {
    fn from(model: loyalty_transactions::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            points: model.points,
            reason: model.reason,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VendorApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shop_name: String,
    pub description: Option<String>,
    pub status: ApplicationStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<vendor_applications::Model> for VendorApplication {
    fn from(model: vendor_applications::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            shop_name: model.shop_name,
            description: model.description,
            status: model.status,
            reviewed_by: model.reviewed_by,
            reviewed_at: model.reviewed_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<audit_logs::Model> for AuditLog {
    fn from(model: audit_logs::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            resource: model.resource,
            metadata: model.metadata,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipping_address_lines_skip_empty_parts() {
        let address = ShippingAddress {
            recipient: "Ana Pérez".into(),
            line1: "Calle 10 # 5-20".into(),
            line2: Some(String::new()),
            city: "Cartagena".into(),
            department: "Bolívar".into(),
            postal_code: Some("130001".into()),
            country: "CO".into(),
            phone: None,
        };
        assert_eq!(
            address.lines(),
            vec![
                "Ana Pérez".to_string(),
                "Calle 10 # 5-20".to_string(),
                "Cartagena, Bolívar 130001".to_string(),
                "CO".to_string(),
            ]
        );
    }
}
