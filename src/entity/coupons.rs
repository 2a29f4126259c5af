use sea_orm::entity::prelude::*;

use crate::domain::coupon::CouponKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    pub min_purchase: i64,
    pub max_discount_amount: Option<i64>,
    pub active: bool,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
