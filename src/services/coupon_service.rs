use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::coupon::{CouponError, CouponRule, normalize_code, validate_definition},
    dto::coupons::{
        CouponList, CouponQuote, CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest,
    },
    entity::coupons::{ActiveModel, Column, Entity as Coupons},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Coupon,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Quote a coupon against a cart total without applying it.
pub async fn validate_coupon(
    state: &AppState,
    payload: ValidateCouponRequest,
) -> AppResult<ApiResponse<CouponQuote>> {
    if payload.cart_total < 0 {
        return Err(AppError::BadRequest("cart_total cannot be negative".into()));
    }
    let model = Coupons::find()
        .filter(Column::Code.eq(normalize_code(&payload.code)))
        .one(&state.orm)
        .await?
        .ok_or(CouponError::NotFound)?;

    let discount = CouponRule::from(&model).evaluate(payload.cart_total, Utc::now())?;
    let quote = CouponQuote {
        code: model.code,
        kind: model.kind,
        value: model.value,
        discount,
        total_after_discount: payload.cart_total - discount,
    };
    Ok(ApiResponse::success("Coupon is valid", quote, None))
}

pub async fn list_coupons(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CouponList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();
    let finder = Coupons::find().order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Coupon::from)
        .collect();

    Ok(ApiResponse::success(
        "Coupons",
        CouponList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let code = normalize_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("code is required".into()));
    }
    validate_definition(payload.kind, payload.value)?;
    if payload.min_purchase < 0 || payload.max_discount_amount.is_some_and(|m| m < 0) {
        return Err(AppError::BadRequest("amounts cannot be negative".into()));
    }

    let exists = Coupons::find()
        .filter(Column::Code.eq(code.clone()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(format!("coupon {code} already exists")));
    }

    let coupon = ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        kind: Set(payload.kind),
        value: Set(payload.value),
        min_purchase: Set(payload.min_purchase),
        max_discount_amount: Set(payload.max_discount_amount),
        active: Set(true),
        expires_at: Set(payload.expires_at.map(Into::into)),
        usage_limit: Set(payload.usage_limit),
        times_used: Set(0),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        Some(user.user_id),
        "coupon_create",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id, "code": coupon.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Coupon created",
        Coupon::from(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn update_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let existing = Coupons::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(value) = payload.value {
        validate_definition(existing.kind, value)?;
    }
    if payload.min_purchase.is_some_and(|m| m < 0)
        || payload.max_discount_amount.is_some_and(|m| m < 0)
    {
        return Err(AppError::BadRequest("amounts cannot be negative".into()));
    }

    let mut active: ActiveModel = existing.into();
    if let Some(value) = payload.value {
        active.value = Set(value);
    }
    if let Some(min_purchase) = payload.min_purchase {
        active.min_purchase = Set(min_purchase);
    }
    if let Some(cap) = payload.max_discount_amount {
        active.max_discount_amount = Set(Some(cap));
    }
    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }
    if let Some(expires_at) = payload.expires_at {
        active.expires_at = Set(Some(expires_at.into()));
    }
    if let Some(limit) = payload.usage_limit {
        active.usage_limit = Set(Some(limit));
    }
    let coupon = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(user.user_id),
        "coupon_update",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Coupon::from(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn delete_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Coupons::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        state,
        Some(user.user_id),
        "coupon_delete",
        "coupons",
        serde_json::json!({ "coupon_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
