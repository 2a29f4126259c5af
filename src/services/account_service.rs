use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::payment_card::check_card,
    dto::account::{CreateAddressRequest, CreatePaymentMethodRequest, UpdateProfileRequest},
    entity::{
        addresses::{self, Entity as Addresses},
        payment_methods::{self, Entity as PaymentMethods},
        users::{self, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, PaymentMethod, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Profile", User::from(model), None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let mut active: users::ActiveModel = model.into();
    active.full_name = Set(payload.full_name.filter(|n| !n.trim().is_empty()));
    let model = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(user.user_id),
        "profile_update",
        "users",
        serde_json::json!({ "user_id": model.id }),
    )
    .await;

    Ok(ApiResponse::success("Profile updated", User::from(model), None))
}

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<Address>>> {
    let items = Addresses::find()
        .filter(addresses::Column::UserId.eq(user.user_id))
        .order_by_desc(addresses::Column::IsDefault)
        .order_by_asc(addresses::Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Address::from)
        .collect();
    Ok(ApiResponse::success("Addresses", items, Some(Meta::empty())))
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    require("recipient", &payload.recipient)?;
    require("line1", &payload.line1)?;
    require("city", &payload.city)?;
    require("department", &payload.department)?;

    let txn = state.orm.begin().await?;
    let existing = Addresses::find()
        .filter(addresses::Column::UserId.eq(user.user_id))
        .count(&txn)
        .await?;
    let is_default = payload.is_default || existing == 0;
    if is_default {
        clear_default_address(&txn, user.user_id).await?;
    }

    let model = addresses::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        label: Set(payload.label),
        recipient: Set(payload.recipient),
        line1: Set(payload.line1),
        line2: Set(payload.line2),
        city: Set(payload.city),
        department: Set(payload.department),
        postal_code: Set(payload.postal_code),
        country: Set(payload.country.unwrap_or_else(|| "CO".to_string())),
        phone: Set(payload.phone),
        is_default: Set(is_default),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "address_add",
        "addresses",
        serde_json::json!({ "address_id": model.id, "is_default": model.is_default }),
    )
    .await;

    Ok(ApiResponse::success(
        "Address saved",
        Address::from(model),
        Some(Meta::empty()),
    ))
}

async fn clear_default_address<C: sea_orm::ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<()> {
    Addresses::update_many()
        .col_expr(addresses::Column::IsDefault, Expr::value(false))
        .filter(addresses::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn set_default_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Address>> {
    let txn = state.orm.begin().await?;
    let model = Addresses::find()
        .filter(
            Condition::all()
                .add(addresses::Column::Id.eq(id))
                .add(addresses::Column::UserId.eq(user.user_id)),
        )
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    clear_default_address(&txn, user.user_id).await?;
    let mut active: addresses::ActiveModel = model.into();
    active.is_default = Set(true);
    let model = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "address_set_default",
        "addresses",
        serde_json::json!({ "address_id": model.id }),
    )
    .await;

    Ok(ApiResponse::success("Default address updated", Address::from(model), None))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;
    let model = Addresses::find()
        .filter(
            Condition::all()
                .add(addresses::Column::Id.eq(id))
                .add(addresses::Column::UserId.eq(user.user_id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let was_default = model.is_default;
    Addresses::delete_by_id(model.id).exec(&txn).await?;

    // The oldest remaining address inherits the default.
    let mut promoted = None;
    if was_default {
        if let Some(next) = Addresses::find()
            .filter(addresses::Column::UserId.eq(user.user_id))
            .order_by_asc(addresses::Column::CreatedAt)
            .one(&txn)
            .await?
        {
            let mut active: addresses::ActiveModel = next.into();
            active.is_default = Set(true);
            promoted = Some(active.update(&txn).await?.id);
        }
    }
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "address_delete",
        "addresses",
        serde_json::json!({ "address_id": id, "promoted_default": promoted }),
    )
    .await;

    Ok(ApiResponse::success(
        "Address deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_payment_methods(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<PaymentMethod>>> {
    let items = PaymentMethods::find()
        .filter(payment_methods::Column::UserId.eq(user.user_id))
        .order_by_desc(payment_methods::Column::IsDefault)
        .order_by_asc(payment_methods::Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(PaymentMethod::from)
        .collect();
    Ok(ApiResponse::success("Payment methods", items, Some(Meta::empty())))
}

pub async fn create_payment_method(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentMethodRequest,
) -> AppResult<ApiResponse<PaymentMethod>> {
    require("holder_name", &payload.holder_name)?;
    let card = check_card(
        &payload.card_number,
        payload.exp_month,
        payload.exp_year,
        Utc::now().date_naive(),
    )?;

    let txn = state.orm.begin().await?;
    let existing = PaymentMethods::find()
        .filter(payment_methods::Column::UserId.eq(user.user_id))
        .count(&txn)
        .await?;
    let is_default = payload.is_default || existing == 0;
    if is_default {
        PaymentMethods::update_many()
            .col_expr(payment_methods::Column::IsDefault, Expr::value(false))
            .filter(payment_methods::Column::UserId.eq(user.user_id))
            .exec(&txn)
            .await?;
    }

    let model = payment_methods::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        brand: Set(card.brand.as_str().to_string()),
        last4: Set(card.last4),
        holder_name: Set(payload.holder_name),
        exp_month: Set(payload.exp_month),
        exp_year: Set(payload.exp_year),
        is_default: Set(is_default),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "payment_method_add",
        "payment_methods",
        serde_json::json!({ "payment_method_id": model.id, "brand": model.brand }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment method saved",
        PaymentMethod::from(model),
        Some(Meta::empty()),
    ))
}

pub async fn delete_payment_method(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = PaymentMethods::delete_many()
        .filter(
            Condition::all()
                .add(payment_methods::Column::Id.eq(id))
                .add(payment_methods::Column::UserId.eq(user.user_id)),
        )
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        state,
        Some(user.user_id),
        "payment_method_delete",
        "payment_methods",
        serde_json::json!({ "payment_method_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment method deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
