use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::wishlist::{AddWishlistRequest, WishlistProductList, WishlistToggle},
    entity::{
        products::{self, Entity as Products},
        wishlist_items::{self, Column, Entity as WishlistItems},
    },
    error::{AppError, AppResult},
    i18n::Locale,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::product_service::with_variants,
    state::AppState,
};

fn owned(user: &AuthUser, product_id: Uuid) -> Condition {
    Condition::all()
        .add(Column::UserId.eq(user.user_id))
        .add(Column::ProductId.eq(product_id))
}

pub async fn list_wishlist(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    locale: Locale,
) -> AppResult<ApiResponse<WishlistProductList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Products::find()
        .join(JoinType::InnerJoin, products::Relation::WishlistItems.def())
        .filter(Column::UserId.eq(user.user_id))
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let products = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = with_variants(&state.orm, products, locale).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "OK",
        WishlistProductList { items },
        Some(meta),
    ))
}

async fn insert_if_missing(state: &AppState, user: &AuthUser, product_id: Uuid) -> AppResult<bool> {
    let product = Products::find_by_id(product_id).one(&state.orm).await?;
    if product.is_none() {
        return Err(AppError::BadRequest("product not found".into()));
    }
    let exists = WishlistItems::find()
        .filter(owned(user, product_id))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Ok(false);
    }
    wishlist_items::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(product_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(true)
}

pub async fn add_to_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: AddWishlistRequest,
) -> AppResult<ApiResponse<WishlistToggle>> {
    if insert_if_missing(state, user, payload.product_id).await? {
        audit::record(
            state,
            Some(user.user_id),
            "wishlist_add",
            "wishlist_items",
            serde_json::json!({ "product_id": payload.product_id }),
        )
        .await;
    }
    Ok(ApiResponse::success(
        "Added to wishlist",
        WishlistToggle {
            product_id: payload.product_id,
            in_wishlist: true,
        },
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = WishlistItems::delete_many()
        .filter(owned(user, product_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        state,
        Some(user.user_id),
        "wishlist_remove",
        "wishlist_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from wishlist",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn toggle_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<WishlistToggle>> {
    let removed = WishlistItems::delete_many()
        .filter(owned(user, product_id))
        .exec(&state.orm)
        .await?
        .rows_affected;
    let in_wishlist = if removed > 0 {
        false
    } else {
        insert_if_missing(state, user, product_id).await?
    };

    audit::record(
        state,
        Some(user.user_id),
        "wishlist_toggle",
        "wishlist_items",
        serde_json::json!({ "product_id": product_id, "in_wishlist": in_wishlist }),
    )
    .await;

    Ok(ApiResponse::success(
        "OK",
        WishlistToggle {
            product_id,
            in_wishlist,
        },
        Some(Meta::empty()),
    ))
}
