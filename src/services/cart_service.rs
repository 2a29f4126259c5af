use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        coupon::{CouponError, CouponRule, normalize_code},
        pricing::{self, LineInput},
    },
    dto::cart::{
        AddToCartRequest, AppliedCoupon, ApplyCouponRequest, CartItemDto, CartProduct, CartView,
        MergeCartRequest,
    },
    entity::coupons,
    error::{AppError, AppResult},
    i18n::{Locale, Message},
    middleware::auth::AuthUser,
    models::ProductVariant,
    notifications::NotificationKind,
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(FromRow)]
struct CartLineRow {
    item_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name_es: String,
    name_en: Option<String>,
    category: String,
    color: Option<String>,
    image_url: Option<String>,
    price: i64,
    stock: i32,
    variant_id: Option<Uuid>,
    variant_name: Option<String>,
    price_modifier: Option<i64>,
    variant_stock: Option<i32>,
}

impl CartLineRow {
    fn line(&self) -> LineInput {
        LineInput::new(self.price, self.price_modifier.unwrap_or(0), self.quantity)
    }
}

/// Product and variant figures needed to validate a cart line.
#[derive(FromRow)]
struct StockRow {
    stock: i32,
    variant_product: Option<Uuid>,
    variant_stock: Option<i32>,
}

async fn load_lines(state: &AppState, user_id: Uuid) -> AppResult<Vec<CartLineRow>> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT ci.id AS item_id, ci.quantity,
               p.id AS product_id, p.name_es, p.name_en, p.category, p.color,
               p.image_url, p.price, p.stock,
               v.id AS variant_id, v.name AS variant_name, v.price_modifier,
               v.stock AS variant_stock
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        LEFT JOIN product_variants v ON v.id = ci.variant_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(state.pool())
    .await?;
    Ok(rows)
}

async fn stored_coupon_code(state: &AppState, user_id: Uuid) -> AppResult<Option<String>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT coupon_code FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(state.pool())
            .await?;
    Ok(row.and_then(|(code,)| code))
}

async fn find_coupon(state: &AppState, code: &str) -> AppResult<Option<coupons::Model>> {
    Ok(coupons::Entity::find()
        .filter(coupons::Column::Code.eq(normalize_code(code)))
        .one(&state.orm)
        .await?)
}

/// The cart priced with its stored coupon re-checked against today's subtotal.
pub async fn build_view(state: &AppState, user_id: Uuid, locale: Locale) -> AppResult<CartView> {
    let rows = load_lines(state, user_id).await?;
    let lines: Vec<LineInput> = rows.iter().map(CartLineRow::line).collect();
    let subtotal = pricing::subtotal(&lines);

    let coupon = match stored_coupon_code(state, user_id).await? {
        Some(code) => {
            let evaluated = match find_coupon(state, &code).await? {
                Some(model) => CouponRule::from(&model).evaluate(subtotal, Utc::now()),
                None => Err(CouponError::NotFound),
            };
            Some(match evaluated {
                Ok(discount) => AppliedCoupon {
                    code,
                    discount,
                    rejected_reason: None,
                },
                Err(err) => AppliedCoupon {
                    code,
                    discount: 0,
                    rejected_reason: Some(err.to_string()),
                },
            })
        }
        None => None,
    };
    let discount = coupon.as_ref().map(|c| c.discount).unwrap_or(0);
    let summary = pricing::summarize(&lines, discount, 0, &state.config.pricing);

    let items = rows
        .into_iter()
        .map(|row| {
            let line = row.line();
            let variant = match (row.variant_id, row.variant_name) {
                (Some(id), Some(name)) => Some(ProductVariant {
                    id,
                    name,
                    price_modifier: row.price_modifier.unwrap_or(0),
                    stock: row.variant_stock.unwrap_or(0),
                }),
                _ => None,
            };
            CartItemDto {
                id: row.item_id,
                product: CartProduct {
                    id: row.product_id,
                    name: locale.pick(&row.name_es, row.name_en.as_deref()).to_string(),
                    category: row.category,
                    color: row.color,
                    image_url: row.image_url,
                    price: row.price,
                    stock: row.stock,
                },
                variant,
                quantity: row.quantity,
                unit_price: line.unit_price(),
                line_total: line.total(),
            }
        })
        .collect();

    Ok(CartView {
        items,
        coupon,
        summary,
    })
}

pub async fn get_cart(
    state: &AppState,
    user: &AuthUser,
    locale: Locale,
) -> AppResult<ApiResponse<CartView>> {
    let view = build_view(state, user.user_id, locale).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

/// Stock available for a product or one of its variants.
async fn available_stock(
    state: &AppState,
    product_id: Uuid,
    variant_id: Option<Uuid>,
) -> AppResult<i32> {
    let row = sqlx::query_as::<_, StockRow>(
        r#"
        SELECT p.stock, v.product_id AS variant_product, v.stock AS variant_stock
        FROM products p
        LEFT JOIN product_variants v ON v.id = $2
        WHERE p.id = $1
        "#,
    )
    .bind(product_id)
    .bind(variant_id)
    .fetch_optional(state.pool())
    .await?
    .ok_or_else(|| AppError::BadRequest("product not found".to_string()))?;

    match variant_id {
        None => Ok(row.stock),
        Some(_) if row.variant_product != Some(product_id) => Err(AppError::BadRequest(
            "variant does not belong to product".to_string(),
        )),
        Some(_) => Ok(row.variant_stock.unwrap_or(0)),
    }
}

/// Set a line's quantity; one row per user, product and variant.
async fn upsert_line(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, variant_id, quantity)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, product_id, (COALESCE(variant_id, '00000000-0000-0000-0000-000000000000'::uuid)))
        DO UPDATE SET quantity = EXCLUDED.quantity
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(quantity)
    .execute(state.pool())
    .await?;
    touch_cart(state, user_id).await
}

async fn touch_cart(state: &AppState, user_id: Uuid) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO carts (user_id) VALUES ($1)
        ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
        "#,
    )
    .bind(user_id)
    .execute(state.pool())
    .await?;
    Ok(())
}

/// Set the quantity of a product (and variant) in the cart.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
    locale: Locale,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    let stock = available_stock(state, payload.product_id, payload.variant_id).await?;
    if payload.quantity > stock {
        return Err(AppError::BadRequest(format!(
            "only {stock} units in stock"
        )));
    }

    upsert_line(
        state,
        user.user_id,
        payload.product_id,
        payload.variant_id,
        payload.quantity,
    )
    .await?;

    audit::record(
        state,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({
            "product_id": payload.product_id,
            "variant_id": payload.variant_id,
            "quantity": payload.quantity,
        }),
    )
    .await;

    let view = build_view(state, user.user_id, locale).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

/// Fold a guest cart into the user's cart. Quantities add up and are capped
/// at stock; lines that cannot be satisfied at all are skipped.
pub async fn merge_cart(
    state: &AppState,
    user: &AuthUser,
    payload: MergeCartRequest,
    locale: Locale,
) -> AppResult<ApiResponse<CartView>> {
    let existing = load_lines(state, user.user_id).await?;
    let mut merged = 0usize;

    for item in payload.items {
        if item.quantity <= 0 {
            continue;
        }
        let stock = match available_stock(state, item.product_id, item.variant_id).await {
            Ok(stock) => stock,
            Err(AppError::BadRequest(reason)) => {
                tracing::debug!(product_id = %item.product_id, reason, "skipping guest cart line");
                continue;
            }
            Err(err) => return Err(err),
        };
        let current = existing
            .iter()
            .find(|row| row.product_id == item.product_id && row.variant_id == item.variant_id)
            .map(|row| row.quantity)
            .unwrap_or(0);
        let quantity = current.saturating_add(item.quantity).min(stock);
        if quantity <= 0 {
            continue;
        }
        upsert_line(state, user.user_id, item.product_id, item.variant_id, quantity).await?;
        merged += 1;
    }

    audit::record(
        state,
        Some(user.user_id),
        "cart_merge",
        "cart_items",
        serde_json::json!({ "merged_lines": merged }),
    )
    .await;

    let view = build_view(state, user.user_id, locale).await?;
    Ok(ApiResponse::success("Cart merged", view, Some(Meta::empty())))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user.user_id)
        .execute(state.pool())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        state,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "item_id": item_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(state.pool())
        .await?;
    sqlx::query("UPDATE carts SET coupon_code = NULL, updated_at = now() WHERE user_id = $1")
        .bind(user.user_id)
        .execute(state.pool())
        .await?;

    audit::record(
        state,
        Some(user.user_id),
        "cart_clear",
        "cart_items",
        serde_json::json!({}),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn apply_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: ApplyCouponRequest,
    locale: Locale,
) -> AppResult<ApiResponse<CartView>> {
    let code = normalize_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("coupon code is required".to_string()));
    }
    let model = find_coupon(state, &code)
        .await?
        .ok_or(CouponError::NotFound)?;

    let lines: Vec<LineInput> = load_lines(state, user.user_id)
        .await?
        .iter()
        .map(CartLineRow::line)
        .collect();
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }
    CouponRule::from(&model).evaluate(pricing::subtotal(&lines), Utc::now())?;

    sqlx::query(
        r#"
        INSERT INTO carts (user_id, coupon_code) VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET coupon_code = EXCLUDED.coupon_code, updated_at = now()
        "#,
    )
    .bind(user.user_id)
    .bind(&model.code)
    .execute(state.pool())
    .await?;

    audit::record(
        state,
        Some(user.user_id),
        "coupon_apply",
        "carts",
        serde_json::json!({ "code": model.code }),
    )
    .await;
    state
        .notifications
        .push(
            user.user_id,
            NotificationKind::Success,
            Message::CouponApplied { code: model.code },
            None,
        )
        .await;

    let view = build_view(state, user.user_id, locale).await?;
    Ok(ApiResponse::success("Coupon applied", view, Some(Meta::empty())))
}

pub async fn remove_coupon(
    state: &AppState,
    user: &AuthUser,
    locale: Locale,
) -> AppResult<ApiResponse<CartView>> {
    sqlx::query("UPDATE carts SET coupon_code = NULL, updated_at = now() WHERE user_id = $1")
        .bind(user.user_id)
        .execute(state.pool())
        .await?;

    audit::record(
        state,
        Some(user.user_id),
        "coupon_remove",
        "carts",
        serde_json::json!({}),
    )
    .await;

    let view = build_view(state, user.user_id, locale).await?;
    Ok(ApiResponse::success("Coupon removed", view, Some(Meta::empty())))
}
