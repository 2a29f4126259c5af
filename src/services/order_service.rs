use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        coupon::CouponRule,
        invoice::{InvoiceDocument, InvoiceLine},
        loyalty,
        order_status::{OrderStatus, PaymentStatus},
        pricing::{self, LineInput},
    },
    dto::orders::{
        CheckoutRequest, OrderList, OrderTracking, OrderWithItems, PayOrderRequest, TrackingStep,
    },
    entity::{
        addresses::{self, Entity as Addresses},
        cart_items::{self, Entity as CartItems},
        carts::{self, Entity as Carts},
        coupons::{self, Entity as Coupons},
        order_items::{self, Entity as OrderItems},
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        product_variants::{self, Entity as ProductVariants},
        products::{self, Entity as Products},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    i18n::{Locale, Message, status_label},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, ShippingAddress},
    notifications::NotificationKind,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::loyalty_service,
    state::AppState,
};

/// Orders page, optionally scoped to one customer.
pub async fn find_orders(
    state: &AppState,
    owner: Option<Uuid>,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(owner) = owner {
        condition = condition.add(OrderCol::UserId.eq(owner));
    }
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    find_orders(state, Some(user.user_id), query).await
}

pub async fn load_items<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
    Ok(OrderItems::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .order_by_asc(order_items::Column::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect())
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    id: Uuid,
    lock: bool,
) -> AppResult<orders::Model> {
    let mut finder = Orders::find().filter(
        Condition::all()
            .add(OrderCol::UserId.eq(user.user_id))
            .add(OrderCol::Id.eq(id)),
    );
    if lock {
        finder = finder.lock(LockType::Update);
    }
    finder.one(conn).await?.ok_or(AppError::NotFound)
}

async fn resolve_address<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    payload: &CheckoutRequest,
) -> AppResult<ShippingAddress> {
    if let Some(address) = &payload.shipping_address {
        if address.recipient.trim().is_empty()
            || address.line1.trim().is_empty()
            || address.city.trim().is_empty()
        {
            return Err(AppError::BadRequest(
                "shipping address needs recipient, line1 and city".into(),
            ));
        }
        return Ok(address.clone());
    }

    let mut finder = Addresses::find().filter(addresses::Column::UserId.eq(user.user_id));
    finder = match payload.address_id {
        Some(id) => finder.filter(addresses::Column::Id.eq(id)),
        None => finder.filter(addresses::Column::IsDefault.eq(true)),
    };
    let saved = finder
        .one(conn)
        .await?
        .ok_or_else(|| AppError::BadRequest("shipping address is required".into()))?;

    Ok(ShippingAddress {
        recipient: saved.recipient,
        line1: saved.line1,
        line2: saved.line2,
        city: saved.city,
        department: saved.department,
        postal_code: saved.postal_code,
        country: saved.country,
        phone: saved.phone,
    })
}

struct PricedLine {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    product_name: String,
    variant_name: Option<String>,
    input: LineInput,
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let payment_method = payload.payment_method.trim().to_string();
    if payment_method.is_empty() {
        return Err(AppError::BadRequest("payment_method is required".into()));
    }
    let redeem_points = payload.redeem_points.unwrap_or(0);
    if redeem_points < 0 {
        return Err(AppError::BadRequest("redeem_points cannot be negative".into()));
    }

    let txn = state.orm.begin().await?;
    let ship_to = resolve_address(&txn, user, &payload).await?;

    let cart = CartItems::find()
        .filter(cart_items::Column::UserId.eq(user.user_id))
        .order_by_asc(cart_items::Column::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let product_ids: Vec<Uuid> = cart.iter().map(|c| c.product_id).collect();
    let variant_ids: Vec<Uuid> = cart.iter().filter_map(|c| c.variant_id).collect();
    let products: HashMap<Uuid, products::Model> = Products::find()
        .filter(products::Column::Id.is_in(product_ids))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let variants: HashMap<Uuid, product_variants::Model> = if variant_ids.is_empty() {
        HashMap::new()
    } else {
        ProductVariants::find()
            .filter(product_variants::Column::Id.is_in(variant_ids))
            .lock(LockType::Update)
            .all(&txn)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect()
    };

    let mut lines = Vec::with_capacity(cart.len());
    let mut demand: HashMap<(Uuid, Option<Uuid>), (i32, i32, String)> = HashMap::new();
    for row in &cart {
        if row.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        let product = products.get(&row.product_id).ok_or_else(|| {
            AppError::BadRequest(format!("product {} is no longer available", row.product_id))
        })?;
        let variant = match row.variant_id {
            Some(id) => Some(
                variants
                    .get(&id)
                    .filter(|v| v.product_id == product.id)
                    .ok_or_else(|| {
                        AppError::BadRequest(format!("variant {id} is no longer available"))
                    })?,
            ),
            None => None,
        };
        let stock = variant.map(|v| v.stock).unwrap_or(product.stock);
        let entry = demand
            .entry((product.id, variant.map(|v| v.id)))
            .or_insert((0, stock, product.name_es.clone()));
        entry.0 = entry.0.saturating_add(row.quantity);
        lines.push(PricedLine {
            product_id: product.id,
            variant_id: variant.map(|v| v.id),
            product_name: product.name_es.clone(),
            variant_name: variant.map(|v| v.name.clone()),
            input: LineInput::new(
                product.price,
                variant.map(|v| v.price_modifier).unwrap_or(0),
                row.quantity,
            ),
        });
    }
    if let Some((_, _, name)) = demand.values().find(|(wanted, stock, _)| wanted > stock) {
        return Err(AppError::BadRequest(format!("Insufficient stock for {name}")));
    }
    let inputs: Vec<LineInput> = lines.iter().map(|l| l.input).collect();
    let subtotal = pricing::subtotal(&inputs);

    let coupon_code = Carts::find_by_id(user.user_id)
        .one(&txn)
        .await?
        .and_then(|c| c.coupon_code);
    let coupon = match &coupon_code {
        Some(code) => Coupons::find()
            .filter(coupons::Column::Code.eq(code.clone()))
            .lock(LockType::Update)
            .one(&txn)
            .await?,
        None => None,
    };
    let discount = match &coupon {
        Some(model) => CouponRule::from(model).evaluate(subtotal, Utc::now())?,
        None if coupon_code.is_some() => {
            return Err(AppError::BadRequest("coupon not found".into()));
        }
        None => 0,
    };

    let points_discount = if redeem_points > 0 {
        let owner = Users::find_by_id(user.user_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        if redeem_points > owner.loyalty_points {
            return Err(AppError::BadRequest("not enough loyalty points".into()));
        }
        if redeem_points > loyalty::max_redeemable(owner.loyalty_points, subtotal - discount) {
            return Err(AppError::BadRequest(
                "redeemed points exceed the order amount".into(),
            ));
        }
        loyalty::redemption_value(redeem_points)
    } else {
        0
    };

    let summary = pricing::summarize(&inputs, discount, points_discount, &state.config.pricing);

    let order_id = Uuid::new_v4();
    let invoice_number = build_invoice_number(order_id);
    let address_json = serde_json::to_value(&ship_to).map_err(anyhow::Error::from)?;

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        subtotal: Set(summary.subtotal),
        discount: Set(summary.discount),
        points_discount: Set(summary.points_discount),
        tax: Set(summary.tax),
        shipping: Set(summary.shipping),
        total: Set(summary.total),
        coupon_code: Set(coupon.as_ref().map(|c| c.code.clone())),
        points_redeemed: Set(redeem_points),
        status: Set(OrderStatus::Pending),
        payment_status: Set(PaymentStatus::Unpaid),
        payment_method: Set(payment_method),
        shipping_address: Set(address_json),
        invoice_number: Set(invoice_number.clone()),
        tracking_number: Set(None),
        stock_restored: Set(false),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = order_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            variant_id: Set(line.variant_id),
            product_name: Set(line.product_name.clone()),
            variant_name: Set(line.variant_name.clone()),
            quantity: Set(line.input.quantity),
            unit_price: Set(line.input.unit_price()),
            line_total: Set(line.input.total()),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));

        adjust_stock(&txn, line.product_id, line.variant_id, -line.input.quantity).await?;
    }

    if let Some(model) = &coupon {
        Coupons::update_many()
            .col_expr(
                coupons::Column::TimesUsed,
                Expr::col(coupons::Column::TimesUsed).add(1),
            )
            .filter(coupons::Column::Id.eq(model.id))
            .exec(&txn)
            .await?;
    }

    loyalty_service::redeem(&txn, user.user_id, order.id, redeem_points).await?;

    CartItems::delete_many()
        .filter(cart_items::Column::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;
    Carts::update_many()
        .col_expr(carts::Column::CouponCode, Expr::value(Option::<String>::None))
        .filter(carts::Column::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, total = order.total, "order placed");
    audit::record(
        state,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;
    state
        .notifications
        .push(
            user.user_id,
            NotificationKind::Success,
            Message::OrderPlaced { invoice_number },
            None,
        )
        .await;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Move stock of a product, or of its variant when one is given.
async fn adjust_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    delta: i32,
) -> AppResult<()> {
    match variant_id {
        Some(variant_id) => {
            ProductVariants::update_many()
                .col_expr(
                    product_variants::Column::Stock,
                    Expr::col(product_variants::Column::Stock).add(delta),
                )
                .filter(product_variants::Column::Id.eq(variant_id))
                .exec(conn)
                .await?;
        }
        None => {
            Products::update_many()
                .col_expr(
                    products::Column::Stock,
                    Expr::col(products::Column::Stock).add(delta),
                )
                .filter(products::Column::Id.eq(product_id))
                .exec(conn)
                .await?;
        }
    }
    Ok(())
}

/// Decrement stock only when enough units remain.
async fn take_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
) -> AppResult<()> {
    let result = match variant_id {
        Some(variant_id) => {
            ProductVariants::update_many()
                .col_expr(
                    product_variants::Column::Stock,
                    Expr::col(product_variants::Column::Stock).sub(quantity),
                )
                .filter(product_variants::Column::Id.eq(variant_id))
                .filter(product_variants::Column::Stock.gte(quantity))
                .exec(conn)
                .await?
        }
        None => {
            Products::update_many()
                .col_expr(
                    products::Column::Stock,
                    Expr::col(products::Column::Stock).sub(quantity),
                )
                .filter(products::Column::Id.eq(product_id))
                .filter(products::Column::Stock.gte(quantity))
                .exec(conn)
                .await?
        }
    };
    if result.rows_affected == 0 {
        return Err(AppError::BadRequest(format!(
            "not enough stock to reopen the order for product {product_id}"
        )));
    }
    Ok(())
}

/// Set an order's status and run what entering that status implies.
///
/// Returns the updated row and the messages to deliver to its owner once
/// the surrounding transaction commits.
pub async fn apply_status<C: ConnectionTrait>(
    conn: &C,
    order: orders::Model,
    status: OrderStatus,
) -> AppResult<(orders::Model, Vec<Message>)> {
    let previous = order.status;
    if previous == status {
        return Ok((order, Vec::new()));
    }

    let mut messages = Vec::new();
    let mut active: OrderActive = order.clone().into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());

    match status {
        OrderStatus::Shipped if order.tracking_number.is_none() => {
            active.tracking_number = Set(Some(build_tracking_number()));
        }
        OrderStatus::Cancelled => {
            if !order.stock_restored {
                for item in load_items(conn, order.id).await? {
                    adjust_stock(conn, item.product_id, item.variant_id, item.quantity).await?;
                }
                active.stock_restored = Set(true);
            }
            if order.payment_status == PaymentStatus::Paid {
                active.payment_status = Set(PaymentStatus::Refunded);
            }
            loyalty_service::refund_for_order(conn, &order).await?;
        }
        _ => {}
    }

    // A reopened order holds its units again.
    if previous == OrderStatus::Cancelled && order.stock_restored {
        for item in load_items(conn, order.id).await? {
            take_stock(conn, item.product_id, item.variant_id, item.quantity).await?;
        }
        active.stock_restored = Set(false);
    }

    let updated = active.update(conn).await?;

    if status == OrderStatus::Cancelled {
        messages.push(Message::OrderCancelled {
            invoice_number: updated.invoice_number.clone(),
        });
    } else {
        messages.push(Message::OrderStatusChanged {
            invoice_number: updated.invoice_number.clone(),
            status: status.as_str().to_string(),
        });
    }
    if status == OrderStatus::Delivered {
        if let Some(points) = loyalty_service::award_for_order(conn, &updated).await? {
            messages.push(Message::PointsEarned { points });
        }
    }

    Ok((updated, messages))
}

pub async fn notify(state: &AppState, user_id: Uuid, messages: Vec<Message>) {
    for message in messages {
        let kind = match message {
            Message::OrderCancelled { .. } => NotificationKind::Warning,
            Message::PointsEarned { .. } => NotificationKind::Success,
            _ => NotificationKind::Info,
        };
        state.notifications.push(user_id, kind, message, None).await;
    }
}

pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: PayOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    let order = find_owned(&txn, user, id, true).await?;

    if order.invoice_number != payload.invoice_number.trim() {
        return Err(AppError::BadRequest("invoice number does not match".into()));
    }
    if order.payment_status != PaymentStatus::Unpaid {
        return Err(AppError::BadRequest("Order already paid".into()));
    }
    if order.status == OrderStatus::Cancelled {
        return Err(AppError::BadRequest("Order is cancelled".into()));
    }

    let now = Utc::now();
    let mut active: OrderActive = order.clone().into();
    active.payment_status = Set(PaymentStatus::Paid);
    if order.status == OrderStatus::Pending {
        active.status = Set(OrderStatus::Processing);
    }
    active.paid_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    let items = load_items(&txn, order.id).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "order_paid",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;
    state
        .notifications
        .push(
            user.user_id,
            NotificationKind::Success,
            Message::PaymentReceived {
                invoice_number: order.invoice_number.clone(),
            },
            None,
        )
        .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order = find_owned(&txn, user, id, true).await?;
    if !order.status.is_customer_cancellable() {
        return Err(AppError::BadRequest(format!(
            "order cannot be cancelled while {}",
            order.status.as_str()
        )));
    }

    let (order, messages) = apply_status(&txn, order, OrderStatus::Cancelled).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;
    notify(state, user.user_id, messages).await;

    Ok(ApiResponse::success(
        "Order cancelled",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_owned(&state.orm, user, id, false).await?;
    let items = load_items(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub fn tracking_view(order: &orders::Model, locale: Locale) -> OrderTracking {
    let steps = order
        .status
        .tracking_steps()
        .into_iter()
        .map(|(status, reached, current)| TrackingStep {
            status,
            label: status_label(status.as_str(), locale).to_string(),
            reached,
            current,
        })
        .collect();

    OrderTracking {
        order_id: order.id,
        invoice_number: order.invoice_number.clone(),
        status: order.status,
        cancelled: order.status == OrderStatus::Cancelled,
        progress_percent: order.status.progress_percent(),
        steps,
        tracking_number: order.tracking_number.clone(),
    }
}

pub async fn track_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    locale: Locale,
) -> AppResult<ApiResponse<OrderTracking>> {
    let order = find_owned(&state.orm, user, id, false).await?;
    Ok(ApiResponse::success(
        "OK",
        tracking_view(&order, locale),
        None,
    ))
}

/// Rendered invoice as `(filename, body)`.
pub async fn invoice(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    locale: Locale,
) -> AppResult<(String, String)> {
    let order = find_owned(&state.orm, user, id, false).await?;
    let customer = Users::find_by_id(order.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let items = load_items(&state.orm, order.id).await?;

    let ship_to = serde_json::from_value::<ShippingAddress>(order.shipping_address.clone())
        .map(|a| a.lines())
        .unwrap_or_default();
    let item_count = items.iter().map(|i| i64::from(i.quantity)).sum();
    let lines = items
        .into_iter()
        .map(|item| InvoiceLine {
            description: match item.variant_name {
                Some(variant) => format!("{} ({variant})", item.product_name),
                None => item.product_name,
            },
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total,
        })
        .collect();

    let order = Order::from(order);
    let document = InvoiceDocument {
        invoice_number: order.invoice_number.clone(),
        issued_at: order.created_at,
        customer_email: customer.email,
        ship_to,
        payment_method: order.payment_method.clone(),
        status: order.status.as_str().to_string(),
        coupon_code: order.coupon_code.clone(),
        lines,
        totals: order.summary(item_count),
    };
    Ok((document.filename(), document.render(locale)))
}

fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.simple().to_string();
    format!("INV-{}-{}", date, &suffix[..8])
}

fn build_tracking_number() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("AH{}CO", &id[..10])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_number_embeds_date_and_id_prefix() {
        let id = Uuid::parse_str("1a2b3c4d-0000-4000-8000-000000000000").unwrap();
        let number = build_invoice_number(id);
        assert!(number.starts_with("INV-"));
        assert!(number.ends_with("-1a2b3c4d"));
        assert_eq!(number.len(), "INV-20261017-1a2b3c4d".len());
    }

    #[test]
    fn tracking_numbers_are_unique_and_shaped() {
        let a = build_tracking_number();
        let b = build_tracking_number();
        assert_ne!(a, b);
        assert!(a.starts_with("AH") && a.ends_with("CO"));
        assert_eq!(a.len(), 14);
    }
}
