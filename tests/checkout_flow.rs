// End-to-end order flow against a real Postgres. Skipped when no database is configured.
use ancestral_heartbeat::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    domain::{coupon::CouponKind, order_status::{OrderStatus, PaymentStatus}, role::Role},
    dto::{
        account::CreateAddressRequest,
        admin::{InventoryAdjustRequest, UpdateOrderStatusRequest},
        auth::RegisterRequest,
        cart::{AddToCartRequest, ApplyCouponRequest},
        coupons::{CreateCouponRequest, UpdateCouponRequest},
        orders::{CheckoutRequest, PayOrderRequest},
        products::{CreateProductRequest, UpdateProductRequest, VariantInput},
    },
    error::AppError,
    i18n::Locale,
    middleware::auth::AuthUser,
    models::{Order, ShippingAddress},
    services::{
        account_service, admin_service, auth_service, cart_service, coupon_service,
        loyalty_service, order_service, product_service,
    },
    state::AppState,
};
use uuid::Uuid;

const TABLES: &str = "order_items, orders, cart_items, carts, coupons, wishlist_items, \
    loyalty_transactions, vendor_applications, audit_logs, payment_methods, addresses, \
    product_variants, products, users";

async fn setup() -> anyhow::Result<Option<AppState>> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL"))
    else {
        eprintln!("skipping checkout flow: TEST_DATABASE_URL or DATABASE_URL not set");
        return Ok(None);
    };

    let mut config = AppConfig::for_tests("checkout-flow-secret");
    config.database_url = url;
    let orm = create_orm_conn(&config).await?;
    run_migrations(&orm).await?;

    let state = AppState::new(orm, config);
    sqlx::query(&format!("TRUNCATE {TABLES} RESTART IDENTITY CASCADE"))
        .execute(state.pool())
        .await?;
    Ok(Some(state))
}

async fn user_with_role(state: &AppState, email: &str, role: Role) -> anyhow::Result<AuthUser> {
    let created = auth_service::register_user(
        state,
        RegisterRequest {
            email: email.to_string(),
            password: "password12345".to_string(),
            full_name: Some("Prueba".to_string()),
        },
    )
    .await?
    .data
    .expect("registered user");
    sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
        .bind(role.as_str())
        .bind(created.id)
        .execute(state.pool())
        .await?;
    Ok(AuthUser {
        user_id: created.id,
        role,
    })
}

async fn product(state: &AppState, admin: &AuthUser, name: &str) -> anyhow::Result<Uuid> {
    let created = product_service::create_product(
        state,
        admin,
        CreateProductRequest {
            name_es: name.to_string(),
            name_en: None,
            description_es: None,
            description_en: None,
            category: "Mochilas".to_string(),
            color: None,
            price: 100_000,
            stock: 10,
            image_url: None,
            variants: Vec::new(),
        },
        Locale::Es,
    )
    .await?
    .data
    .expect("product");
    Ok(created.id)
}

async fn stock_of(state: &AppState, id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(state.pool())
        .await?;
    Ok(stock)
}

async fn variant_stock_of(state: &AppState, id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM product_variants WHERE id = $1")
        .bind(id)
        .fetch_one(state.pool())
        .await?;
    Ok(stock)
}

async fn add(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            product_id,
            variant_id,
            quantity,
        },
        Locale::Es,
    )
    .await?;
    Ok(())
}

async fn place_order(state: &AppState, user: &AuthUser) -> anyhow::Result<Order> {
    Ok(order_service::checkout(state, user, checkout_request(None))
        .await?
        .data
        .expect("order")
        .order)
}

async fn order_of(state: &AppState, staff: &AuthUser, id: Uuid) -> anyhow::Result<Order> {
    Ok(admin_service::get_order_admin(state, staff, id)
        .await?
        .data
        .expect("order")
        .order)
}

fn address_request(label: &str) -> CreateAddressRequest {
    let shipping = address();
    CreateAddressRequest {
        label: label.to_string(),
        recipient: shipping.recipient,
        line1: shipping.line1,
        line2: None,
        city: shipping.city,
        department: shipping.department,
        postal_code: None,
        country: None,
        phone: None,
        is_default: false,
    }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        recipient: "Ana Arhuaca".to_string(),
        line1: "Calle 10 # 5-20".to_string(),
        line2: None,
        city: "Valledupar".to_string(),
        department: "Cesar".to_string(),
        postal_code: None,
        country: "CO".to_string(),
        phone: None,
    }
}

fn checkout_request(redeem_points: Option<i64>) -> CheckoutRequest {
    CheckoutRequest {
        address_id: None,
        shipping_address: Some(address()),
        payment_method: "card".to_string(),
        redeem_points,
    }
}

async fn set_status(
    state: &AppState,
    staff: &AuthUser,
    id: Uuid,
    status: OrderStatus,
) -> anyhow::Result<()> {
    admin_service::update_order_status(state, staff, id, UpdateOrderStatusRequest { status })
        .await?;
    Ok(())
}

async fn happy_path(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    let customer = user_with_role(state, "ana@example.com", Role::Customer).await?;
    let product_id = product(state, admin, "Mochila wayuu").await?;

    coupon_service::create_coupon(
        state,
        admin,
        CreateCouponRequest {
            code: "bienvenido10".to_string(),
            kind: CouponKind::Percentage,
            value: 10,
            min_purchase: 0,
            max_discount_amount: None,
            expires_at: None,
            usage_limit: None,
        },
    )
    .await?;

    cart_service::add_to_cart(
        state,
        &customer,
        AddToCartRequest {
            product_id,
            variant_id: None,
            quantity: 2,
        },
        Locale::Es,
    )
    .await?;
    let cart = cart_service::apply_coupon(
        state,
        &customer,
        ApplyCouponRequest {
            code: "BIENVENIDO10".to_string(),
        },
        Locale::Es,
    )
    .await?
    .data
    .expect("cart");
    assert_eq!(cart.summary.subtotal, 200_000);
    assert_eq!(cart.summary.discount, 20_000);
    assert_eq!(cart.summary.tax, 34_200);
    assert_eq!(cart.summary.shipping, 15_000);
    assert_eq!(cart.summary.total, 229_200);

    let placed = order_service::checkout(state, &customer, checkout_request(None))
        .await?
        .data
        .expect("order");
    let order = placed.order;
    assert_eq!(order.total, 229_200);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.coupon_code.as_deref(), Some("BIENVENIDO10"));
    assert_eq!(placed.items.len(), 1);
    assert_eq!(stock_of(state, product_id).await?, 8);

    let emptied = cart_service::build_view(state, customer.user_id, Locale::Es).await?;
    assert!(emptied.items.is_empty());
    assert!(emptied.coupon.is_none());

    let wrong = order_service::pay_order(
        state,
        &customer,
        order.id,
        PayOrderRequest {
            invoice_number: "INV-00000000-deadbeef".to_string(),
        },
    )
    .await;
    assert!(wrong.is_err());

    let paid = order_service::pay_order(
        state,
        &customer,
        order.id,
        PayOrderRequest {
            invoice_number: order.invoice_number.clone(),
        },
    )
    .await?
    .data
    .expect("paid order");
    assert_eq!(paid.order.status, OrderStatus::Processing);
    assert_eq!(paid.order.payment_status, PaymentStatus::Paid);

    let again = order_service::pay_order(
        state,
        &customer,
        order.id,
        PayOrderRequest {
            invoice_number: order.invoice_number.clone(),
        },
    )
    .await;
    assert!(again.is_err());

    set_status(state, admin, order.id, OrderStatus::Shipped).await?;
    let tracking = order_service::track_order(state, &customer, order.id, Locale::En)
        .await?
        .data
        .expect("tracking");
    assert_eq!(tracking.status, OrderStatus::Shipped);
    assert!(tracking.tracking_number.is_some());
    assert!(!tracking.cancelled);

    set_status(state, admin, order.id, OrderStatus::Delivered).await?;
    // Re-entering delivered must not award twice.
    set_status(state, admin, order.id, OrderStatus::Delivered).await?;
    let account = loyalty_service::get_account(state, &customer)
        .await?
        .data
        .expect("loyalty");
    assert_eq!(account.balance, 229);
    assert_eq!(account.lifetime_points, 229);

    let (filename, body) = order_service::invoice(state, &customer, order.id, Locale::Es).await?;
    assert!(filename.contains(&order.invoice_number));
    assert!(body.contains(&order.invoice_number));

    let stranger = user_with_role(state, "otro@example.com", Role::Customer).await?;
    assert!(order_service::get_order(state, &stranger, order.id).await.is_err());
    Ok(())
}

async fn cancel_path(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    let customer = user_with_role(state, "luis@example.com", Role::Customer).await?;
    sqlx::query("UPDATE users SET loyalty_points = 500 WHERE id = $1")
        .bind(customer.user_id)
        .execute(state.pool())
        .await?;
    let product_id = product(state, admin, "Sombrero vueltiao").await?;

    cart_service::add_to_cart(
        state,
        &customer,
        AddToCartRequest {
            product_id,
            variant_id: None,
            quantity: 3,
        },
        Locale::Es,
    )
    .await?;

    let too_many = order_service::checkout(state, &customer, checkout_request(Some(501))).await;
    assert!(too_many.is_err());

    let order = order_service::checkout(state, &customer, checkout_request(Some(100)))
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(order.points_redeemed, 100);
    assert_eq!(order.points_discount, 1_000);
    assert_eq!(stock_of(state, product_id).await?, 7);

    let spent = loyalty_service::get_account(state, &customer)
        .await?
        .data
        .expect("loyalty");
    assert_eq!(spent.balance, 400);

    let cancelled = order_service::cancel_order(state, &customer, order.id)
        .await?
        .data
        .expect("cancelled");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(state, product_id).await?, 10);

    let restored = loyalty_service::get_account(state, &customer)
        .await?
        .data
        .expect("loyalty");
    assert_eq!(restored.balance, 500);

    assert!(order_service::cancel_order(state, &customer, order.id).await.is_err());
    Ok(())
}

async fn reopen_path(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    let customer = user_with_role(state, "marta@example.com", Role::Customer).await?;
    let product_id = product(state, admin, "Hamaca de San Jacinto").await?;

    add(state, &customer, product_id, None, 3).await?;
    let order = place_order(state, &customer).await?;
    assert_eq!(stock_of(state, product_id).await?, 7);

    set_status(state, admin, order.id, OrderStatus::Cancelled).await?;
    assert_eq!(stock_of(state, product_id).await?, 10);
    set_status(state, admin, order.id, OrderStatus::Pending).await?;
    assert_eq!(stock_of(state, product_id).await?, 7);
    set_status(state, admin, order.id, OrderStatus::Cancelled).await?;
    assert_eq!(stock_of(state, product_id).await?, 10);

    // Reopening needs the units back on the shelf.
    admin_service::adjust_inventory(
        state,
        admin,
        product_id,
        InventoryAdjustRequest { delta: -9 },
        Locale::Es,
    )
    .await?;
    let short = set_status(state, admin, order.id, OrderStatus::Pending).await;
    assert!(short.is_err());
    assert_eq!(stock_of(state, product_id).await?, 1);
    assert_eq!(order_of(state, admin, order.id).await?.status, OrderStatus::Cancelled);
    Ok(())
}

async fn delivered_then_cancelled(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    let customer = user_with_role(state, "jose@example.com", Role::Customer).await?;
    let product_id = product(state, admin, "Ruana boyacense").await?;

    add(state, &customer, product_id, None, 1).await?;
    let order = place_order(state, &customer).await?;
    order_service::pay_order(
        state,
        &customer,
        order.id,
        PayOrderRequest {
            invoice_number: order.invoice_number.clone(),
        },
    )
    .await?;

    set_status(state, admin, order.id, OrderStatus::Shipped).await?;
    let tracking = order_of(state, admin, order.id).await?.tracking_number;
    assert!(tracking.is_some());
    set_status(state, admin, order.id, OrderStatus::Processing).await?;
    set_status(state, admin, order.id, OrderStatus::Shipped).await?;
    assert_eq!(order_of(state, admin, order.id).await?.tracking_number, tracking);

    set_status(state, admin, order.id, OrderStatus::Delivered).await?;
    assert_eq!(stock_of(state, product_id).await?, 9);
    set_status(state, admin, order.id, OrderStatus::Cancelled).await?;
    let cancelled = order_of(state, admin, order.id).await?;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    assert_eq!(stock_of(state, product_id).await?, 10);
    Ok(())
}

async fn variant_path(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    let customer = user_with_role(state, "rosa@example.com", Role::Customer).await?;
    let created = product_service::create_product(
        state,
        admin,
        CreateProductRequest {
            name_es: "Mola guna".to_string(),
            name_en: None,
            description_es: None,
            description_en: None,
            category: "Textiles".to_string(),
            color: None,
            price: 100_000,
            stock: 10,
            image_url: None,
            variants: vec![VariantInput {
                id: None,
                name: "Grande".to_string(),
                price_modifier: 20_000,
                stock: 5,
            }],
        },
        Locale::Es,
    )
    .await?
    .data
    .expect("product");
    let variant_id = created.variants[0].id;

    add(state, &customer, created.id, Some(variant_id), 2).await?;
    let order = place_order(state, &customer).await?;
    assert_eq!(order.subtotal, 240_000);
    assert_eq!(variant_stock_of(state, variant_id).await?, 3);
    assert_eq!(stock_of(state, created.id).await?, 10);

    let update = |variants: Vec<VariantInput>| UpdateProductRequest {
        name_es: None,
        name_en: None,
        description_es: None,
        description_en: None,
        category: None,
        color: None,
        price: None,
        stock: None,
        rating: None,
        image_url: None,
        variants: Some(variants),
    };
    let kept = product_service::update_product(
        state,
        admin,
        created.id,
        update(vec![
            VariantInput {
                id: Some(variant_id),
                name: "Grande".to_string(),
                price_modifier: 25_000,
                stock: 3,
            },
            VariantInput {
                id: None,
                name: "Mediana".to_string(),
                price_modifier: 10_000,
                stock: 4,
            },
        ]),
        Locale::Es,
    )
    .await?
    .data
    .expect("product");
    assert_eq!(kept.variants.len(), 2);
    assert!(kept.variants.iter().any(|v| v.id == variant_id && v.price_modifier == 25_000));

    let dropped =
        product_service::update_product(state, admin, created.id, update(Vec::new()), Locale::Es)
            .await;
    assert!(matches!(dropped, Err(AppError::Conflict(_))));

    order_service::cancel_order(state, &customer, order.id).await?;
    assert_eq!(variant_stock_of(state, variant_id).await?, 5);
    assert_eq!(stock_of(state, created.id).await?, 10);

    let deleted = product_service::delete_product(state, admin, created.id).await;
    assert!(matches!(deleted, Err(AppError::Conflict(_))));
    let unsold = product(state, admin, "Canasto de iraca").await?;
    product_service::delete_product(state, admin, unsold).await?;
    Ok(())
}

async fn inventory_bounds(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    let product_id = product(state, admin, "Tinaja de Ráquira").await?;
    for delta in [i32::MAX, -11, i32::MIN] {
        let result = admin_service::adjust_inventory(
            state,
            admin,
            product_id,
            InventoryAdjustRequest { delta },
            Locale::Es,
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))), "delta {delta}");
    }
    assert_eq!(stock_of(state, product_id).await?, 10);

    let raised = admin_service::adjust_inventory(
        state,
        admin,
        product_id,
        InventoryAdjustRequest { delta: 5 },
        Locale::Es,
    )
    .await?
    .data
    .expect("product");
    assert_eq!(raised.stock, 15);
    Ok(())
}

async fn stale_coupon(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    let customer = user_with_role(state, "camilo@example.com", Role::Customer).await?;
    let product_id = product(state, admin, "Chinchorro guajiro").await?;
    let coupon = coupon_service::create_coupon(
        state,
        admin,
        CreateCouponRequest {
            code: "FERIA".to_string(),
            kind: CouponKind::Fixed,
            value: 5_000,
            min_purchase: 0,
            max_discount_amount: None,
            expires_at: None,
            usage_limit: None,
        },
    )
    .await?
    .data
    .expect("coupon");

    add(state, &customer, product_id, None, 1).await?;
    cart_service::apply_coupon(
        state,
        &customer,
        ApplyCouponRequest {
            code: "feria".to_string(),
        },
        Locale::Es,
    )
    .await?;
    coupon_service::update_coupon(
        state,
        admin,
        coupon.id,
        UpdateCouponRequest {
            value: None,
            min_purchase: None,
            max_discount_amount: None,
            active: Some(false),
            expires_at: None,
            usage_limit: None,
        },
    )
    .await?;

    let view = cart_service::build_view(state, customer.user_id, Locale::Es).await?;
    let applied = view.coupon.expect("stored coupon");
    assert_eq!(applied.discount, 0);
    assert!(applied.rejected_reason.is_some());

    let refused = order_service::checkout(state, &customer, checkout_request(None)).await;
    assert!(matches!(refused, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(state, product_id).await?, 10);
    assert_eq!(
        cart_service::build_view(state, customer.user_id, Locale::Es)
            .await?
            .items
            .len(),
        1
    );
    Ok(())
}

async fn cart_lines_stay_unique(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    let customer = user_with_role(state, "paula@example.com", Role::Customer).await?;
    let product_id = product(state, admin, "Sombrero aguadeño").await?;

    let (first, second) = tokio::join!(
        add(state, &customer, product_id, None, 2),
        add(state, &customer, product_id, None, 3),
    );
    first?;
    second?;
    add(state, &customer, product_id, None, 4).await?;

    let (lines,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(customer.user_id)
            .bind(product_id)
            .fetch_one(state.pool())
            .await?;
    assert_eq!(lines, 1);

    let order = place_order(state, &customer).await?;
    assert_eq!(order.subtotal, 400_000);
    assert_eq!(stock_of(state, product_id).await?, 6);
    Ok(())
}

async fn address_book(state: &AppState) -> anyhow::Result<()> {
    let customer = user_with_role(state, "diana@example.com", Role::Customer).await?;

    let first = account_service::create_address(state, &customer, address_request("Casa"))
        .await?
        .data
        .expect("address");
    assert!(first.is_default);
    let second = account_service::create_address(state, &customer, address_request("Taller"))
        .await?
        .data
        .expect("address");
    assert!(!second.is_default);

    account_service::delete_address(state, &customer, first.id).await?;
    let remaining = account_service::list_addresses(state, &customer)
        .await?
        .data
        .expect("addresses");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second.id);
    assert!(remaining[0].is_default);

    for action in ["address_add", "address_delete"] {
        let (rows,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM audit_logs WHERE user_id = $1 AND action = $2",
        )
        .bind(customer.user_id)
        .bind(action)
        .fetch_one(state.pool())
        .await?;
        assert!(rows > 0, "no audit row for {action}");
    }
    Ok(())
}

#[tokio::test]
async fn checkout_pay_ship_deliver_and_cancel() -> anyhow::Result<()> {
    let Some(state) = setup().await? else {
        return Ok(());
    };
    let admin = user_with_role(&state, "admin@example.com", Role::Admin).await?;

    happy_path(&state, &admin).await?;
    cancel_path(&state, &admin).await?;
    reopen_path(&state, &admin).await?;
    delivered_then_cancelled(&state, &admin).await?;
    variant_path(&state, &admin).await?;
    inventory_bounds(&state, &admin).await?;
    stale_coupon(&state, &admin).await?;
    cart_lines_stay_unique(&state, &admin).await?;
    address_book(&state).await?;
    Ok(())
}
