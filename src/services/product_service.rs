use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit,
    domain::role::Role,
    dto::products::{
        CategoryCount, CreateProductRequest, ProductList, UpdateProductRequest, VariantInput,
    },
    entity::{
        order_items::{self, Entity as OrderItems},
        product_variants::{self, Entity as ProductVariants},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    i18n::Locale,
    middleware::auth::{AuthUser, ensure_role},
    models::{Product, ProductVariant},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

/// Render a product row in one language.
pub fn product_view(
    model: ProductModel,
    variants: Vec<product_variants::Model>,
    locale: Locale,
) -> Product {
    Product {
        id: model.id,
        vendor_id: model.vendor_id,
        name: locale.pick(&model.name_es, model.name_en.as_deref()).to_string(),
        description: match locale {
            Locale::En => model.description_en.or(model.description_es),
            Locale::Es => model.description_es,
        },
        category: model.category,
        color: model.color,
        price: model.price,
        stock: model.stock,
        rating: model.rating,
        image_url: model.image_url,
        variants: variants.into_iter().map(ProductVariant::from).collect(),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

/// Attach variants to a batch of products with one query.
pub async fn with_variants<C: ConnectionTrait>(
    conn: &C,
    products: Vec<ProductModel>,
    locale: Locale,
) -> AppResult<Vec<Product>> {
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let mut grouped: HashMap<Uuid, Vec<product_variants::Model>> = HashMap::new();
    if !ids.is_empty() {
        let variants = ProductVariants::find()
            .filter(product_variants::Column::ProductId.is_in(ids))
            .order_by_asc(product_variants::Column::CreatedAt)
            .all(conn)
            .await?;
        for variant in variants {
            grouped.entry(variant.product_id).or_default().push(variant);
        }
    }
    Ok(products
        .into_iter()
        .map(|p| {
            let variants = grouped.remove(&p.id).unwrap_or_default();
            product_view(p, variants, locale)
        })
        .collect())
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
    locale: Locale,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::NameEs).ilike(pattern.clone()))
                .add(Expr::col(Column::NameEn).ilike(pattern.clone()))
                .add(Expr::col(Column::DescriptionEs).ilike(pattern)),
        );
    }
    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }
    if let Some(color) = query.color.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Color).ilike(color.clone()));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::NameEs,
        ProductSortBy::Rating => Column::Rating,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = with_variants(&state.orm, rows, locale).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(
    state: &AppState,
    id: Uuid,
    locale: Locale,
) -> AppResult<ApiResponse<Product>> {
    let model = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let variants = ProductVariants::find()
        .filter(product_variants::Column::ProductId.eq(id))
        .order_by_asc(product_variants::Column::CreatedAt)
        .all(&state.orm)
        .await?;
    Ok(ApiResponse::success(
        "Product",
        product_view(model, variants, locale),
        None,
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<Vec<CategoryCount>>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT category, COUNT(*) FROM products GROUP BY category ORDER BY category",
    )
    .fetch_all(state.pool())
    .await?;
    let items = rows
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    Ok(ApiResponse::success("Categories", items, Some(Meta::empty())))
}

fn validate_variants(variants: &[VariantInput]) -> AppResult<()> {
    for variant in variants {
        if variant.name.trim().is_empty() {
            return Err(AppError::BadRequest("variant name is required".into()));
        }
        if variant.stock < 0 {
            return Err(AppError::BadRequest("variant stock cannot be negative".into()));
        }
    }
    Ok(())
}

async fn insert_variants<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    variants: Vec<VariantInput>,
) -> AppResult<()> {
    for variant in variants {
        product_variants::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            name: Set(variant.name.trim().to_string()),
            price_modifier: Set(variant.price_modifier),
            stock: Set(variant.stock),
            created_at: NotSet,
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

async fn ordered_count<C: ConnectionTrait>(
    conn: &C,
    column: order_items::Column,
    id: Uuid,
) -> AppResult<u64> {
    Ok(OrderItems::find().filter(column.eq(id)).count(conn).await?)
}

/// Bring a product's variants in line with `inputs`. Listed ids are updated
/// in place, entries without an id are created, and the rest are removed
/// unless an order still points at them.
async fn sync_variants<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    inputs: Vec<VariantInput>,
) -> AppResult<()> {
    let existing: HashMap<Uuid, product_variants::Model> = ProductVariants::find()
        .filter(product_variants::Column::ProductId.eq(product_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    let kept: HashSet<Uuid> = inputs.iter().filter_map(|v| v.id).collect();
    for (id, variant) in &existing {
        if kept.contains(id) {
            continue;
        }
        if ordered_count(conn, order_items::Column::VariantId, *id).await? > 0 {
            return Err(AppError::Conflict(format!(
                "variant {} has orders; keep it and set its stock to 0 instead",
                variant.name
            )));
        }
        ProductVariants::delete_by_id(*id).exec(conn).await?;
    }

    let mut fresh = Vec::new();
    for input in inputs {
        let Some(id) = input.id else {
            fresh.push(input);
            continue;
        };
        let current = existing.get(&id).cloned().ok_or_else(|| {
            AppError::BadRequest(format!("variant {id} does not belong to this product"))
        })?;
        let mut active: product_variants::ActiveModel = current.into();
        active.name = Set(input.name.trim().to_string());
        active.price_modifier = Set(input.price_modifier);
        active.stock = Set(input.stock);
        active.update(conn).await?;
    }
    insert_variants(conn, product_id, fresh).await
}

/// Vendors may only touch their own listings.
fn ensure_can_manage(user: &AuthUser, product: &ProductModel) -> AppResult<()> {
    match user.role {
        Role::Admin => Ok(()),
        Role::Vendor if product.vendor_id == Some(user.user_id) => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
    locale: Locale,
) -> AppResult<ApiResponse<Product>> {
    ensure_role(user, &[Role::Admin, Role::Vendor])?;
    if payload.name_es.trim().is_empty() || payload.category.trim().is_empty() {
        return Err(AppError::BadRequest("name_es and category are required".into()));
    }
    if payload.price < 0 || payload.stock < 0 {
        return Err(AppError::BadRequest("price and stock cannot be negative".into()));
    }
    validate_variants(&payload.variants)?;

    let txn = state.orm.begin().await?;
    let id = Uuid::new_v4();
    let vendor_id = (user.role == Role::Vendor).then_some(user.user_id);
    let product = ActiveModel {
        id: Set(id),
        vendor_id: Set(vendor_id),
        name_es: Set(payload.name_es.trim().to_string()),
        name_en: Set(payload.name_en),
        description_es: Set(payload.description_es),
        description_en: Set(payload.description_en),
        category: Set(payload.category.trim().to_lowercase()),
        color: Set(payload.color),
        price: Set(payload.price),
        stock: Set(payload.stock),
        rating: Set(0.0),
        image_url: Set(payload.image_url),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    insert_variants(&txn, id, payload.variants).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let mut view = with_variants(&state.orm, vec![product], locale).await?;
    let product = view.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
    locale: Locale,
) -> AppResult<ApiResponse<Product>> {
    ensure_role(user, &[Role::Admin, Role::Vendor])?;
    let txn = state.orm.begin().await?;
    let existing = Products::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_can_manage(user, &existing)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name_es.filter(|n| !n.trim().is_empty()) {
        active.name_es = Set(name.trim().to_string());
    }
    if let Some(name) = payload.name_en {
        active.name_en = Set(Some(name));
    }
    if let Some(description) = payload.description_es {
        active.description_es = Set(Some(description));
    }
    if let Some(description) = payload.description_en {
        active.description_en = Set(Some(description));
    }
    if let Some(category) = payload.category.filter(|c| !c.trim().is_empty()) {
        active.category = Set(category.trim().to_lowercase());
    }
    if let Some(color) = payload.color {
        active.color = Set(Some(color));
    }
    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::BadRequest("price cannot be negative".into()));
        }
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        if stock < 0 {
            return Err(AppError::BadRequest("stock cannot be negative".into()));
        }
        active.stock = Set(stock);
    }
    if let Some(rating) = payload.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(AppError::BadRequest("rating must be between 0 and 5".into()));
        }
        active.rating = Set(rating);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }

    let product = active.update(&txn).await?;

    if let Some(variants) = payload.variants {
        validate_variants(&variants)?;
        sync_variants(&txn, id, variants).await?;
    }
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let mut view = with_variants(&state.orm, vec![product], locale).await?;
    let product = view.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_role(user, &[Role::Admin, Role::Vendor])?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_can_manage(user, &existing)?;

    if ordered_count(&state.orm, order_items::Column::ProductId, id).await? > 0 {
        return Err(AppError::Conflict(
            "product has orders; set its stock to 0 instead of deleting it".into(),
        ));
    }

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        state,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

