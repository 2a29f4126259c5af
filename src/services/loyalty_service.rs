use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    domain::loyalty::{self, LoyaltyTier},
    dto::loyalty::LoyaltyAccount,
    entity::{
        loyalty_transactions::{self, Entity as LoyaltyTransactions},
        orders,
        users::{self, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::LoyaltyTransaction,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const REASON_EARN: &str = "earn";
pub const REASON_REDEEM: &str = "redeem";
pub const REASON_REFUND: &str = "refund";

const RECENT_LIMIT: u64 = 10;

pub async fn get_account(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<LoyaltyAccount>> {
    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let recent = LoyaltyTransactions::find()
        .filter(loyalty_transactions::Column::UserId.eq(user.user_id))
        .order_by_desc(loyalty_transactions::Column::CreatedAt)
        .limit(RECENT_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(LoyaltyTransaction::from)
        .collect();

    let tier = LoyaltyTier::for_lifetime_points(account.lifetime_points);
    let data = LoyaltyAccount {
        balance: account.loyalty_points,
        lifetime_points: account.lifetime_points,
        tier,
        next_tier: tier.next(),
        points_to_next_tier: loyalty::points_to_next_tier(account.lifetime_points),
        balance_value: loyalty::redemption_value(account.loyalty_points),
        recent,
    };
    Ok(ApiResponse::success("Loyalty", data, Some(Meta::empty())))
}

async fn has_entry<C: ConnectionTrait>(conn: &C, order_id: Uuid, reason: &str) -> AppResult<bool> {
    let count = LoyaltyTransactions::find()
        .filter(loyalty_transactions::Column::OrderId.eq(order_id))
        .filter(loyalty_transactions::Column::Reason.eq(reason))
        .count(conn)
        .await?;
    Ok(count > 0)
}

async fn insert_entry<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    order_id: Uuid,
    points: i64,
    reason: &str,
) -> AppResult<()> {
    loyalty_transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        order_id: Set(Some(order_id)),
        points: Set(points),
        reason: Set(reason.to_string()),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Spend points against an order being placed.
pub async fn redeem<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    order_id: Uuid,
    points: i64,
) -> AppResult<()> {
    if points <= 0 {
        return Ok(());
    }
    let result = Users::update_many()
        .col_expr(
            users::Column::LoyaltyPoints,
            Expr::col(users::Column::LoyaltyPoints).sub(points),
        )
        .filter(users::Column::Id.eq(user_id))
        .filter(users::Column::LoyaltyPoints.gte(points))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::BadRequest("not enough loyalty points".into()));
    }
    insert_entry(conn, user_id, order_id, -points, REASON_REDEEM).await
}

/// Credit points for a delivered order. Returns the points awarded, or
/// `None` when the order already earned them or is worth nothing.
pub async fn award_for_order<C: ConnectionTrait>(
    conn: &C,
    order: &orders::Model,
) -> AppResult<Option<i64>> {
    if has_entry(conn, order.id, REASON_EARN).await? {
        return Ok(None);
    }
    let owner = Users::find_by_id(order.user_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let tier = LoyaltyTier::for_lifetime_points(owner.lifetime_points);
    let points = loyalty::points_earned(order.total, tier);
    if points <= 0 {
        return Ok(None);
    }

    Users::update_many()
        .col_expr(
            users::Column::LoyaltyPoints,
            Expr::col(users::Column::LoyaltyPoints).add(points),
        )
        .col_expr(
            users::Column::LifetimePoints,
            Expr::col(users::Column::LifetimePoints).add(points),
        )
        .filter(users::Column::Id.eq(order.user_id))
        .exec(conn)
        .await?;
    insert_entry(conn, order.user_id, order.id, points, REASON_EARN).await?;
    Ok(Some(points))
}

/// Give back the points a cancelled order spent, at most once.
pub async fn refund_for_order<C: ConnectionTrait>(
    conn: &C,
    order: &orders::Model,
) -> AppResult<Option<i64>> {
    if order.points_redeemed <= 0 || has_entry(conn, order.id, REASON_REFUND).await? {
        return Ok(None);
    }
    Users::update_many()
        .col_expr(
            users::Column::LoyaltyPoints,
            Expr::col(users::Column::LoyaltyPoints).add(order.points_redeemed),
        )
        .filter(users::Column::Id.eq(order.user_id))
        .exec(conn)
        .await?;
    insert_entry(
        conn,
        order.user_id,
        order.id,
        order.points_redeemed,
        REASON_REFUND,
    )
    .await?;
    Ok(Some(order.points_redeemed))
}
