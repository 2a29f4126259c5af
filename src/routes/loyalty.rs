use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::loyalty::LoyaltyAccount, error::AppResult, middleware::auth::AuthUser,
    response::ApiResponse, services::loyalty_service, state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_account))
}

#[utoipa::path(
    get,
    path = "/api/loyalty",
    responses(
        (status = 200, description = "Points balance, tier and recent activity", body = ApiResponse<LoyaltyAccount>)
    ),
    security(("bearer_auth" = [])),
    tag = "Loyalty"
)]
pub async fn get_account(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<LoyaltyAccount>>> {
    let resp = loyalty_service::get_account(&state, &user).await?;
    Ok(Json(resp))
}
