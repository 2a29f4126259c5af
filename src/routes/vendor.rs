use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::vendor::{
        ApplicationListQuery, VendorApplicationList, VendorApplyRequest, VendorDecisionRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::VendorApplication,
    response::ApiResponse,
    services::vendor_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/apply", post(apply))
        .route("/applications", get(list_applications))
        .route("/approve", post(decide))
}

#[utoipa::path(
    post,
    path = "/api/vendor/apply",
    request_body = VendorApplyRequest,
    responses(
        (status = 201, description = "Application submitted", body = ApiResponse<VendorApplication>),
        (status = 403, description = "Only customers can apply"),
        (status = 409, description = "An application is already pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VendorApplyRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<VendorApplication>>)> {
    let resp = vendor_service::apply(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/vendor/applications",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending, approved, rejected")
    ),
    responses(
        (status = 200, description = "Vendor applications", body = ApiResponse<VendorApplicationList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn list_applications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ApplicationListQuery>,
) -> AppResult<Json<ApiResponse<VendorApplicationList>>> {
    let resp = vendor_service::list_applications(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendor/approve",
    request_body = VendorDecisionRequest,
    responses(
        (status = 200, description = "Application approved or rejected", body = ApiResponse<VendorApplication>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already reviewed")
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn decide(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VendorDecisionRequest>,
) -> AppResult<Json<ApiResponse<VendorApplication>>> {
    let resp = vendor_service::decide(&state, &user, payload).await?;
    Ok(Json(resp))
}
