use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    i18n::Locale,
    middleware::auth::AuthUser,
    notifications::NotificationView,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/{id}", delete(dismiss_notification))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(("lang" = Option<String>, Query, description = "es or en")),
    responses(
        (status = 200, description = "Live notifications, oldest first", body = ApiResponse<Vec<NotificationView>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    locale: Locale,
) -> AppResult<Json<ApiResponse<Vec<NotificationView>>>> {
    let items: Vec<NotificationView> = state
        .notifications
        .active(user.user_id, Utc::now())
        .await
        .iter()
        .map(|n| NotificationView::render(n, locale))
        .collect();
    Ok(Json(ApiResponse::success(
        "Notifications",
        items,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Dismissed"),
        (status = 404, description = "Not Found or already expired")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn dismiss_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    if !state.notifications.dismiss(user.user_id, id).await {
        return Err(AppError::NotFound);
    }
    Ok(Json(ApiResponse::success(
        "Dismissed",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}
