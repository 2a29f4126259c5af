use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::role::{ApplicationStatus, Role},
    dto::vendor::{
        ApplicationListQuery, VendorApplicationList, VendorApplyRequest, VendorDecisionRequest,
    },
    entity::{
        users::{self, Entity as Users},
        vendor_applications::{ActiveModel, Column, Entity as VendorApplications},
    },
    error::{AppError, AppResult},
    i18n::Message,
    middleware::auth::{AuthUser, ensure_admin, ensure_role},
    models::VendorApplication,
    notifications::NotificationKind,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn apply(
    state: &AppState,
    user: &AuthUser,
    payload: VendorApplyRequest,
) -> AppResult<ApiResponse<VendorApplication>> {
    ensure_role(user, &[Role::Customer])?;
    let shop_name = payload.shop_name.trim().to_string();
    if shop_name.is_empty() {
        return Err(AppError::BadRequest("shop_name is required".into()));
    }

    let pending = VendorApplications::find()
        .filter(
            Condition::all()
                .add(Column::UserId.eq(user.user_id))
                .add(Column::Status.eq(ApplicationStatus::Pending)),
        )
        .count(&state.orm)
        .await?;
    if pending > 0 {
        return Err(AppError::Conflict(
            "an application is already pending".into(),
        ));
    }

    let application = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        shop_name: Set(shop_name),
        description: Set(payload.description.filter(|d| !d.trim().is_empty())),
        status: Set(ApplicationStatus::Pending),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        Some(user.user_id),
        "vendor_apply",
        "vendor_applications",
        serde_json::json!({ "application_id": application.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Application submitted",
        VendorApplication::from(application),
        Some(Meta::empty()),
    ))
}

pub async fn list_applications(
    state: &AppState,
    user: &AuthUser,
    query: ApplicationListQuery,
) -> AppResult<ApiResponse<VendorApplicationList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = VendorApplications::find().order_by_desc(Column::CreatedAt);
    if let Some(status) = query.status {
        finder = finder.filter(Column::Status.eq(status));
    }
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(VendorApplication::from)
        .collect();

    Ok(ApiResponse::success(
        "Applications",
        VendorApplicationList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn decide(
    state: &AppState,
    user: &AuthUser,
    payload: VendorDecisionRequest,
) -> AppResult<ApiResponse<VendorApplication>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let application = VendorApplications::find_by_id(payload.application_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if application.status != ApplicationStatus::Pending {
        return Err(AppError::Conflict("application was already reviewed".into()));
    }

    let status = if payload.approve {
        ApplicationStatus::Approved
    } else {
        ApplicationStatus::Rejected
    };
    let mut active: ActiveModel = application.into();
    active.status = Set(status);
    active.reviewed_by = Set(Some(user.user_id));
    active.reviewed_at = Set(Some(Utc::now().into()));
    let application = active.update(&txn).await?;

    if payload.approve {
        let applicant = Users::find_by_id(application.user_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        // Staff keep their role.
        if applicant.role == Role::Customer {
            let mut applicant: users::ActiveModel = applicant.into();
            applicant.role = Set(Role::Vendor);
            applicant.update(&txn).await?;
        }
    }
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        if payload.approve { "vendor_approve" } else { "vendor_reject" },
        "vendor_applications",
        serde_json::json!({
            "application_id": application.id,
            "user_id": application.user_id,
        }),
    )
    .await;

    let (kind, message) = if payload.approve {
        (
            NotificationKind::Success,
            Message::VendorApproved {
                shop_name: application.shop_name.clone(),
            },
        )
    } else {
        (
            NotificationKind::Info,
            Message::VendorRejected {
                shop_name: application.shop_name.clone(),
            },
        )
    };
    state
        .notifications
        .push(application.user_id, kind, message, None)
        .await;

    Ok(ApiResponse::success(
        "Application reviewed",
        VendorApplication::from(application),
        Some(Meta::empty()),
    ))
}
