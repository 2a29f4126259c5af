use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{domain::role::ApplicationStatus, models::VendorApplication, routes::params::Pagination};

#[derive(Debug, Deserialize, ToSchema)]
pub struct VendorApplyRequest {
    pub shop_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VendorDecisionRequest {
    pub application_id: Uuid,
    pub approve: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplicationListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct VendorApplicationList {
    #[schema(value_type = Vec<VendorApplication>)]
    pub items: Vec<VendorApplication>,
}

impl ApplicationListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
