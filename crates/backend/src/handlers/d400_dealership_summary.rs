use axum::{extract::Query, Json};
use contracts::dashboards::d400_dealership_summary::dto::{
    DealershipSummaryRequest, DealershipSummaryResponse,
};
use contracts::system::roles::Permission;

use crate::dashboards::d400_dealership_summary::service;
use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::{CurrentUser, RequirePermission};

/// GET /api/d400/summary?from&to
pub async fn get_summary(
    CurrentUser(claims): CurrentUser,
    Query(request): Query<DealershipSummaryRequest>,
) -> AppResult<Json<DealershipSummaryResponse>> {
    claims.require(Permission::DashboardRead)?;
    Ok(Json(service::get_summary(get_connection(), request).await?))
}
