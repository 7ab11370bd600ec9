use axum::{extract::Query, Json};
use contracts::domain::a005_payment::aggregate::{
    Payment, PaymentListQuery, PaymentSummary, PaymentSummaryQuery,
};
use contracts::system::roles::Permission;

use crate::domain::a005_payment;
use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::{CurrentUser, RequirePermission};

/// GET /api/payments
pub async fn list(
    CurrentUser(claims): CurrentUser,
    Query(query): Query<PaymentListQuery>,
) -> AppResult<Json<Vec<Payment>>> {
    claims.require(Permission::PaymentsRead)?;
    Ok(Json(a005_payment::service::list(get_connection(), &query).await?))
}

/// GET /api/payments/summary?from&to
pub async fn summary(
    CurrentUser(claims): CurrentUser,
    Query(query): Query<PaymentSummaryQuery>,
) -> AppResult<Json<PaymentSummary>> {
    claims.require(Permission::PaymentsRead)?;
    Ok(Json(a005_payment::service::summary(get_connection(), query).await?))
}
