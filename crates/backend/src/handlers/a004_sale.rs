use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use contracts::domain::a004_sale::aggregate::{
    CreateSaleDto, Sale, SaleCreatedResponse, SaleDetails, SaleListQuery,
};
use contracts::domain::a005_payment::aggregate::RecordPaymentDto;
use contracts::system::roles::Permission;

use crate::domain::{a004_sale, parse_ref};
use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::{CurrentUser, RequirePermission};

/// GET /api/sales
pub async fn list(
    CurrentUser(claims): CurrentUser,
    Query(query): Query<SaleListQuery>,
) -> AppResult<Json<Vec<Sale>>> {
    claims.require(Permission::SalesRead)?;
    Ok(Json(a004_sale::service::list(get_connection(), &query).await?))
}

/// GET /api/sales/:id
pub async fn get_by_id(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<SaleDetails>> {
    claims.require(Permission::SalesRead)?;
    let id = parse_ref("sale", &id)?;
    Ok(Json(a004_sale::service::get_details(get_connection(), id).await?))
}

/// POST /api/sales
pub async fn create(
    CurrentUser(claims): CurrentUser,
    Json(dto): Json<CreateSaleDto>,
) -> AppResult<(StatusCode, Json<SaleCreatedResponse>)> {
    claims.require(Permission::SalesCreate)?;
    let created = a004_sale::service::create_sale(get_connection(), dto, Some(&claims.sub)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/sales/:id/payments
pub async fn record_payment(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<RecordPaymentDto>,
) -> AppResult<Json<SaleDetails>> {
    claims.require(Permission::PaymentsWrite)?;
    let id = parse_ref("sale", &id)?;
    Ok(Json(
        a004_sale::service::record_payment(get_connection(), id, dto, Some(&claims.sub)).await?,
    ))
}
