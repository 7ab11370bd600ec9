use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use contracts::domain::a002_customer::aggregate::{
    Customer, CustomerDto, CustomerSearchQuery, PassRefreshResult, RenewUptimePassDto,
};
use contracts::system::roles::Permission;

use crate::domain::{a002_customer, parse_ref};
use crate::shared::config;
use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::{CurrentUser, RequirePermission};

/// GET /api/customers
pub async fn list(CurrentUser(claims): CurrentUser) -> AppResult<Json<Vec<Customer>>> {
    claims.require(Permission::CustomersRead)?;
    Ok(Json(a002_customer::service::list_all(get_connection()).await?))
}

/// GET /api/customers/search?phone=
pub async fn search(
    CurrentUser(claims): CurrentUser,
    Query(query): Query<CustomerSearchQuery>,
) -> AppResult<Json<Vec<Customer>>> {
    claims.require(Permission::CustomersRead)?;
    Ok(Json(
        a002_customer::service::search_by_phone(get_connection(), &query.phone).await?,
    ))
}

/// GET /api/customers/:id
pub async fn get_by_id(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Customer>> {
    claims.require(Permission::CustomersRead)?;
    let id = parse_ref("customer", &id)?;
    Ok(Json(a002_customer::service::get_by_id(get_connection(), id).await?))
}

/// POST /api/customers
pub async fn create(
    CurrentUser(claims): CurrentUser,
    Json(dto): Json<CustomerDto>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    claims.require(Permission::CustomersWrite)?;
    let customer = a002_customer::service::create(get_connection(), dto).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// PUT /api/customers/:id
pub async fn update(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<CustomerDto>,
) -> AppResult<Json<Customer>> {
    claims.require(Permission::CustomersWrite)?;
    let id = parse_ref("customer", &id)?;
    Ok(Json(
        a002_customer::service::update(get_connection(), id, dto).await?,
    ))
}

/// DELETE /api/customers/:id
pub async fn delete(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require(Permission::CustomersWrite)?;
    let id = parse_ref("customer", &id)?;
    a002_customer::service::delete(get_connection(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/customers/:id/uptime-pass
pub async fn renew_uptime_pass(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<RenewUptimePassDto>,
) -> AppResult<Json<Customer>> {
    claims.require(Permission::CustomersWrite)?;
    let id = parse_ref("customer", &id)?;
    Ok(Json(
        a002_customer::service::renew_uptime_pass(get_connection(), id, dto).await?,
    ))
}

/// POST /api/customers/uptime-pass/refresh
pub async fn refresh_passes(CurrentUser(claims): CurrentUser) -> AppResult<Json<PassRefreshResult>> {
    claims.require(Permission::CustomersWrite)?;
    let today = config::today();
    Ok(Json(
        a002_customer::service::refresh_expired_passes(get_connection(), today).await?,
    ))
}
