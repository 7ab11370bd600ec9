use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use contracts::domain::a007_service_ticket::aggregate::{
    AddServicePartDto, AssignTicketDto, ChangeTicketStatusDto, CloseTicketDto, ServiceTicket,
    ServiceTicketDto, ServiceTicketListQuery, TicketClosedResponse,
};
use contracts::system::roles::Permission;

use crate::domain::{a007_service_ticket, parse_ref};
use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::{CurrentUser, RequirePermission};

/// GET /api/service-tickets
pub async fn list(
    CurrentUser(claims): CurrentUser,
    Query(query): Query<ServiceTicketListQuery>,
) -> AppResult<Json<Vec<ServiceTicket>>> {
    claims.require(Permission::ServiceRead)?;
    Ok(Json(
        a007_service_ticket::service::list(get_connection(), &query).await?,
    ))
}

/// GET /api/service-tickets/:id
pub async fn get_by_id(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ServiceTicket>> {
    claims.require(Permission::ServiceRead)?;
    let id = parse_ref("service ticket", &id)?;
    Ok(Json(
        a007_service_ticket::service::get_by_id(get_connection(), id).await?,
    ))
}

/// POST /api/service-tickets
pub async fn create(
    CurrentUser(claims): CurrentUser,
    Json(dto): Json<ServiceTicketDto>,
) -> AppResult<(StatusCode, Json<ServiceTicket>)> {
    claims.require(Permission::ServiceWrite)?;
    let ticket = a007_service_ticket::service::create(get_connection(), dto).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// PUT /api/service-tickets/:id
pub async fn update(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<ServiceTicketDto>,
) -> AppResult<Json<ServiceTicket>> {
    claims.require(Permission::ServiceWrite)?;
    let id = parse_ref("service ticket", &id)?;
    Ok(Json(
        a007_service_ticket::service::update(get_connection(), id, dto).await?,
    ))
}

/// POST /api/service-tickets/:id/assign
pub async fn assign(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<AssignTicketDto>,
) -> AppResult<Json<ServiceTicket>> {
    claims.require(Permission::ServiceWrite)?;
    let id = parse_ref("service ticket", &id)?;
    Ok(Json(
        a007_service_ticket::service::assign(get_connection(), id, &dto.technician_id).await?,
    ))
}

/// POST /api/service-tickets/:id/status
pub async fn change_status(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<ChangeTicketStatusDto>,
) -> AppResult<Json<ServiceTicket>> {
    claims.require(Permission::ServiceWrite)?;
    let id = parse_ref("service ticket", &id)?;
    Ok(Json(
        a007_service_ticket::service::change_status(get_connection(), id, dto.status, &claims)
            .await?,
    ))
}

/// POST /api/service-tickets/:id/parts
pub async fn add_part(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<AddServicePartDto>,
) -> AppResult<Json<ServiceTicket>> {
    claims.require(Permission::ServiceWrite)?;
    let id = parse_ref("service ticket", &id)?;
    Ok(Json(
        a007_service_ticket::service::add_part(get_connection(), id, dto).await?,
    ))
}

/// POST /api/service-tickets/:id/close
pub async fn close(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<CloseTicketDto>,
) -> AppResult<Json<TicketClosedResponse>> {
    claims.require(Permission::ServiceClose)?;
    let id = parse_ref("service ticket", &id)?;
    Ok(Json(
        a007_service_ticket::service::close(get_connection(), id, dto, Some(&claims.sub)).await?,
    ))
}
