use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use contracts::domain::a001_lead::aggregate::{
    ChangeLeadStageDto, FollowUpQuery, Lead, LeadDto, LeadListQuery,
};
use contracts::system::roles::Permission;

use crate::domain::{a001_lead, parse_ref};
use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::{CurrentUser, RequirePermission};

/// GET /api/leads
pub async fn list(
    CurrentUser(claims): CurrentUser,
    Query(query): Query<LeadListQuery>,
) -> AppResult<Json<Vec<Lead>>> {
    claims.require(Permission::LeadsRead)?;
    Ok(Json(a001_lead::service::list(get_connection(), &query).await?))
}

/// GET /api/leads/follow-ups
pub async fn follow_ups(
    CurrentUser(claims): CurrentUser,
    Query(query): Query<FollowUpQuery>,
) -> AppResult<Json<Vec<Lead>>> {
    claims.require(Permission::LeadsRead)?;
    Ok(Json(
        a001_lead::service::follow_ups(get_connection(), query.due).await?,
    ))
}

/// GET /api/leads/:id
pub async fn get_by_id(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Lead>> {
    claims.require(Permission::LeadsRead)?;
    let id = parse_ref("lead", &id)?;
    Ok(Json(a001_lead::service::get_by_id(get_connection(), id).await?))
}

/// POST /api/leads
pub async fn create(
    CurrentUser(claims): CurrentUser,
    Json(dto): Json<LeadDto>,
) -> AppResult<(StatusCode, Json<Lead>)> {
    claims.require(Permission::LeadsWrite)?;
    let lead = a001_lead::service::create(get_connection(), dto).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

/// PUT /api/leads/:id
pub async fn update(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<LeadDto>,
) -> AppResult<Json<Lead>> {
    claims.require(Permission::LeadsWrite)?;
    let id = parse_ref("lead", &id)?;
    Ok(Json(a001_lead::service::update(get_connection(), id, dto).await?))
}

/// POST /api/leads/:id/stage
pub async fn change_stage(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<ChangeLeadStageDto>,
) -> AppResult<Json<Lead>> {
    claims.require(Permission::LeadsWrite)?;
    let id = parse_ref("lead", &id)?;
    Ok(Json(
        a001_lead::service::change_stage(get_connection(), id, dto).await?,
    ))
}

/// DELETE /api/leads/:id
pub async fn delete(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require(Permission::LeadsWrite)?;
    let id = parse_ref("lead", &id)?;
    a001_lead::service::delete(get_connection(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
