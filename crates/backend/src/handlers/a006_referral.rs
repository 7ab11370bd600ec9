use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use contracts::domain::a006_referral::aggregate::{
    CreateReferralDto, Referral, ReferralListQuery,
};
use contracts::system::roles::Permission;

use crate::domain::a006_referral;
use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::{CurrentUser, RequirePermission};

/// GET /api/referrals
pub async fn list(
    CurrentUser(claims): CurrentUser,
    Query(query): Query<ReferralListQuery>,
) -> AppResult<Json<Vec<Referral>>> {
    claims.require(Permission::ReferralsRead)?;
    Ok(Json(a006_referral::service::list(get_connection(), &query).await?))
}

/// POST /api/referrals
pub async fn create(
    CurrentUser(claims): CurrentUser,
    Json(dto): Json<CreateReferralDto>,
) -> AppResult<(StatusCode, Json<Referral>)> {
    claims.require(Permission::ReferralsWrite)?;
    let referral = a006_referral::service::create(get_connection(), dto).await?;
    Ok((StatusCode::CREATED, Json(referral)))
}

/// POST /api/referrals/:id/reward
pub async fn mark_rewarded(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Referral>> {
    claims.require(Permission::ReferralsWrite)?;
    Ok(Json(
        a006_referral::service::mark_rewarded(get_connection(), &id).await?,
    ))
}

/// POST /api/referrals/:id/cancel
pub async fn cancel(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Referral>> {
    claims.require(Permission::ReferralsWrite)?;
    Ok(Json(a006_referral::service::cancel(get_connection(), &id).await?))
}
