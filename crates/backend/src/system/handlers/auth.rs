use axum::{extract::Json, http::StatusCode};
use contracts::system::auth::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, UserInfo};

use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::CurrentUser;
use crate::system::auth::session;

pub async fn login(Json(request): Json<LoginRequest>) -> AppResult<Json<LoginResponse>> {
    Ok(Json(session::login(get_connection(), request).await?))
}

pub async fn refresh(Json(request): Json<RefreshRequest>) -> AppResult<Json<RefreshResponse>> {
    Ok(Json(
        session::refresh(get_connection(), &request.refresh_token).await?,
    ))
}

pub async fn logout(Json(request): Json<RefreshRequest>) -> AppResult<StatusCode> {
    session::logout(get_connection(), &request.refresh_token).await?;
    Ok(StatusCode::OK)
}

/// Current user (protected by middleware)
pub async fn current_user(CurrentUser(claims): CurrentUser) -> AppResult<Json<UserInfo>> {
    Ok(Json(
        session::current_user(get_connection(), &claims.sub).await?,
    ))
}
