use axum::{
    extract::{Json, Path},
    http::StatusCode,
};
use contracts::system::users::{ChangePasswordDto, CreateUserDto, UpdateUserDto, User};

use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::CurrentUser;
use crate::system::users::service;

/// List all users (admin only)
pub async fn list(CurrentUser(_claims): CurrentUser) -> AppResult<Json<Vec<User>>> {
    Ok(Json(service::list_all(get_connection()).await?))
}

pub async fn get_by_id(
    CurrentUser(_claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    Ok(Json(service::get_by_id(get_connection(), &id).await?))
}

pub async fn create(
    CurrentUser(claims): CurrentUser,
    Json(dto): Json<CreateUserDto>,
) -> AppResult<Json<serde_json::Value>> {
    let user_id = service::create(get_connection(), dto, Some(claims.sub)).await?;
    Ok(Json(serde_json::json!({ "id": user_id })))
}

pub async fn update(
    CurrentUser(_claims): CurrentUser,
    Path(id): Path<String>,
    Json(mut dto): Json<UpdateUserDto>,
) -> AppResult<StatusCode> {
    dto.id = id;
    service::update(get_connection(), dto).await?;
    Ok(StatusCode::OK)
}

pub async fn delete(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    service::delete(get_connection(), &id, &claims.sub).await?;
    Ok(StatusCode::OK)
}

/// Any authenticated user; the service decides whose password may change
pub async fn change_password(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(mut dto): Json<ChangePasswordDto>,
) -> AppResult<StatusCode> {
    dto.user_id = id;
    service::change_password(get_connection(), dto, &claims.sub).await?;
    Ok(StatusCode::OK)
}
