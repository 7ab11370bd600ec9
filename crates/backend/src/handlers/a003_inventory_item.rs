use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use contracts::domain::a003_inventory_item::aggregate::{
    InventoryItem, InventoryItemDto, InventoryListQuery, ReceiveStockDto,
};
use contracts::system::roles::Permission;

use crate::domain::{a003_inventory_item, parse_ref};
use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::{CurrentUser, RequirePermission};

/// GET /api/inventory
pub async fn list(
    CurrentUser(claims): CurrentUser,
    Query(query): Query<InventoryListQuery>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    claims.require(Permission::InventoryRead)?;
    Ok(Json(
        a003_inventory_item::service::list(get_connection(), &query).await?,
    ))
}

/// GET /api/inventory/low-stock
pub async fn low_stock(CurrentUser(claims): CurrentUser) -> AppResult<Json<Vec<InventoryItem>>> {
    claims.require(Permission::InventoryRead)?;
    Ok(Json(
        a003_inventory_item::service::list_low_stock(get_connection()).await?,
    ))
}

/// GET /api/inventory/:id
pub async fn get_by_id(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<InventoryItem>> {
    claims.require(Permission::InventoryRead)?;
    let id = parse_ref("inventory item", &id)?;
    Ok(Json(
        a003_inventory_item::service::get_by_id(get_connection(), id).await?,
    ))
}

/// POST /api/inventory
pub async fn create(
    CurrentUser(claims): CurrentUser,
    Json(dto): Json<InventoryItemDto>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    claims.require(Permission::InventoryWrite)?;
    let item = a003_inventory_item::service::create(get_connection(), dto).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/inventory/:id
pub async fn update(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<InventoryItemDto>,
) -> AppResult<Json<InventoryItem>> {
    claims.require(Permission::InventoryWrite)?;
    let id = parse_ref("inventory item", &id)?;
    Ok(Json(
        a003_inventory_item::service::update(get_connection(), id, dto).await?,
    ))
}

/// DELETE /api/inventory/:id
pub async fn delete(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require(Permission::InventoryWrite)?;
    let id = parse_ref("inventory item", &id)?;
    a003_inventory_item::service::delete(get_connection(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/inventory/:id/receive
pub async fn receive(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(dto): Json<ReceiveStockDto>,
) -> AppResult<Json<InventoryItem>> {
    claims.require(Permission::InventoryWrite)?;
    let id = parse_ref("inventory item", &id)?;
    Ok(Json(
        a003_inventory_item::service::receive(get_connection(), id, dto).await?,
    ))
}
