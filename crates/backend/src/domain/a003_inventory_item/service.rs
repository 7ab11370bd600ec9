use contracts::domain::a003_inventory_item::aggregate::{
    InventoryItem, InventoryItemDto, InventoryListQuery, ItemKind, ReceiveStockDto, StockStatus,
};
use contracts::domain::common::AggregateRoot;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use uuid::Uuid;

use super::repository;
use crate::domain::parse_ref;
use crate::shared::error::{AppError, AppResult};

pub async fn list(db: &DatabaseConnection, query: &InventoryListQuery) -> AppResult<Vec<InventoryItem>> {
    Ok(repository::list(db, query).await?)
}

pub async fn list_low_stock(db: &DatabaseConnection) -> AppResult<Vec<InventoryItem>> {
    Ok(repository::list_low_stock(db).await?)
}

pub async fn get_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<InventoryItem> {
    load(db, id).await
}

pub(crate) async fn load<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<InventoryItem> {
    repository::get_by_id(conn, id)
        .await?
        .filter(|item| !item.base.metadata.is_deleted)
        .ok_or_else(|| AppError::not_found(InventoryItem::element_name(), id))
}

/// Resolve an item id coming from a request body
pub(crate) async fn load_ref<C: ConnectionTrait>(conn: &C, item_id: &str) -> AppResult<InventoryItem> {
    load(conn, parse_ref("item", item_id)?).await
}

async fn ensure_unique<C: ConnectionTrait>(conn: &C, item: &InventoryItem) -> AppResult<()> {
    let id = item.base.id;
    if let Some(other) = repository::get_by_code(conn, &item.base.code).await? {
        if other.base.id != id {
            return Err(AppError::Conflict(format!("SKU {} already exists", item.base.code)));
        }
    }
    if let (ItemKind::Vehicle, Some(chassis)) = (item.kind, item.chassis_no.as_deref()) {
        if let Some(other) = repository::find_vehicle_by_chassis(conn, chassis).await? {
            if other.base.id != id {
                return Err(AppError::Conflict(format!(
                    "Chassis {} is already registered as {}",
                    chassis, other.base.code
                )));
            }
        }
    }
    Ok(())
}

pub async fn create(db: &DatabaseConnection, dto: InventoryItemDto) -> AppResult<InventoryItem> {
    let mut item = InventoryItem::new_for_insert(&dto);
    if let Some(status) = dto.status {
        if status == StockStatus::Reserved && item.kind == ItemKind::Vehicle {
            item.status = status;
        }
    }
    item.validate().map_err(AppError::Validation)?;
    ensure_unique(db, &item).await?;
    repository::insert(db, &item).await?;
    tracing::info!("Inventory item {} ({}) added", item.base.code, item.kind);
    Ok(item)
}

pub async fn update(db: &DatabaseConnection, id: Uuid, dto: InventoryItemDto) -> AppResult<InventoryItem> {
    let mut item = load(db, id).await?;
    item.update(&dto).map_err(AppError::Conflict)?;
    item.validate().map_err(AppError::Validation)?;
    ensure_unique(db, &item).await?;
    item.before_write();
    repository::update(db, &item).await?;
    Ok(item)
}

/// Sold vehicles stay on record for the sale that references them
pub async fn delete(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
    let item = load(db, id).await?;
    if item.status == StockStatus::Sold {
        return Err(AppError::Conflict(format!(
            "Item {} is sold and cannot be deleted",
            item.base.code
        )));
    }
    repository::soft_delete(db, id).await?;
    Ok(())
}

pub async fn receive(db: &DatabaseConnection, id: Uuid, dto: ReceiveStockDto) -> AppResult<InventoryItem> {
    let mut item = load(db, id).await?;
    item.receive(dto.quantity).map_err(AppError::Validation)?;
    item.before_write();
    repository::update(db, &item).await?;
    tracing::info!(
        "Received {} x {} (now {})",
        dto.quantity,
        item.base.code,
        item.quantity
    );
    Ok(item)
}

/// Take stock out inside a closing transaction. Shortfalls are conflicts.
pub(crate) async fn deduct<C: ConnectionTrait>(
    conn: &C,
    item_id: &str,
    quantity: i32,
) -> AppResult<InventoryItem> {
    let mut item = load_ref(conn, item_id).await?;
    item.deduct(quantity).map_err(AppError::Conflict)?;
    item.before_write();
    repository::update(conn, &item).await?;
    if item.is_low_stock() {
        tracing::warn!(
            "{} is low on stock: {} left (threshold {})",
            item.base.code,
            item.quantity,
            item.low_stock_threshold
        );
    }
    Ok(item)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;

    pub(crate) async fn add_vehicle(db: &DatabaseConnection, sku: &str, price: f64) -> InventoryItem {
        create(
            db,
            InventoryItemDto {
                id: None,
                sku: sku.into(),
                model: "Volt S1".into(),
                kind: ItemKind::Vehicle,
                variant: Some("Pro".into()),
                color: Some("Red".into()),
                chassis_no: Some(format!("CH-{}", sku)),
                motor_no: None,
                battery_no: None,
                quantity: None,
                low_stock_threshold: None,
                purchase_price: price * 0.8,
                selling_price: price,
                status: None,
                comment: None,
            },
        )
        .await
        .unwrap()
    }

    pub(crate) async fn add_stock(
        db: &DatabaseConnection,
        sku: &str,
        kind: ItemKind,
        quantity: i32,
        price: f64,
    ) -> InventoryItem {
        create(
            db,
            InventoryItemDto {
                id: None,
                sku: sku.into(),
                model: format!("Part {}", sku),
                kind,
                variant: None,
                color: None,
                chassis_no: None,
                motor_no: None,
                battery_no: None,
                quantity: Some(quantity),
                low_stock_threshold: Some(2),
                purchase_price: price / 2.0,
                selling_price: price,
                status: None,
                comment: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_sku_and_chassis_are_conflicts() {
        let db = connect_in_memory().await.unwrap();
        let vehicle = add_vehicle(&db, "V-001", 95000.0).await;
        assert_eq!(vehicle.quantity, 1);

        let mut dto = InventoryItemDto {
            id: None,
            sku: "V-002".into(),
            model: "Volt S1".into(),
            kind: ItemKind::Vehicle,
            variant: None,
            color: None,
            chassis_no: vehicle.chassis_no.clone(),
            motor_no: None,
            battery_no: None,
            quantity: None,
            low_stock_threshold: None,
            purchase_price: 0.0,
            selling_price: 0.0,
            status: None,
            comment: None,
        };
        assert!(matches!(create(&db, dto.clone()).await, Err(AppError::Conflict(_))));
        dto.sku = "V-001".into();
        dto.chassis_no = Some("CH-OTHER".into());
        assert!(matches!(create(&db, dto).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn deduct_and_receive_track_quantities() {
        let db = connect_in_memory().await.unwrap();
        let helmet = add_stock(&db, "ACC-HELMET", ItemKind::Accessory, 3, 1500.0).await;
        let id = helmet.base.id.value().to_string();

        let after = deduct(&db, &id, 2).await.unwrap();
        assert_eq!(after.quantity, 1);
        assert!(matches!(deduct(&db, &id, 2).await, Err(AppError::Conflict(_))));

        let low = list_low_stock(&db).await.unwrap();
        assert_eq!(low.len(), 1);

        let received = receive(&db, helmet.base.id.value(), ReceiveStockDto { quantity: 5 })
            .await
            .unwrap();
        assert_eq!(received.quantity, 6);
        assert!(list_low_stock(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sold_vehicle_cannot_be_deleted_or_sold_twice() {
        let db = connect_in_memory().await.unwrap();
        let vehicle = add_vehicle(&db, "V-001", 95000.0).await;
        let id = vehicle.base.id.value();

        let sold = deduct(&db, &id.to_string(), 1).await.unwrap();
        assert_eq!(sold.status, StockStatus::Sold);
        assert_eq!(sold.quantity, 0);
        assert!(matches!(deduct(&db, &id.to_string(), 1).await, Err(AppError::Conflict(_))));
        assert!(matches!(delete(&db, id).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn list_filters_by_kind() {
        let db = connect_in_memory().await.unwrap();
        add_vehicle(&db, "V-001", 95000.0).await;
        add_stock(&db, "SP-BRAKE", ItemKind::SparePart, 10, 400.0).await;
        let parts = list(
            &db,
            &InventoryListQuery {
                kind: Some(ItemKind::SparePart),
                status: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].base.code, "SP-BRAKE");
    }
}
