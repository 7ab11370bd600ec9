use chrono::Utc;
use contracts::domain::a003_inventory_item::aggregate::{
    InventoryItem, InventoryItemId, InventoryListQuery, ItemKind,
};
use contracts::domain::common::BaseAggregate;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::NotSet, QueryOrder, Set};
use uuid::Uuid;

use crate::domain::{parse_column, parse_row_id, row_metadata};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a003_inventory_item")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub kind: String,
    pub variant: Option<String>,
    pub color: Option<String>,
    pub chassis_no: Option<String>,
    pub motor_no: Option<String>,
    pub battery_no: Option<String>,
    pub quantity: i32,
    pub low_stock_threshold: i32,
    pub purchase_price: f64,
    pub selling_price: f64,
    pub status: String,
    pub is_deleted: bool,
    pub is_posted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for InventoryItem {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = row_metadata(m.created_at, m.updated_at, m.is_deleted, m.is_posted, m.version);
        Ok(InventoryItem {
            base: BaseAggregate::with_metadata(
                InventoryItemId(parse_row_id(&m.id)?),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            kind: parse_column(&m.kind)?,
            variant: m.variant,
            color: m.color,
            chassis_no: m.chassis_no,
            motor_no: m.motor_no,
            battery_no: m.battery_no,
            quantity: m.quantity,
            low_stock_threshold: m.low_stock_threshold,
            purchase_price: m.purchase_price,
            selling_price: m.selling_price,
            status: parse_column(&m.status)?,
        })
    }
}

fn to_active(item: &InventoryItem) -> ActiveModel {
    ActiveModel {
        id: Set(item.base.id.value().to_string()),
        code: Set(item.base.code.clone()),
        description: Set(item.base.description.clone()),
        comment: Set(item.base.comment.clone()),
        kind: Set(item.kind.as_str().to_string()),
        variant: Set(item.variant.clone()),
        color: Set(item.color.clone()),
        chassis_no: Set(item.chassis_no.clone()),
        motor_no: Set(item.motor_no.clone()),
        battery_no: Set(item.battery_no.clone()),
        quantity: Set(item.quantity),
        low_stock_threshold: Set(item.low_stock_threshold),
        purchase_price: Set(item.purchase_price),
        selling_price: Set(item.selling_price),
        status: Set(item.status.as_str().to_string()),
        is_deleted: Set(item.base.metadata.is_deleted),
        is_posted: Set(item.base.metadata.is_posted),
        created_at: Set(Some(item.base.metadata.created_at)),
        updated_at: Set(Some(item.base.metadata.updated_at)),
        version: Set(item.base.metadata.version),
    }
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    query: &InventoryListQuery,
) -> anyhow::Result<Vec<InventoryItem>> {
    let mut select = Entity::find().filter(Column::IsDeleted.eq(false));
    if let Some(kind) = query.kind {
        select = select.filter(Column::Kind.eq(kind.as_str()));
    }
    if let Some(status) = query.status {
        select = select.filter(Column::Status.eq(status.as_str()));
    }
    select
        .order_by_asc(Column::Kind)
        .order_by_asc(Column::Code)
        .all(conn)
        .await?
        .into_iter()
        .map(InventoryItem::try_from)
        .collect()
}

/// Accessories and spare parts at or below their threshold
pub async fn list_low_stock<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<InventoryItem>> {
    Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::Kind.ne(ItemKind::Vehicle.as_str()))
        .filter(Expr::col(Column::Quantity).lte(Expr::col(Column::LowStockThreshold)))
        .order_by_asc(Column::Quantity)
        .all(conn)
        .await?
        .into_iter()
        .map(InventoryItem::try_from)
        .collect()
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> anyhow::Result<Option<InventoryItem>> {
    Entity::find_by_id(id.to_string())
        .one(conn)
        .await?
        .map(InventoryItem::try_from)
        .transpose()
}

pub async fn get_by_code<C: ConnectionTrait>(conn: &C, sku: &str) -> anyhow::Result<Option<InventoryItem>> {
    Entity::find()
        .filter(Column::Code.eq(sku))
        .filter(Column::IsDeleted.eq(false))
        .one(conn)
        .await?
        .map(InventoryItem::try_from)
        .transpose()
}

pub async fn find_vehicle_by_chassis<C: ConnectionTrait>(
    conn: &C,
    chassis_no: &str,
) -> anyhow::Result<Option<InventoryItem>> {
    Entity::find()
        .filter(Column::ChassisNo.eq(chassis_no))
        .filter(Column::Kind.eq(ItemKind::Vehicle.as_str()))
        .filter(Column::IsDeleted.eq(false))
        .one(conn)
        .await?
        .map(InventoryItem::try_from)
        .transpose()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, item: &InventoryItem) -> anyhow::Result<Uuid> {
    to_active(item).insert(conn).await?;
    Ok(item.base.id.value())
}

pub async fn update<C: ConnectionTrait>(conn: &C, item: &InventoryItem) -> anyhow::Result<()> {
    let mut active = to_active(item);
    active.created_at = NotSet;
    active.update(conn).await?;
    Ok(())
}

pub async fn soft_delete<C: ConnectionTrait>(conn: &C, id: Uuid) -> anyhow::Result<bool> {
    let result = Entity::update_many()
        .col_expr(Column::IsDeleted, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id.to_string()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}
