use contracts::domain::a004_sale::aggregate::SaleLine;
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a004_sale_line")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub sale_id: String,
    pub item_id: String,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SaleLine {
    fn from(m: Model) -> Self {
        SaleLine {
            id: m.id,
            sale_id: m.sale_id,
            item_id: m.item_id,
            description: m.description,
            quantity: m.quantity,
            unit_price: m.unit_price,
            line_total: m.line_total,
        }
    }
}

pub async fn insert<C: ConnectionTrait>(conn: &C, line: &SaleLine) -> anyhow::Result<()> {
    ActiveModel {
        id: Set(line.id.clone()),
        sale_id: Set(line.sale_id.clone()),
        item_id: Set(line.item_id.clone()),
        description: Set(line.description.clone()),
        quantity: Set(line.quantity),
        unit_price: Set(line.unit_price),
        line_total: Set(line.line_total),
    }
    .insert(conn)
    .await?;
    Ok(())
}

pub async fn list_by_sale<C: ConnectionTrait>(conn: &C, sale_id: &str) -> anyhow::Result<Vec<SaleLine>> {
    let models = Entity::find()
        .filter(Column::SaleId.eq(sale_id))
        .order_by_desc(Column::UnitPrice)
        .all(conn)
        .await?;
    Ok(models.into_iter().map(Into::into).collect())
}
