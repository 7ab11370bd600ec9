use contracts::domain::a007_service_ticket::aggregate::ServicePart;
use sea_orm::entity::prelude::*;
use sea_orm::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a007_service_part")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub ticket_id: String,
    pub item_id: String,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ServicePart {
    fn from(m: Model) -> Self {
        ServicePart {
            id: m.id,
            ticket_id: m.ticket_id,
            item_id: m.item_id,
            description: m.description,
            quantity: m.quantity,
            unit_price: m.unit_price,
            line_total: m.line_total,
        }
    }
}

pub async fn insert<C: ConnectionTrait>(conn: &C, part: &ServicePart) -> anyhow::Result<()> {
    ActiveModel {
        id: Set(part.id.clone()),
        ticket_id: Set(part.ticket_id.clone()),
        item_id: Set(part.item_id.clone()),
        description: Set(part.description.clone()),
        quantity: Set(part.quantity),
        unit_price: Set(part.unit_price),
        line_total: Set(part.line_total),
    }
    .insert(conn)
    .await?;
    Ok(())
}

pub async fn list_by_ticket<C: ConnectionTrait>(
    conn: &C,
    ticket_id: &str,
) -> anyhow::Result<Vec<ServicePart>> {
    Ok(Entity::find()
        .filter(Column::TicketId.eq(ticket_id))
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect())
}
