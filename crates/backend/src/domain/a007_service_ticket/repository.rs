use chrono::{DateTime, Utc};
use contracts::domain::a007_service_ticket::aggregate::{
    ServiceTicket, ServiceTicketId, ServiceTicketListQuery,
};
use contracts::domain::common::BaseAggregate;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, QueryOrder, Set};
use uuid::Uuid;

use crate::domain::{parse_column, parse_row_id, row_metadata};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a007_service_ticket")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub customer_id: String,
    pub vehicle_item_id: Option<String>,
    pub chassis_no: Option<String>,
    pub priority: String,
    pub status: String,
    pub assigned_technician_id: Option<String>,
    pub labour_charge: f64,
    pub estimated_cost: f64,
    pub parts_total: f64,
    pub final_amount: f64,
    pub covered_by_pass: bool,
    pub opened_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub is_posted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ServiceTicket {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = row_metadata(m.created_at, m.updated_at, m.is_deleted, m.is_posted, m.version);
        Ok(ServiceTicket {
            base: BaseAggregate::with_metadata(
                ServiceTicketId(parse_row_id(&m.id)?),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            customer_id: m.customer_id,
            vehicle_item_id: m.vehicle_item_id,
            chassis_no: m.chassis_no,
            priority: parse_column(&m.priority)?,
            status: parse_column(&m.status)?,
            assigned_technician_id: m.assigned_technician_id,
            labour_charge: m.labour_charge,
            estimated_cost: m.estimated_cost,
            parts_total: m.parts_total,
            final_amount: m.final_amount,
            covered_by_pass: m.covered_by_pass,
            opened_at: m.opened_at,
            completed_at: m.completed_at,
            closed_at: m.closed_at,
            parts: Vec::new(),
        })
    }
}

fn to_active(t: &ServiceTicket) -> ActiveModel {
    ActiveModel {
        id: Set(t.base.id.value().to_string()),
        code: Set(t.base.code.clone()),
        description: Set(t.base.description.clone()),
        comment: Set(t.base.comment.clone()),
        customer_id: Set(t.customer_id.clone()),
        vehicle_item_id: Set(t.vehicle_item_id.clone()),
        chassis_no: Set(t.chassis_no.clone()),
        priority: Set(t.priority.as_str().to_string()),
        status: Set(t.status.as_str().to_string()),
        assigned_technician_id: Set(t.assigned_technician_id.clone()),
        labour_charge: Set(t.labour_charge),
        estimated_cost: Set(t.estimated_cost),
        parts_total: Set(t.parts_total),
        final_amount: Set(t.final_amount),
        covered_by_pass: Set(t.covered_by_pass),
        opened_at: Set(t.opened_at),
        completed_at: Set(t.completed_at),
        closed_at: Set(t.closed_at),
        is_deleted: Set(t.base.metadata.is_deleted),
        is_posted: Set(t.base.metadata.is_posted),
        created_at: Set(Some(t.base.metadata.created_at)),
        updated_at: Set(Some(t.base.metadata.updated_at)),
        version: Set(t.base.metadata.version),
    }
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    query: &ServiceTicketListQuery,
) -> anyhow::Result<Vec<ServiceTicket>> {
    let mut select = Entity::find().filter(Column::IsDeleted.eq(false));
    if let Some(status) = query.status {
        select = select.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(technician_id) = &query.technician_id {
        select = select.filter(Column::AssignedTechnicianId.eq(technician_id.as_str()));
    }
    if let Some(customer_id) = &query.customer_id {
        select = select.filter(Column::CustomerId.eq(customer_id.as_str()));
    }
    select
        .order_by_desc(Column::OpenedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(ServiceTicket::try_from)
        .collect()
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> anyhow::Result<Option<ServiceTicket>> {
    Entity::find_by_id(id.to_string())
        .one(conn)
        .await?
        .map(ServiceTicket::try_from)
        .transpose()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, ticket: &ServiceTicket) -> anyhow::Result<Uuid> {
    to_active(ticket).insert(conn).await?;
    Ok(ticket.base.id.value())
}

pub async fn update<C: ConnectionTrait>(conn: &C, ticket: &ServiceTicket) -> anyhow::Result<()> {
    let mut active = to_active(ticket);
    active.created_at = NotSet;
    active.opened_at = NotSet;
    active.update(conn).await?;
    Ok(())
}
