use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use contracts::domain::a005_payment::aggregate::{Payment, PaymentListQuery};
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, Set};

use crate::domain::parse_column;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a005_payment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub sale_id: Option<String>,
    pub service_ticket_id: Option<String>,
    pub customer_id: String,
    pub mode: String,
    pub amount: f64,
    pub reference: Option<String>,
    pub finance_provider: Option<String>,
    pub received_by: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Payment {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: m.id,
            sale_id: m.sale_id,
            service_ticket_id: m.service_ticket_id,
            customer_id: m.customer_id,
            mode: parse_column(&m.mode)?,
            amount: m.amount,
            reference: m.reference,
            finance_provider: m.finance_provider,
            received_by: m.received_by,
            paid_at: m.paid_at,
        })
    }
}

/// Start of `day` in UTC
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN))
}

pub async fn insert<C: ConnectionTrait>(conn: &C, payment: &Payment) -> anyhow::Result<()> {
    ActiveModel {
        id: Set(payment.id.clone()),
        sale_id: Set(payment.sale_id.clone()),
        service_ticket_id: Set(payment.service_ticket_id.clone()),
        customer_id: Set(payment.customer_id.clone()),
        mode: Set(payment.mode.as_str().to_string()),
        amount: Set(payment.amount),
        reference: Set(payment.reference.clone()),
        finance_provider: Set(payment.finance_provider.clone()),
        received_by: Set(payment.received_by.clone()),
        paid_at: Set(payment.paid_at),
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Date bounds are inclusive calendar days (UTC)
pub async fn list<C: ConnectionTrait>(conn: &C, query: &PaymentListQuery) -> anyhow::Result<Vec<Payment>> {
    let mut select = Entity::find();
    if let Some(sale_id) = &query.sale_id {
        select = select.filter(Column::SaleId.eq(sale_id.as_str()));
    }
    if let Some(ticket_id) = &query.service_ticket_id {
        select = select.filter(Column::ServiceTicketId.eq(ticket_id.as_str()));
    }
    if let Some(customer_id) = &query.customer_id {
        select = select.filter(Column::CustomerId.eq(customer_id.as_str()));
    }
    if let Some(from) = query.from {
        select = select.filter(Column::PaidAt.gte(day_start(from)));
    }
    if let Some(to) = query.to.and_then(|d| d.succ_opt()) {
        select = select.filter(Column::PaidAt.lt(day_start(to)));
    }
    select
        .order_by_asc(Column::PaidAt)
        .all(conn)
        .await?
        .into_iter()
        .map(Payment::try_from)
        .collect()
}

pub async fn list_by_sale<C: ConnectionTrait>(conn: &C, sale_id: &str) -> anyhow::Result<Vec<Payment>> {
    list(
        conn,
        &PaymentListQuery {
            sale_id: Some(sale_id.to_string()),
            ..Default::default()
        },
    )
    .await
}
