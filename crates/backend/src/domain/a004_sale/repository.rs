use chrono::NaiveDate;
use contracts::domain::a004_sale::aggregate::{Sale, SaleId, SaleListQuery};
use contracts::domain::common::BaseAggregate;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, QueryOrder, Set};
use uuid::Uuid;

use crate::domain::{parse_row_id, row_metadata};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a004_sale")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub lead_id: Option<String>,
    pub customer_id: String,
    pub vehicle_id: String,
    pub sale_date: NaiveDate,
    pub vehicle_price: f64,
    pub accessories_total: f64,
    pub subtotal: f64,
    pub discount: f64,
    pub total_amount: f64,
    pub cash_amount: f64,
    pub upi_amount: f64,
    pub finance_amount: f64,
    pub finance_provider: Option<String>,
    pub amount_paid: f64,
    pub balance_due: f64,
    pub uptime_pass: bool,
    pub referral_id: Option<String>,
    pub sold_by: Option<String>,
    pub is_deleted: bool,
    pub is_posted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Header only; lines are attached by the service
impl TryFrom<Model> for Sale {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = row_metadata(m.created_at, m.updated_at, m.is_deleted, m.is_posted, m.version);
        Ok(Sale {
            base: BaseAggregate::with_metadata(
                SaleId(parse_row_id(&m.id)?),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            lead_id: m.lead_id,
            customer_id: m.customer_id,
            vehicle_id: m.vehicle_id,
            sale_date: m.sale_date,
            vehicle_price: m.vehicle_price,
            accessories_total: m.accessories_total,
            subtotal: m.subtotal,
            discount: m.discount,
            total_amount: m.total_amount,
            cash_amount: m.cash_amount,
            upi_amount: m.upi_amount,
            finance_amount: m.finance_amount,
            finance_provider: m.finance_provider,
            amount_paid: m.amount_paid,
            balance_due: m.balance_due,
            uptime_pass: m.uptime_pass,
            referral_id: m.referral_id,
            sold_by: m.sold_by,
            lines: Vec::new(),
        })
    }
}

fn to_active(s: &Sale) -> ActiveModel {
    ActiveModel {
        id: Set(s.base.id.value().to_string()),
        code: Set(s.base.code.clone()),
        description: Set(s.base.description.clone()),
        comment: Set(s.base.comment.clone()),
        lead_id: Set(s.lead_id.clone()),
        customer_id: Set(s.customer_id.clone()),
        vehicle_id: Set(s.vehicle_id.clone()),
        sale_date: Set(s.sale_date),
        vehicle_price: Set(s.vehicle_price),
        accessories_total: Set(s.accessories_total),
        subtotal: Set(s.subtotal),
        discount: Set(s.discount),
        total_amount: Set(s.total_amount),
        cash_amount: Set(s.cash_amount),
        upi_amount: Set(s.upi_amount),
        finance_amount: Set(s.finance_amount),
        finance_provider: Set(s.finance_provider.clone()),
        amount_paid: Set(s.amount_paid),
        balance_due: Set(s.balance_due),
        uptime_pass: Set(s.uptime_pass),
        referral_id: Set(s.referral_id.clone()),
        sold_by: Set(s.sold_by.clone()),
        is_deleted: Set(s.base.metadata.is_deleted),
        is_posted: Set(s.base.metadata.is_posted),
        created_at: Set(Some(s.base.metadata.created_at)),
        updated_at: Set(Some(s.base.metadata.updated_at)),
        version: Set(s.base.metadata.version),
    }
}

pub async fn list<C: ConnectionTrait>(conn: &C, query: &SaleListQuery) -> anyhow::Result<Vec<Sale>> {
    let mut select = Entity::find().filter(Column::IsDeleted.eq(false));
    if let Some(customer_id) = &query.customer_id {
        select = select.filter(Column::CustomerId.eq(customer_id.as_str()));
    }
    select
        .order_by_desc(Column::SaleDate)
        .order_by_desc(Column::Code)
        .all(conn)
        .await?
        .into_iter()
        .map(Sale::try_from)
        .collect()
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> anyhow::Result<Option<Sale>> {
    Entity::find_by_id(id.to_string())
        .one(conn)
        .await?
        .map(Sale::try_from)
        .transpose()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, sale: &Sale) -> anyhow::Result<Uuid> {
    to_active(sale).insert(conn).await?;
    Ok(sale.base.id.value())
}

pub async fn update<C: ConnectionTrait>(conn: &C, sale: &Sale) -> anyhow::Result<()> {
    let mut active = to_active(sale);
    active.created_at = NotSet;
    active.update(conn).await?;
    Ok(())
}
