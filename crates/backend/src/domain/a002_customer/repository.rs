use chrono::{NaiveDate, Utc};
use contracts::domain::a002_customer::aggregate::{Customer, CustomerId, UptimePass, UptimePassStatus};
use contracts::domain::common::BaseAggregate;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::NotSet, QueryOrder, Set};
use uuid::Uuid;

use crate::domain::{parse_column, parse_row_id, row_metadata};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a002_customer")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub uptime_pass_status: String,
    pub uptime_pass_expiry: Option<NaiveDate>,
    pub total_purchases: i32,
    pub lifetime_value: f64,
    pub referral_count: i32,
    pub referral_credit: f64,
    pub last_service_date: Option<NaiveDate>,
    pub source_lead_id: Option<String>,
    pub is_deleted: bool,
    pub is_posted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Customer {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = row_metadata(m.created_at, m.updated_at, m.is_deleted, m.is_posted, m.version);
        Ok(Customer {
            base: BaseAggregate::with_metadata(
                CustomerId(parse_row_id(&m.id)?),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            phone: m.phone,
            email: m.email,
            address: m.address,
            uptime_pass: UptimePass {
                status: parse_column(&m.uptime_pass_status)?,
                expiry: m.uptime_pass_expiry,
            },
            total_purchases: m.total_purchases,
            lifetime_value: m.lifetime_value,
            referral_count: m.referral_count,
            referral_credit: m.referral_credit,
            last_service_date: m.last_service_date,
            source_lead_id: m.source_lead_id,
        })
    }
}

fn to_active(c: &Customer) -> ActiveModel {
    ActiveModel {
        id: Set(c.base.id.value().to_string()),
        code: Set(c.base.code.clone()),
        description: Set(c.base.description.clone()),
        comment: Set(c.base.comment.clone()),
        phone: Set(c.phone.clone()),
        email: Set(c.email.clone()),
        address: Set(c.address.clone()),
        uptime_pass_status: Set(c.uptime_pass.status.as_str().to_string()),
        uptime_pass_expiry: Set(c.uptime_pass.expiry),
        total_purchases: Set(c.total_purchases),
        lifetime_value: Set(c.lifetime_value),
        referral_count: Set(c.referral_count),
        referral_credit: Set(c.referral_credit),
        last_service_date: Set(c.last_service_date),
        source_lead_id: Set(c.source_lead_id.clone()),
        is_deleted: Set(c.base.metadata.is_deleted),
        is_posted: Set(c.base.metadata.is_posted),
        created_at: Set(Some(c.base.metadata.created_at)),
        updated_at: Set(Some(c.base.metadata.updated_at)),
        version: Set(c.base.metadata.version),
    }
}

fn convert_all(models: Vec<Model>) -> anyhow::Result<Vec<Customer>> {
    models.into_iter().map(Customer::try_from).collect()
}

pub async fn list_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<Customer>> {
    let models = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .order_by_asc(Column::Description)
        .all(conn)
        .await?;
    convert_all(models)
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> anyhow::Result<Option<Customer>> {
    Entity::find_by_id(id.to_string())
        .one(conn)
        .await?
        .map(Customer::try_from)
        .transpose()
}

/// Exact match on the normalized phone, ignoring deleted rows
pub async fn find_by_phone<C: ConnectionTrait>(conn: &C, phone: &str) -> anyhow::Result<Option<Customer>> {
    Entity::find()
        .filter(Column::Phone.eq(phone))
        .filter(Column::IsDeleted.eq(false))
        .one(conn)
        .await?
        .map(Customer::try_from)
        .transpose()
}

pub async fn search_by_phone<C: ConnectionTrait>(conn: &C, fragment: &str) -> anyhow::Result<Vec<Customer>> {
    let models = Entity::find()
        .filter(Column::Phone.contains(fragment))
        .filter(Column::IsDeleted.eq(false))
        .order_by_asc(Column::Description)
        .all(conn)
        .await?;
    convert_all(models)
}

pub async fn insert<C: ConnectionTrait>(conn: &C, customer: &Customer) -> anyhow::Result<Uuid> {
    to_active(customer).insert(conn).await?;
    Ok(customer.base.id.value())
}

pub async fn update<C: ConnectionTrait>(conn: &C, customer: &Customer) -> anyhow::Result<()> {
    let mut active = to_active(customer);
    active.created_at = NotSet;
    active.update(conn).await?;
    Ok(())
}

pub async fn soft_delete<C: ConnectionTrait>(conn: &C, id: Uuid) -> anyhow::Result<bool> {
    let result = Entity::update_many()
        .col_expr(Column::IsDeleted, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::IsDeleted.eq(false))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Flip stored `ACTIVE` passes whose expiry is before `today` to `EXPIRED`
pub async fn expire_passes<C: ConnectionTrait>(conn: &C, today: NaiveDate) -> anyhow::Result<u64> {
    let result = Entity::update_many()
        .col_expr(
            Column::UptimePassStatus,
            Expr::value(UptimePassStatus::Expired.as_str()),
        )
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::UptimePassStatus.eq(UptimePassStatus::Active.as_str()))
        .filter(Column::UptimePassExpiry.lt(today))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn count_active_passes<C: ConnectionTrait>(conn: &C, today: NaiveDate) -> anyhow::Result<u64> {
    let count = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::UptimePassStatus.eq(UptimePassStatus::Active.as_str()))
        .filter(Column::UptimePassExpiry.gte(today))
        .count(conn)
        .await?;
    Ok(count)
}
