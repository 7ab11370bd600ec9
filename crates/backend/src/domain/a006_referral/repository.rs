use chrono::{DateTime, Utc};
use contracts::domain::a006_referral::aggregate::{Referral, ReferralListQuery, ReferralStatus};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, QueryOrder, Set};

use crate::domain::parse_column;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "a006_referral")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub referrer_customer_id: String,
    pub lead_id: Option<String>,
    pub referred_customer_id: Option<String>,
    pub sale_id: Option<String>,
    pub status: String,
    pub reward_amount: f64,
    pub rewarded_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Referral {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(Referral {
            id: m.id,
            referrer_customer_id: m.referrer_customer_id,
            lead_id: m.lead_id,
            referred_customer_id: m.referred_customer_id,
            sale_id: m.sale_id,
            status: parse_column(&m.status)?,
            reward_amount: m.reward_amount,
            rewarded_at: m.rewarded_at,
            comment: m.comment,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

fn to_active(r: &Referral) -> ActiveModel {
    ActiveModel {
        id: Set(r.id.clone()),
        referrer_customer_id: Set(r.referrer_customer_id.clone()),
        lead_id: Set(r.lead_id.clone()),
        referred_customer_id: Set(r.referred_customer_id.clone()),
        sale_id: Set(r.sale_id.clone()),
        status: Set(r.status.as_str().to_string()),
        reward_amount: Set(r.reward_amount),
        rewarded_at: Set(r.rewarded_at),
        comment: Set(r.comment.clone()),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

pub async fn list<C: ConnectionTrait>(conn: &C, query: &ReferralListQuery) -> anyhow::Result<Vec<Referral>> {
    let mut select = Entity::find();
    if let Some(referrer) = &query.referrer_customer_id {
        select = select.filter(Column::ReferrerCustomerId.eq(referrer.as_str()));
    }
    if let Some(status) = query.status {
        select = select.filter(Column::Status.eq(status.as_str()));
    }
    select
        .order_by_desc(Column::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(Referral::try_from)
        .collect()
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: &str) -> anyhow::Result<Option<Referral>> {
    Entity::find_by_id(id.to_string())
        .one(conn)
        .await?
        .map(Referral::try_from)
        .transpose()
}

pub async fn find_pending_by_lead<C: ConnectionTrait>(
    conn: &C,
    lead_id: &str,
) -> anyhow::Result<Option<Referral>> {
    Entity::find()
        .filter(Column::LeadId.eq(lead_id))
        .filter(Column::Status.eq(ReferralStatus::Pending.as_str()))
        .order_by_desc(Column::CreatedAt)
        .one(conn)
        .await?
        .map(Referral::try_from)
        .transpose()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, referral: &Referral) -> anyhow::Result<()> {
    to_active(referral).insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, referral: &Referral) -> anyhow::Result<()> {
    let mut active = to_active(referral);
    active.created_at = NotSet;
    active.update(conn).await?;
    Ok(())
}
