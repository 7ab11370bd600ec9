use chrono::{NaiveDate, Utc};
use contracts::domain::a001_lead::aggregate::{Lead, LeadId, LeadListQuery, LeadStage};
use contracts::domain::common::BaseAggregate;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::NotSet, QueryOrder, Set};
use uuid::Uuid;

use crate::domain::{parse_column, parse_row_id, row_metadata};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a001_lead")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub source: String,
    pub interested_model: Option<String>,
    pub stage: String,
    pub assigned_to: Option<String>,
    pub referred_by_customer_id: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub lost_reason: Option<String>,
    pub converted_sale_id: Option<String>,
    pub is_deleted: bool,
    pub is_posted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Lead {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = row_metadata(m.created_at, m.updated_at, m.is_deleted, m.is_posted, m.version);
        Ok(Lead {
            base: BaseAggregate::with_metadata(
                LeadId(parse_row_id(&m.id)?),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            phone: m.phone,
            email: m.email,
            source: parse_column(&m.source)?,
            interested_model: m.interested_model,
            stage: parse_column(&m.stage)?,
            assigned_to: m.assigned_to,
            referred_by_customer_id: m.referred_by_customer_id,
            follow_up_date: m.follow_up_date,
            lost_reason: m.lost_reason,
            converted_sale_id: m.converted_sale_id,
        })
    }
}

fn to_active(lead: &Lead) -> ActiveModel {
    ActiveModel {
        id: Set(lead.base.id.value().to_string()),
        code: Set(lead.base.code.clone()),
        description: Set(lead.base.description.clone()),
        comment: Set(lead.base.comment.clone()),
        phone: Set(lead.phone.clone()),
        email: Set(lead.email.clone()),
        source: Set(lead.source.as_str().to_string()),
        interested_model: Set(lead.interested_model.clone()),
        stage: Set(lead.stage.as_str().to_string()),
        assigned_to: Set(lead.assigned_to.clone()),
        referred_by_customer_id: Set(lead.referred_by_customer_id.clone()),
        follow_up_date: Set(lead.follow_up_date),
        lost_reason: Set(lead.lost_reason.clone()),
        converted_sale_id: Set(lead.converted_sale_id.clone()),
        is_deleted: Set(lead.base.metadata.is_deleted),
        is_posted: Set(lead.base.metadata.is_posted),
        created_at: Set(Some(lead.base.metadata.created_at)),
        updated_at: Set(Some(lead.base.metadata.updated_at)),
        version: Set(lead.base.metadata.version),
    }
}

fn convert_all(models: Vec<Model>) -> anyhow::Result<Vec<Lead>> {
    models.into_iter().map(Lead::try_from).collect()
}

pub async fn list<C: ConnectionTrait>(conn: &C, query: &LeadListQuery) -> anyhow::Result<Vec<Lead>> {
    let mut select = Entity::find().filter(Column::IsDeleted.eq(false));
    if let Some(stage) = query.stage {
        select = select.filter(Column::Stage.eq(stage.as_str()));
    }
    if let Some(assigned_to) = &query.assigned_to {
        select = select.filter(Column::AssignedTo.eq(assigned_to.as_str()));
    }
    convert_all(select.order_by_desc(Column::CreatedAt).all(conn).await?)
}

/// Open leads with a follow-up date on or before `due`, oldest first
pub async fn list_follow_ups<C: ConnectionTrait>(conn: &C, due: NaiveDate) -> anyhow::Result<Vec<Lead>> {
    let closed = [LeadStage::Won.as_str(), LeadStage::Lost.as_str()];
    let models = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .filter(Column::Stage.is_not_in(closed))
        .filter(Column::FollowUpDate.lte(due))
        .order_by_asc(Column::FollowUpDate)
        .all(conn)
        .await?;
    convert_all(models)
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: Uuid) -> anyhow::Result<Option<Lead>> {
    Entity::find_by_id(id.to_string())
        .one(conn)
        .await?
        .map(Lead::try_from)
        .transpose()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, lead: &Lead) -> anyhow::Result<Uuid> {
    to_active(lead).insert(conn).await?;
    Ok(lead.base.id.value())
}

pub async fn update<C: ConnectionTrait>(conn: &C, lead: &Lead) -> anyhow::Result<()> {
    let mut active = to_active(lead);
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
