use chrono::{DateTime, NaiveDate, Utc};
use contracts::domain::a008_attendance::aggregate::{AttendanceListQuery, AttendanceRecord};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, QueryOrder, Set};

use crate::domain::parse_column;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "a008_attendance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub work_date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for AttendanceRecord {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(AttendanceRecord {
            id: m.id,
            user_id: m.user_id,
            work_date: m.work_date,
            check_in: m.check_in,
            check_out: m.check_out,
            status: parse_column(&m.status)?,
            note: m.note,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

fn to_active(r: &AttendanceRecord) -> ActiveModel {
    ActiveModel {
        id: Set(r.id.clone()),
        user_id: Set(r.user_id.clone()),
        work_date: Set(r.work_date),
        check_in: Set(r.check_in),
        check_out: Set(r.check_out),
        status: Set(r.status.as_str().to_string()),
        note: Set(r.note.clone()),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

pub async fn find_by_user_date<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    work_date: NaiveDate,
) -> anyhow::Result<Option<AttendanceRecord>> {
    Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::WorkDate.eq(work_date))
        .one(conn)
        .await?
        .map(AttendanceRecord::try_from)
        .transpose()
}

/// Inclusive date range, newest day first
pub async fn list<C: ConnectionTrait>(
    conn: &C,
    query: &AttendanceListQuery,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let mut select = Entity::find();
    if let Some(user_id) = &query.user_id {
        select = select.filter(Column::UserId.eq(user_id.as_str()));
    }
    if let Some(from) = query.from {
        select = select.filter(Column::WorkDate.gte(from));
    }
    if let Some(to) = query.to {
        select = select.filter(Column::WorkDate.lte(to));
    }
    select
        .order_by_desc(Column::WorkDate)
        .order_by_asc(Column::UserId)
        .all(conn)
        .await?
        .into_iter()
        .map(AttendanceRecord::try_from)
        .collect()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, record: &AttendanceRecord) -> anyhow::Result<()> {
    to_active(record).insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, record: &AttendanceRecord) -> anyhow::Result<()> {
    let mut active = to_active(record);
    active.created_at = NotSet;
    active.update(conn).await?;
    Ok(())
}
