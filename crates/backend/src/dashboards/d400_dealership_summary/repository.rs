use anyhow::Result;
use chrono::NaiveDate;
use contracts::dashboards::d400_dealership_summary::dto::CountByKey;
use sea_orm::{ConnectionTrait, DatabaseBackend, FromQueryResult, Statement};

#[derive(Debug, FromQueryResult)]
struct KeyCount {
    key: String,
    count: i64,
}

impl From<KeyCount> for CountByKey {
    fn from(row: KeyCount) -> Self {
        CountByKey {
            key: row.key,
            count: row.count,
        }
    }
}

/// Sales closed in a period
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct SalesTotals {
    pub sales_count: i64,
    pub revenue: f64,
}

fn day(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Every non-deleted lead by its current stage
pub async fn leads_by_stage<C: ConnectionTrait>(conn: &C) -> Result<Vec<CountByKey>> {
    let sql = r#"
        SELECT stage AS key, COUNT(*) AS count
        FROM a001_lead
        WHERE is_deleted = 0
        GROUP BY stage
        ORDER BY stage
    "#;
    let stmt = Statement::from_string(DatabaseBackend::Sqlite, sql.to_string());
    let rows = KeyCount::find_by_statement(stmt).all(conn).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn sales_totals<C: ConnectionTrait>(
    conn: &C,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<SalesTotals> {
    let sql = r#"
        SELECT COUNT(*) AS sales_count, COALESCE(SUM(total_amount), 0.0) AS revenue
        FROM a004_sale
        WHERE is_deleted = 0 AND sale_date >= ? AND sale_date <= ?
    "#;
    let stmt = Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        sql,
        [day(from).into(), day(to).into()],
    );
    Ok(SalesTotals::find_by_statement(stmt)
        .one(conn)
        .await?
        .unwrap_or(SalesTotals {
            sales_count: 0,
            revenue: 0.0,
        }))
}

/// Balance still owed across all sales, regardless of period
pub async fn outstanding_balance<C: ConnectionTrait>(conn: &C) -> Result<f64> {
    let row = conn
        .query_one(Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT COALESCE(SUM(balance_due), 0.0) AS outstanding FROM a004_sale WHERE is_deleted = 0"
                .to_string(),
        ))
        .await?;
    match row {
        Some(row) => Ok(row.try_get("", "outstanding")?),
        None => Ok(0.0),
    }
}

pub async fn open_tickets_by_status<C: ConnectionTrait>(conn: &C) -> Result<Vec<CountByKey>> {
    let sql = r#"
        SELECT status AS key, COUNT(*) AS count
        FROM a007_service_ticket
        WHERE is_deleted = 0 AND status NOT IN ('CLOSED', 'CANCELLED')
        GROUP BY status
        ORDER BY status
    "#;
    let stmt = Statement::from_string(DatabaseBackend::Sqlite, sql.to_string());
    let rows = KeyCount::find_by_statement(stmt).all(conn).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
