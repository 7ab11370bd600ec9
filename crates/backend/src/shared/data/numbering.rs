use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

use crate::shared::format::format_code;

/// Next human-readable number for `table.column`, e.g. `SALE-0042`.
///
/// Takes the largest numeric suffix among existing `PREFIX-…` values and adds
/// one. Must run on the same transaction that inserts the row, the unique
/// index on the column is what catches a concurrent writer.
pub async fn next_number<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    column: &str,
    prefix: &str,
) -> anyhow::Result<String> {
    let sql = format!(
        "SELECT {column} AS value FROM {table} WHERE {column} LIKE ?",
        column = column,
        table = table
    );
    let rows = conn
        .query_all(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            &sql,
            [format!("{}-%", prefix).into()],
        ))
        .await?;

    let mut max = 0i64;
    for row in rows {
        let value: String = row.try_get("", "value")?;
        if let Some(n) = parse_suffix(&value, prefix) {
            max = max.max(n);
        }
    }
    Ok(format_code(prefix, max + 1))
}

fn parse_suffix(value: &str, prefix: &str) -> Option<i64> {
    value
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .parse::<i64>()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;

    #[test]
    fn parse_suffix_ignores_foreign_codes() {
        assert_eq!(parse_suffix("SALE-0007", "SALE"), Some(7));
        assert_eq!(parse_suffix("SALE-12345", "SALE"), Some(12345));
        assert_eq!(parse_suffix("SALE-X1", "SALE"), None);
        assert_eq!(parse_suffix("SRV-0001", "SALE"), None);
    }

    #[tokio::test]
    async fn numbers_follow_the_largest_suffix() {
        let conn = connect_in_memory().await.unwrap();
        assert_eq!(
            next_number(&conn, "a004_sale", "code", "SALE").await.unwrap(),
            "SALE-0001"
        );

        for (id, code) in [("s1", "SALE-0001"), ("s2", "SALE-0009"), ("s3", "legacy")] {
            conn.execute(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "INSERT INTO a004_sale (id, code) VALUES (?, ?)",
                [id.into(), code.into()],
            ))
            .await
            .unwrap();
        }
        assert_eq!(
            next_number(&conn, "a004_sale", "code", "SALE").await.unwrap(),
            "SALE-0010"
        );
    }
}
