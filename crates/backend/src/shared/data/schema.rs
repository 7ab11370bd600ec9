//! Schema bootstrap for the SQLite file.
//!
//! Each table is declared once as a [`TableDef`]. Bootstrapping creates the
//! tables that are missing and adds every declared column a table lacks, so
//! an older database file is upgraded in place and a current one is left
//! untouched. Every non-key column therefore has to be valid in
//! `ALTER TABLE ... ADD COLUMN`: nullable, or `NOT NULL` with a default.

use std::collections::HashSet;

use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

pub struct TableDef {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [(&'static str, &'static str)],
    pub indexes: &'static [&'static str],
}

const ID_KEY: &str = "id TEXT PRIMARY KEY NOT NULL";

/// Columns shared by every aggregate table
macro_rules! aggregate_columns {
    ($($extra:expr),* $(,)?) => {
        &[
            ("code", "code TEXT NOT NULL DEFAULT ''"),
            ("description", "description TEXT NOT NULL DEFAULT ''"),
            ("comment", "comment TEXT"),
            $($extra,)*
            ("is_deleted", "is_deleted INTEGER NOT NULL DEFAULT 0"),
            ("is_posted", "is_posted INTEGER NOT NULL DEFAULT 0"),
            ("created_at", "created_at TEXT"),
            ("updated_at", "updated_at TEXT"),
            ("version", "version INTEGER NOT NULL DEFAULT 0"),
        ]
    };
}

pub const TABLES: &[TableDef] = &[
    TableDef {
        name: "sys_settings",
        primary_key: "key TEXT PRIMARY KEY NOT NULL",
        columns: &[
            ("value", "value TEXT NOT NULL DEFAULT ''"),
            ("description", "description TEXT"),
            ("created_at", "created_at TEXT"),
            ("updated_at", "updated_at TEXT"),
        ],
        indexes: &[],
    },
    TableDef {
        name: "sys_users",
        primary_key: ID_KEY,
        columns: &[
            ("username", "username TEXT NOT NULL DEFAULT ''"),
            ("email", "email TEXT"),
            ("password_hash", "password_hash TEXT NOT NULL DEFAULT ''"),
            ("full_name", "full_name TEXT"),
            ("is_active", "is_active INTEGER NOT NULL DEFAULT 1"),
            ("role", "role TEXT NOT NULL DEFAULT 'SALES'"),
            ("created_at", "created_at TEXT NOT NULL DEFAULT ''"),
            ("updated_at", "updated_at TEXT NOT NULL DEFAULT ''"),
            ("last_login_at", "last_login_at TEXT"),
            ("created_by", "created_by TEXT"),
        ],
        indexes: &[
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_sys_users_username ON sys_users(username)",
        ],
    },
    TableDef {
        name: "sys_refresh_tokens",
        primary_key: ID_KEY,
        columns: &[
            ("user_id", "user_id TEXT NOT NULL DEFAULT ''"),
            ("token_hash", "token_hash TEXT NOT NULL DEFAULT ''"),
            ("expires_at", "expires_at TEXT NOT NULL DEFAULT ''"),
            ("created_at", "created_at TEXT NOT NULL DEFAULT ''"),
            ("revoked_at", "revoked_at TEXT"),
        ],
        indexes: &[
            "CREATE INDEX IF NOT EXISTS ix_sys_refresh_tokens_hash ON sys_refresh_tokens(token_hash)",
        ],
    },
    TableDef {
        name: "a001_lead",
        primary_key: ID_KEY,
        columns: aggregate_columns![
            ("phone", "phone TEXT NOT NULL DEFAULT ''"),
            ("email", "email TEXT"),
            ("source", "source TEXT NOT NULL DEFAULT 'WALK_IN'"),
            ("interested_model", "interested_model TEXT"),
            ("stage", "stage TEXT NOT NULL DEFAULT 'NEW'"),
            ("assigned_to", "assigned_to TEXT"),
            ("referred_by_customer_id", "referred_by_customer_id TEXT"),
            ("follow_up_date", "follow_up_date TEXT"),
            ("lost_reason", "lost_reason TEXT"),
            ("converted_sale_id", "converted_sale_id TEXT"),
        ],
        indexes: &["CREATE INDEX IF NOT EXISTS ix_a001_lead_stage ON a001_lead(stage)"],
    },
    TableDef {
        name: "a002_customer",
        primary_key: ID_KEY,
        columns: aggregate_columns![
            ("phone", "phone TEXT NOT NULL DEFAULT ''"),
            ("email", "email TEXT"),
            ("address", "address TEXT"),
            ("uptime_pass_status", "uptime_pass_status TEXT NOT NULL DEFAULT 'NONE'"),
            ("uptime_pass_expiry", "uptime_pass_expiry TEXT"),
            ("total_purchases", "total_purchases INTEGER NOT NULL DEFAULT 0"),
            ("lifetime_value", "lifetime_value REAL NOT NULL DEFAULT 0"),
            ("referral_count", "referral_count INTEGER NOT NULL DEFAULT 0"),
            ("referral_credit", "referral_credit REAL NOT NULL DEFAULT 0"),
            ("last_service_date", "last_service_date TEXT"),
            ("source_lead_id", "source_lead_id TEXT"),
        ],
        indexes: &[
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_a002_customer_phone ON a002_customer(phone) WHERE is_deleted = 0",
        ],
    },
    TableDef {
        name: "a003_inventory_item",
        primary_key: ID_KEY,
        columns: aggregate_columns![
            ("kind", "kind TEXT NOT NULL DEFAULT 'ACCESSORY'"),
            ("variant", "variant TEXT"),
            ("color", "color TEXT"),
            ("chassis_no", "chassis_no TEXT"),
            ("motor_no", "motor_no TEXT"),
            ("battery_no", "battery_no TEXT"),
            ("quantity", "quantity INTEGER NOT NULL DEFAULT 0"),
            ("low_stock_threshold", "low_stock_threshold INTEGER NOT NULL DEFAULT 0"),
            ("purchase_price", "purchase_price REAL NOT NULL DEFAULT 0"),
            ("selling_price", "selling_price REAL NOT NULL DEFAULT 0"),
            ("status", "status TEXT NOT NULL DEFAULT 'IN_STOCK'"),
        ],
        indexes: &[
            "CREATE INDEX IF NOT EXISTS ix_a003_inventory_item_kind ON a003_inventory_item(kind, status)",
        ],
    },
    TableDef {
        name: "a004_sale",
        primary_key: ID_KEY,
        columns: aggregate_columns![
            ("lead_id", "lead_id TEXT"),
            ("customer_id", "customer_id TEXT NOT NULL DEFAULT ''"),
            ("vehicle_id", "vehicle_id TEXT NOT NULL DEFAULT ''"),
            ("sale_date", "sale_date TEXT NOT NULL DEFAULT ''"),
            ("vehicle_price", "vehicle_price REAL NOT NULL DEFAULT 0"),
            ("accessories_total", "accessories_total REAL NOT NULL DEFAULT 0"),
            ("subtotal", "subtotal REAL NOT NULL DEFAULT 0"),
            ("discount", "discount REAL NOT NULL DEFAULT 0"),
            ("total_amount", "total_amount REAL NOT NULL DEFAULT 0"),
            ("cash_amount", "cash_amount REAL NOT NULL DEFAULT 0"),
            ("upi_amount", "upi_amount REAL NOT NULL DEFAULT 0"),
            ("finance_amount", "finance_amount REAL NOT NULL DEFAULT 0"),
            ("finance_provider", "finance_provider TEXT"),
            ("amount_paid", "amount_paid REAL NOT NULL DEFAULT 0"),
            ("balance_due", "balance_due REAL NOT NULL DEFAULT 0"),
            ("uptime_pass", "uptime_pass INTEGER NOT NULL DEFAULT 0"),
            ("referral_id", "referral_id TEXT"),
            ("sold_by", "sold_by TEXT"),
        ],
        indexes: &[
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_a004_sale_code ON a004_sale(code)",
            "CREATE INDEX IF NOT EXISTS ix_a004_sale_customer ON a004_sale(customer_id)",
        ],
    },
    TableDef {
        name: "a004_sale_line",
        primary_key: ID_KEY,
        columns: &[
            ("sale_id", "sale_id TEXT NOT NULL DEFAULT ''"),
            ("item_id", "item_id TEXT NOT NULL DEFAULT ''"),
            ("description", "description TEXT NOT NULL DEFAULT ''"),
            ("quantity", "quantity INTEGER NOT NULL DEFAULT 1"),
            ("unit_price", "unit_price REAL NOT NULL DEFAULT 0"),
            ("line_total", "line_total REAL NOT NULL DEFAULT 0"),
        ],
        indexes: &["CREATE INDEX IF NOT EXISTS ix_a004_sale_line_sale ON a004_sale_line(sale_id)"],
    },
    TableDef {
        name: "a005_payment",
        primary_key: ID_KEY,
        columns: &[
            ("sale_id", "sale_id TEXT"),
            ("service_ticket_id", "service_ticket_id TEXT"),
            ("customer_id", "customer_id TEXT NOT NULL DEFAULT ''"),
            ("mode", "mode TEXT NOT NULL DEFAULT 'CASH'"),
            ("amount", "amount REAL NOT NULL DEFAULT 0"),
            ("reference", "reference TEXT"),
            ("finance_provider", "finance_provider TEXT"),
            ("received_by", "received_by TEXT"),
            ("paid_at", "paid_at TEXT NOT NULL DEFAULT ''"),
        ],
        indexes: &[
            "CREATE INDEX IF NOT EXISTS ix_a005_payment_sale ON a005_payment(sale_id)",
            "CREATE INDEX IF NOT EXISTS ix_a005_payment_ticket ON a005_payment(service_ticket_id)",
        ],
    },
    TableDef {
        name: "a006_referral",
        primary_key: ID_KEY,
        columns: &[
            ("referrer_customer_id", "referrer_customer_id TEXT NOT NULL DEFAULT ''"),
            ("lead_id", "lead_id TEXT"),
            ("referred_customer_id", "referred_customer_id TEXT"),
            ("sale_id", "sale_id TEXT"),
            ("status", "status TEXT NOT NULL DEFAULT 'PENDING'"),
            ("reward_amount", "reward_amount REAL NOT NULL DEFAULT 0"),
            ("rewarded_at", "rewarded_at TEXT"),
            ("comment", "comment TEXT"),
            ("created_at", "created_at TEXT NOT NULL DEFAULT ''"),
            ("updated_at", "updated_at TEXT NOT NULL DEFAULT ''"),
        ],
        indexes: &["CREATE INDEX IF NOT EXISTS ix_a006_referral_lead ON a006_referral(lead_id)"],
    },
    TableDef {
        name: "a007_service_ticket",
        primary_key: ID_KEY,
        columns: aggregate_columns![
            ("customer_id", "customer_id TEXT NOT NULL DEFAULT ''"),
            ("vehicle_item_id", "vehicle_item_id TEXT"),
            ("chassis_no", "chassis_no TEXT"),
            ("priority", "priority TEXT NOT NULL DEFAULT 'NORMAL'"),
            ("status", "status TEXT NOT NULL DEFAULT 'OPEN'"),
            ("assigned_technician_id", "assigned_technician_id TEXT"),
            ("labour_charge", "labour_charge REAL NOT NULL DEFAULT 0"),
            ("estimated_cost", "estimated_cost REAL NOT NULL DEFAULT 0"),
            ("parts_total", "parts_total REAL NOT NULL DEFAULT 0"),
            ("final_amount", "final_amount REAL NOT NULL DEFAULT 0"),
            ("covered_by_pass", "covered_by_pass INTEGER NOT NULL DEFAULT 0"),
            ("opened_at", "opened_at TEXT NOT NULL DEFAULT ''"),
            ("completed_at", "completed_at TEXT"),
            ("closed_at", "closed_at TEXT"),
        ],
        indexes: &[
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_a007_service_ticket_code ON a007_service_ticket(code)",
        ],
    },
    TableDef {
        name: "a007_service_part",
        primary_key: ID_KEY,
        columns: &[
            ("ticket_id", "ticket_id TEXT NOT NULL DEFAULT ''"),
            ("item_id", "item_id TEXT NOT NULL DEFAULT ''"),
            ("description", "description TEXT NOT NULL DEFAULT ''"),
            ("quantity", "quantity INTEGER NOT NULL DEFAULT 1"),
            ("unit_price", "unit_price REAL NOT NULL DEFAULT 0"),
            ("line_total", "line_total REAL NOT NULL DEFAULT 0"),
        ],
        indexes: &[
            "CREATE INDEX IF NOT EXISTS ix_a007_service_part_ticket ON a007_service_part(ticket_id)",
        ],
    },
    TableDef {
        name: "a008_attendance",
        primary_key: ID_KEY,
        columns: &[
            ("user_id", "user_id TEXT NOT NULL DEFAULT ''"),
            ("work_date", "work_date TEXT NOT NULL DEFAULT ''"),
            ("check_in", "check_in TEXT"),
            ("check_out", "check_out TEXT"),
            ("status", "status TEXT NOT NULL DEFAULT 'PRESENT'"),
            ("note", "note TEXT"),
            ("created_at", "created_at TEXT NOT NULL DEFAULT ''"),
            ("updated_at", "updated_at TEXT NOT NULL DEFAULT ''"),
        ],
        indexes: &[
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_a008_attendance_user_date ON a008_attendance(user_id, work_date)",
        ],
    },
];

fn stmt(sql: impl Into<String>) -> Statement {
    Statement::from_string(DatabaseBackend::Sqlite, sql.into())
}

pub async fn table_exists<C: ConnectionTrait>(conn: &C, table: &str) -> anyhow::Result<bool> {
    let row = conn
        .query_one(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT COUNT(1) AS cnt FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table.into()],
        ))
        .await?;
    let count: i64 = match row {
        Some(row) => row.try_get("", "cnt")?,
        None => 0,
    };
    Ok(count > 0)
}

pub async fn existing_columns<C: ConnectionTrait>(
    conn: &C,
    table: &str,
) -> anyhow::Result<HashSet<String>> {
    let rows = conn
        .query_all(stmt(format!("PRAGMA table_info('{}');", table)))
        .await?;
    let mut names = HashSet::new();
    for row in rows {
        let name: String = row.try_get("", "name")?;
        names.insert(name);
    }
    Ok(names)
}

fn create_table_sql(table: &TableDef) -> String {
    let mut parts = vec![table.primary_key];
    parts.extend(table.columns.iter().map(|(_, ddl)| *ddl));
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        table.name,
        parts.join(",\n    ")
    )
}

/// Create or upgrade a single table. Returns the names of columns added.
pub async fn ensure_table<C: ConnectionTrait>(
    conn: &C,
    table: &TableDef,
) -> anyhow::Result<Vec<&'static str>> {
    let mut added = Vec::new();

    if !table_exists(conn, table.name).await? {
        tracing::info!("Creating {} table", table.name);
        conn.execute(stmt(create_table_sql(table))).await?;
    } else {
        let present = existing_columns(conn, table.name).await?;
        for (name, ddl) in table.columns {
            if !present.contains(*name) {
                tracing::info!("Adding column {}.{}", table.name, name);
                conn.execute(stmt(format!("ALTER TABLE {} ADD COLUMN {};", table.name, ddl)))
                    .await?;
                added.push(*name);
            }
        }
    }

    for index in table.indexes {
        conn.execute(stmt(*index)).await?;
    }
    Ok(added)
}

/// Databases from before role-based access stored an `is_admin` flag.
/// Promote those accounts once the `role` column exists.
async fn promote_legacy_admins<C: ConnectionTrait>(
    conn: &C,
    added_columns: &[&str],
) -> anyhow::Result<()> {
    if !added_columns.contains(&"role") {
        return Ok(());
    }
    if existing_columns(conn, "sys_users").await?.contains("is_admin") {
        let result = conn
            .execute(stmt("UPDATE sys_users SET role = 'ADMIN' WHERE is_admin = 1;"))
            .await?;
        tracing::info!(
            "Promoted {} legacy admin account(s) to ADMIN role",
            result.rows_affected()
        );
    }
    Ok(())
}

/// Bring every table up to the current layout. Safe to run on every start.
pub async fn bootstrap_schema<C: ConnectionTrait>(conn: &C) -> anyhow::Result<()> {
    for table in TABLES {
        let added = ensure_table(conn, table).await?;
        if table.name == "sys_users" {
            promote_legacy_admins(conn, &added).await?;
        }
    }
    tracing::info!("Database schema is up to date ({} tables)", TABLES.len());
    Ok(())
}
