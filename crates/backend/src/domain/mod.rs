pub mod a001_lead;
pub mod a002_customer;
pub mod a003_inventory_item;
pub mod a004_sale;
pub mod a005_payment;
pub mod a006_referral;
pub mod a007_service_ticket;
pub mod a008_attendance;

use chrono::{DateTime, Utc};
use contracts::domain::common::EntityMetadata;
use uuid::Uuid;

use crate::shared::error::{AppError, AppResult};

/// Metadata columns shared by every aggregate table
pub(crate) fn row_metadata(
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    is_deleted: bool,
    is_posted: bool,
    version: i32,
) -> EntityMetadata {
    EntityMetadata {
        created_at: created_at.unwrap_or_else(Utc::now),
        updated_at: updated_at.unwrap_or_else(Utc::now),
        is_deleted,
        is_posted,
        version,
    }
}

pub(crate) fn parse_row_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id).map_err(|e| anyhow::anyhow!("Corrupt id '{}': {}", id, e))
}

/// Parse an id given in a request body; malformed ids are a client error
pub(crate) fn parse_ref(what: &str, id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id.trim())
        .map_err(|_| AppError::Validation(format!("Invalid {} id '{}'", what, id)))
}

/// Enum column text back to the enum
pub(crate) fn parse_column<T>(value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse::<T>().map_err(anyhow::Error::msg)
}
