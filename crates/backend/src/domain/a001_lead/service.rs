use chrono::NaiveDate;
use contracts::domain::a001_lead::aggregate::{
    ChangeLeadStageDto, Lead, LeadDto, LeadListQuery, LeadStage,
};
use contracts::domain::common::AggregateRoot;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use super::repository;
use crate::domain::a006_referral;
use crate::shared::config;
use crate::shared::data::numbering;
use crate::shared::error::{AppError, AppResult};
use crate::system::users::repository as users;

pub async fn list(db: &DatabaseConnection, query: &LeadListQuery) -> AppResult<Vec<Lead>> {
    Ok(repository::list(db, query).await?)
}

/// Open leads due for a call on or before `due` (today by default)
pub async fn follow_ups(db: &DatabaseConnection, due: Option<NaiveDate>) -> AppResult<Vec<Lead>> {
    let due = due.unwrap_or_else(|| config::today());
    Ok(repository::list_follow_ups(db, due).await?)
}

pub async fn get_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<Lead> {
    load(db, id).await
}

pub(crate) async fn load<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Lead> {
    repository::get_by_id(conn, id)
        .await?
        .filter(|lead| !lead.base.metadata.is_deleted)
        .ok_or_else(|| AppError::not_found(Lead::element_name(), id))
}

async fn ensure_assignee<C: ConnectionTrait>(conn: &C, assigned_to: Option<&str>) -> AppResult<()> {
    if let Some(user_id) = assigned_to {
        if users::get_by_id(conn, user_id).await?.is_none() {
            return Err(AppError::Validation(format!("Unknown user '{}'", user_id)));
        }
    }
    Ok(())
}

/// A referred lead also opens a pending referral in the same transaction
pub async fn create(db: &DatabaseConnection, dto: LeadDto) -> AppResult<Lead> {
    let txn = db.begin().await?;
    let code = numbering::next_number(
        &txn,
        "a001_lead",
        "code",
        &config::current().dealership.lead_prefix,
    )
    .await?;
    let mut lead = Lead::new_for_insert(code, &dto);
    lead.validate().map_err(AppError::Validation)?;
    ensure_assignee(&txn, lead.assigned_to.as_deref()).await?;
    repository::insert(&txn, &lead).await?;

    if let Some(referrer_id) = lead.referred_by_customer_id.clone() {
        let lead_id = lead.base.id.value().to_string();
        a006_referral::service::record_pending(&txn, &referrer_id, &lead_id, None).await?;
    }
    txn.commit().await?;

    tracing::info!(
        "Lead {} created ({}, source {})",
        lead.base.code,
        lead.base.description,
        lead.source
    );
    Ok(lead)
}

pub async fn update(db: &DatabaseConnection, id: Uuid, dto: LeadDto) -> AppResult<Lead> {
    let mut lead = load(db, id).await?;
    if lead.stage == LeadStage::Won {
        return Err(AppError::Conflict(format!(
            "Lead {} is converted and can no longer be edited",
            lead.base.code
        )));
    }
    lead.update(&dto);
    lead.validate().map_err(AppError::Validation)?;
    ensure_assignee(db, lead.assigned_to.as_deref()).await?;
    lead.before_write();
    repository::update(db, &lead).await?;
    Ok(lead)
}

pub async fn change_stage(db: &DatabaseConnection, id: Uuid, dto: ChangeLeadStageDto) -> AppResult<Lead> {
    let mut lead = load(db, id).await?;
    let previous = lead.stage;
    lead.change_stage(dto.stage, dto.lost_reason)
        .map_err(AppError::Conflict)?;
    lead.before_write();
    repository::update(db, &lead).await?;
    tracing::info!("Lead {} moved {} -> {}", lead.base.code, previous, lead.stage);
    Ok(lead)
}

pub async fn delete(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
    let lead = load(db, id).await?;
    if lead.stage == LeadStage::Won {
        return Err(AppError::Conflict(format!(
            "Lead {} is converted and cannot be deleted",
            lead.base.code
        )));
    }
    repository::soft_delete(db, id).await?;
    Ok(())
}
