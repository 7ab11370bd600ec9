use contracts::domain::a006_referral::aggregate::{
    CreateReferralDto, Referral, ReferralListQuery, ReferralStatus,
};
use contracts::domain::common::money::round2;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};

use super::repository;
use crate::domain::{a001_lead, a002_customer, parse_ref};
use crate::shared::config;
use crate::shared::error::{AppError, AppResult};

pub async fn list(db: &DatabaseConnection, query: &ReferralListQuery) -> AppResult<Vec<Referral>> {
    Ok(repository::list(db, query).await?)
}

async fn load<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<Referral> {
    repository::get_by_id(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("Referral", id))
}

/// Pending referral for a freshly created lead
pub(crate) async fn record_pending<C: ConnectionTrait>(
    conn: &C,
    referrer_customer_id: &str,
    lead_id: &str,
    comment: Option<String>,
) -> AppResult<Referral> {
    a002_customer::service::load(conn, parse_ref("referrer customer", referrer_customer_id)?).await?;
    if repository::find_pending_by_lead(conn, lead_id).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Lead {} already has a pending referral",
            lead_id
        )));
    }
    let mut referral = Referral::new_pending(referrer_customer_id.to_string(), Some(lead_id.to_string()));
    referral.comment = comment;
    repository::insert(conn, &referral).await?;
    Ok(referral)
}

/// Manual referral for an existing open lead
pub async fn create(db: &DatabaseConnection, dto: CreateReferralDto) -> AppResult<Referral> {
    let txn = db.begin().await?;
    let mut lead = a001_lead::service::load(&txn, parse_ref("lead", &dto.lead_id)?).await?;
    if !lead.stage.is_open() {
        return Err(AppError::Conflict(format!(
            "Lead {} is {} and can no longer be referred",
            lead.base.code, lead.stage
        )));
    }
    let referral =
        record_pending(&txn, &dto.referrer_customer_id, &dto.lead_id, dto.comment).await?;
    if lead.referred_by_customer_id.as_deref() != Some(dto.referrer_customer_id.as_str()) {
        lead.referred_by_customer_id = Some(dto.referrer_customer_id.clone());
        lead.before_write();
        a001_lead::repository::update(&txn, &lead).await?;
    }
    txn.commit().await?;
    tracing::info!("Referral recorded for lead {}", lead.base.code);
    Ok(referral)
}

/// Referral bookkeeping of a sale: the lead's pending referral from the same
/// referrer is converted, otherwise a converted referral is created. The
/// referrer is credited with the configured reward.
pub(crate) async fn settle_for_sale<C: ConnectionTrait>(
    conn: &C,
    referrer_customer_id: &str,
    lead_id: Option<&str>,
    buyer_customer_id: &str,
    sale_id: &str,
) -> AppResult<Referral> {
    if referrer_customer_id == buyer_customer_id {
        return Err(AppError::Validation(
            "A customer cannot refer their own purchase".into(),
        ));
    }
    let mut referrer =
        a002_customer::service::load(conn, parse_ref("referrer customer", referrer_customer_id)?)
            .await?;
    let reward = config::current().dealership.referral_reward;

    let pending = match lead_id {
        Some(lead_id) => repository::find_pending_by_lead(conn, lead_id).await?,
        None => None,
    };
    let referral = match pending {
        Some(mut referral) if referral.referrer_customer_id == referrer_customer_id => {
            referral
                .convert(buyer_customer_id, sale_id, reward)
                .map_err(AppError::Conflict)?;
            repository::update(conn, &referral).await?;
            referral
        }
        other => {
            if let Some(mut stale) = other {
                // The buyer named a different referrer at the counter
                stale.cancel().map_err(AppError::Conflict)?;
                repository::update(conn, &stale).await?;
            }
            let mut referral = Referral::new_pending(
                referrer_customer_id.to_string(),
                lead_id.map(str::to_string),
            );
            referral
                .convert(buyer_customer_id, sale_id, reward)
                .map_err(AppError::Conflict)?;
            repository::insert(conn, &referral).await?;
            referral
        }
    };

    referrer.referral_count += 1;
    referrer.referral_credit = round2(referrer.referral_credit + reward);
    referrer.before_write();
    a002_customer::repository::update(conn, &referrer).await?;
    tracing::info!(
        "Referrer {} credited {:.2} for sale {}",
        referrer.base.code,
        reward,
        sale_id
    );
    Ok(referral)
}

/// Reward paid out: the amount leaves the referrer's outstanding credit
pub async fn mark_rewarded(db: &DatabaseConnection, id: &str) -> AppResult<Referral> {
    let txn = db.begin().await?;
    let mut referral = load(&txn, id).await?;
    referral.mark_rewarded().map_err(AppError::Conflict)?;
    repository::update(&txn, &referral).await?;

    let mut referrer = a002_customer::service::load(
        &txn,
        parse_ref("referrer customer", &referral.referrer_customer_id)?,
    )
    .await?;
    referrer.referral_credit = round2((referrer.referral_credit - referral.reward_amount).max(0.0));
    referrer.before_write();
    a002_customer::repository::update(&txn, &referrer).await?;
    txn.commit().await?;
    Ok(referral)
}

/// Referrer of the lead's live pending referral, if any
pub(crate) async fn pending_referrer<C: ConnectionTrait>(
    conn: &C,
    lead_id: &str,
) -> AppResult<Option<String>> {
    Ok(repository::find_pending_by_lead(conn, lead_id)
        .await?
        .map(|referral| referral.referrer_customer_id))
}

/// Cancelling also unlinks the referrer from the lead
pub async fn cancel(db: &DatabaseConnection, id: &str) -> AppResult<Referral> {
    let txn = db.begin().await?;
    let mut referral = load(&txn, id).await?;
    if referral.status != ReferralStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Only pending referrals can be cancelled (this one is {})",
            referral.status
        )));
    }
    referral.cancel().map_err(AppError::Conflict)?;
    repository::update(&txn, &referral).await?;

    if let Some(lead_id) = referral.lead_id.as_deref() {
        let lead = a001_lead::repository::get_by_id(&txn, parse_ref("lead", lead_id)?).await?;
        if let Some(mut lead) = lead {
            if lead.referred_by_customer_id.as_deref() == Some(referral.referrer_customer_id.as_str()) {
                lead.referred_by_customer_id = None;
                lead.before_write();
                a001_lead::repository::update(&txn, &lead).await?;
            }
        }
    }
    txn.commit().await?;
    Ok(referral)
}
