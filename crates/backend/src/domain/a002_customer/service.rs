use chrono::NaiveDate;
use contracts::domain::a002_customer::aggregate::{
    Customer, CustomerDto, PassRefreshResult, RenewUptimePassDto,
};
use contracts::domain::common::phone::{normalize_phone, validate_phone};
use contracts::domain::common::AggregateRoot;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use super::repository;
use crate::shared::config;
use crate::shared::data::numbering;
use crate::shared::error::{AppError, AppResult};

/// Stored pass status is refreshed lazily; reads always show the effective one
fn with_effective_pass(mut customer: Customer, today: NaiveDate) -> Customer {
    customer.uptime_pass.status = customer.uptime_pass.effective_status(today);
    customer
}

pub async fn list_all(db: &DatabaseConnection) -> AppResult<Vec<Customer>> {
    let today = config::today();
    Ok(repository::list_all(db)
        .await?
        .into_iter()
        .map(|c| with_effective_pass(c, today))
        .collect())
}

pub async fn get_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<Customer> {
    let customer = load(db, id).await?;
    Ok(with_effective_pass(customer, config::today()))
}

/// Non-deleted customer or NotFound
pub(crate) async fn load<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Customer> {
    repository::get_by_id(conn, id)
        .await?
        .filter(|c| !c.base.metadata.is_deleted)
        .ok_or_else(|| AppError::not_found(Customer::element_name(), id))
}

pub async fn search_by_phone(db: &DatabaseConnection, phone: &str) -> AppResult<Vec<Customer>> {
    let digits = normalize_phone(phone);
    if digits.is_empty() {
        return Err(AppError::Validation(
            "Search needs at least one digit of the phone number".into(),
        ));
    }
    let today = config::today();
    Ok(repository::search_by_phone(db, &digits)
        .await?
        .into_iter()
        .map(|c| with_effective_pass(c, today))
        .collect())
}

async fn ensure_phone_free<C: ConnectionTrait>(
    conn: &C,
    phone: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    if let Some(existing) = repository::find_by_phone(conn, phone).await? {
        if Some(existing.base.id.value()) != except {
            return Err(AppError::Conflict(format!(
                "Phone {} already belongs to customer {}",
                phone, existing.base.code
            )));
        }
    }
    Ok(())
}

async fn insert_new<C: ConnectionTrait>(conn: &C, dto: &CustomerDto) -> AppResult<Customer> {
    let code = numbering::next_number(
        conn,
        "a002_customer",
        "code",
        &config::current().dealership.customer_prefix,
    )
    .await?;
    let mut customer = Customer::new_for_insert(code, dto);
    customer.validate().map_err(AppError::Validation)?;
    ensure_phone_free(conn, &customer.phone, None).await?;
    repository::insert(conn, &customer).await?;
    Ok(customer)
}

pub async fn create(db: &DatabaseConnection, dto: CustomerDto) -> AppResult<Customer> {
    let txn = db.begin().await?;
    let customer = insert_new(&txn, &dto).await?;
    txn.commit().await?;
    tracing::info!("Customer {} created", customer.base.code);
    Ok(customer)
}

pub async fn update(db: &DatabaseConnection, id: Uuid, dto: CustomerDto) -> AppResult<Customer> {
    let mut customer = load(db, id).await?;
    customer.update(&dto);
    customer.validate().map_err(AppError::Validation)?;
    ensure_phone_free(db, &customer.phone, Some(id)).await?;
    customer.before_write();
    repository::update(db, &customer).await?;
    Ok(customer)
}

pub async fn delete(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
    if !repository::soft_delete(db, id).await? {
        return Err(AppError::not_found(Customer::element_name(), id));
    }
    Ok(())
}

/// Customer for a sale: the one holding `phone` gets its contact merged,
/// otherwise a new customer is created. Runs inside the sale transaction.
pub(crate) async fn upsert_by_phone<C: ConnectionTrait>(
    conn: &C,
    dto: &CustomerDto,
    source_lead_id: Option<&str>,
) -> AppResult<Customer> {
    let phone = validate_phone(&dto.phone).map_err(AppError::Validation)?;
    match repository::find_by_phone(conn, &phone).await? {
        Some(mut existing) => {
            existing.merge_contact(&dto.name, dto.email.as_deref(), dto.address.as_deref());
            existing.validate().map_err(AppError::Validation)?;
            existing.before_write();
            repository::update(conn, &existing).await?;
            Ok(existing)
        }
        None => {
            let mut customer = insert_new(conn, dto).await?;
            if let Some(lead_id) = source_lead_id {
                customer.source_lead_id = Some(lead_id.to_string());
                repository::update(conn, &customer).await?;
            }
            Ok(customer)
        }
    }
}

/// Activate or extend the pass on an already loaded customer; the caller saves it
pub(crate) fn apply_uptime_pass(
    customer: &mut Customer,
    today: NaiveDate,
    months: Option<u32>,
) -> AppResult<NaiveDate> {
    let months = months.unwrap_or(config::current().dealership.uptime_pass_months);
    customer
        .uptime_pass
        .renew(today, months)
        .map_err(AppError::Validation)
}

pub async fn renew_uptime_pass(
    db: &DatabaseConnection,
    id: Uuid,
    dto: RenewUptimePassDto,
) -> AppResult<Customer> {
    let today = config::today();
    let mut customer = load(db, id).await?;
    let expiry = apply_uptime_pass(&mut customer, today, dto.months)?;
    customer.before_write();
    repository::update(db, &customer).await?;
    tracing::info!(
        "Uptime Pass for {} active until {}",
        customer.base.code,
        expiry
    );
    Ok(customer)
}

pub async fn refresh_expired_passes(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> AppResult<PassRefreshResult> {
    let expired_count = repository::expire_passes(db, today).await?;
    if expired_count > 0 {
        tracing::info!("Marked {} Uptime Pass(es) as expired", expired_count);
    }
    Ok(PassRefreshResult { expired_count })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;
    use contracts::domain::a002_customer::aggregate::UptimePassStatus;

    pub(crate) async fn create_customer(db: &DatabaseConnection, name: &str, phone: &str) -> Customer {
        create(
            db,
            CustomerDto {
                name: name.into(),
                phone: phone.into(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn codes_are_sequential_and_phones_unique() {
        let db = connect_in_memory().await.unwrap();
        let first = create_customer(&db, "Asha", "98450 12345").await;
        let second = create_customer(&db, "Ravi", "9845012346").await;
        assert_eq!(first.base.code, "CUST-0001");
        assert_eq!(second.base.code, "CUST-0002");
        assert_eq!(first.phone, "9845012345");

        let dup = create(
            &db,
            CustomerDto {
                name: "Someone".into(),
                phone: "+9845012345".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(dup, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleted_customer_frees_the_phone() {
        let db = connect_in_memory().await.unwrap();
        let first = create_customer(&db, "Asha", "9845012345").await;
        delete(&db, first.base.id.value()).await.unwrap();
        create_customer(&db, "Asha again", "9845012345").await;
        assert!(matches!(
            get_by_id(&db, first.base.id.value()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn upsert_merges_existing_contact() {
        let db = connect_in_memory().await.unwrap();
        let existing = create_customer(&db, "Asha", "9845012345").await;
        let merged = upsert_by_phone(
            &db,
            &CustomerDto {
                name: "Asha Rao".into(),
                phone: "98450-12345".into(),
                email: Some("asha@example.com".into()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
        assert_eq!(merged.base.id, existing.base.id);
        assert_eq!(merged.base.description, "Asha Rao");
        assert_eq!(merged.email.as_deref(), Some("asha@example.com"));

        let fresh = upsert_by_phone(
            &db,
            &CustomerDto {
                name: "Kiran".into(),
                phone: "9000000001".into(),
                ..Default::default()
            },
            Some("lead-1"),
        )
        .await
        .unwrap();
        assert_eq!(fresh.base.code, "CUST-0002");
        assert_eq!(fresh.source_lead_id.as_deref(), Some("lead-1"));
    }

    #[tokio::test]
    async fn search_matches_phone_fragment() {
        let db = connect_in_memory().await.unwrap();
        create_customer(&db, "Asha", "9845012345").await;
        create_customer(&db, "Ravi", "9000000001").await;
        let found = search_by_phone(&db, "12 345").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].base.description, "Asha");
        assert!(search_by_phone(&db, "abc").await.is_err());
    }

    #[tokio::test]
    async fn renew_extends_active_pass_and_refresh_expires_old_ones() {
        let db = connect_in_memory().await.unwrap();
        let customer = create_customer(&db, "Asha", "9845012345").await;
        let id = customer.base.id.value();

        let renewed = renew_uptime_pass(&db, id, RenewUptimePassDto { months: Some(6) })
            .await
            .unwrap();
        let first_expiry = renewed.uptime_pass.expiry.unwrap();
        let renewed = renew_uptime_pass(&db, id, RenewUptimePassDto { months: Some(6) })
            .await
            .unwrap();
        assert!(renewed.uptime_pass.expiry.unwrap() > first_expiry);
        assert_eq!(renewed.uptime_pass.status, UptimePassStatus::Active);

        let far_future = first_expiry + chrono::Duration::days(400);
        let result = refresh_expired_passes(&db, far_future).await.unwrap();
        assert_eq!(result.expired_count, 1);
        let stored = repository::get_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(stored.uptime_pass.status, UptimePassStatus::Expired);
    }
}
