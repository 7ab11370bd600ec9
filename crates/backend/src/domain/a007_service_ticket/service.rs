use contracts::domain::a003_inventory_item::aggregate::ItemKind;
use contracts::domain::a007_service_ticket::aggregate::{
    AddServicePartDto, CloseTicketDto, ServicePart, ServiceTicket, ServiceTicketDto,
    ServiceTicketListQuery, TicketClosedResponse, TicketStatus,
};
use contracts::domain::common::money::amounts_equal;
use contracts::domain::common::AggregateRoot;
use contracts::system::auth::TokenClaims;
use contracts::system::roles::Role;
use contracts::system::users::User;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use super::{part_repository, repository};
use crate::domain::a005_payment::service::PaymentTarget;
use crate::domain::{a002_customer, a003_inventory_item, a005_payment, parse_ref};
use crate::shared::config;
use crate::shared::data::{numbering, settings};
use crate::shared::error::{AppError, AppResult};
use crate::system::users::repository as users;

/// `sys_settings` key holding the next round-robin position
const RR_CURSOR_KEY: &str = "service_rr_cursor";

pub async fn list(
    db: &DatabaseConnection,
    query: &ServiceTicketListQuery,
) -> AppResult<Vec<ServiceTicket>> {
    Ok(repository::list(db, query).await?)
}

pub async fn get_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<ServiceTicket> {
    load(db, id).await
}

/// Ticket with its parts, or NotFound
pub(crate) async fn load<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<ServiceTicket> {
    let mut ticket = repository::get_by_id(conn, id)
        .await?
        .filter(|t| !t.base.metadata.is_deleted)
        .ok_or_else(|| AppError::not_found(ServiceTicket::element_name(), id))?;
    ticket.parts = part_repository::list_by_ticket(conn, &id.to_string()).await?;
    Ok(ticket)
}

async fn active_technician<C: ConnectionTrait>(conn: &C, user_id: &str) -> AppResult<User> {
    match users::get_by_id(conn, user_id).await? {
        Some(user) if user.is_active && user.role == Role::Technician => Ok(user),
        Some(user) => Err(AppError::Validation(format!(
            "User '{}' is not an active technician",
            user.username
        ))),
        None => Err(AppError::Validation(format!("Unknown user '{}'", user_id))),
    }
}

/// Next technician in rotation; advances the stored cursor
async fn next_technician<C: ConnectionTrait>(conn: &C) -> AppResult<Option<User>> {
    let technicians = users::list_active_by_role(conn, Role::Technician).await?;
    if technicians.is_empty() {
        return Ok(None);
    }
    let cursor = settings::get(conn, RR_CURSOR_KEY)
        .await?
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);
    let index = (cursor % technicians.len() as u64) as usize;
    settings::set(conn, RR_CURSOR_KEY, &(cursor + 1).to_string()).await?;
    Ok(technicians.into_iter().nth(index))
}

/// Open a ticket. Without an explicit technician it is allocated round-robin;
/// it stays OPEN when nobody can take it.
pub async fn create(db: &DatabaseConnection, dto: ServiceTicketDto) -> AppResult<ServiceTicket> {
    let txn = db.begin().await?;
    let customer = a002_customer::service::load(&txn, parse_ref("customer", &dto.customer_id)?).await?;
    if let Some(vehicle_id) = dto.vehicle_item_id.as_deref() {
        a003_inventory_item::service::load_ref(&txn, vehicle_id).await?;
    }

    let code = numbering::next_number(
        &txn,
        "a007_service_ticket",
        "code",
        &config::current().dealership.ticket_prefix,
    )
    .await?;
    let mut ticket = ServiceTicket::new_for_insert(code, &dto);
    ticket.validate().map_err(AppError::Validation)?;

    let technician = match dto.assigned_technician_id.as_deref() {
        Some(user_id) if !user_id.trim().is_empty() => Some(active_technician(&txn, user_id).await?),
        _ => next_technician(&txn).await?,
    };
    if let Some(technician) = &technician {
        ticket.assign(&technician.id).map_err(AppError::Conflict)?;
    }

    repository::insert(&txn, &ticket).await?;
    txn.commit().await?;

    match &technician {
        Some(technician) => tracing::info!(
            "Ticket {} for {} allocated to {}",
            ticket.base.code,
            customer.base.code,
            technician.username
        ),
        None => tracing::warn!(
            "Ticket {} for {} left unassigned: no active technicians",
            ticket.base.code,
            customer.base.code
        ),
    }
    Ok(ticket)
}

pub async fn update(db: &DatabaseConnection, id: Uuid, dto: ServiceTicketDto) -> AppResult<ServiceTicket> {
    let mut ticket = load(db, id).await?;
    ticket.update(&dto).map_err(AppError::Conflict)?;
    ticket.validate().map_err(AppError::Validation)?;
    ticket.before_write();
    repository::update(db, &ticket).await?;
    Ok(ticket)
}

pub async fn assign(db: &DatabaseConnection, id: Uuid, technician_id: &str) -> AppResult<ServiceTicket> {
    let mut ticket = load(db, id).await?;
    let technician = active_technician(db, technician_id).await?;
    ticket.assign(&technician.id).map_err(AppError::Conflict)?;
    ticket.before_write();
    repository::update(db, &ticket).await?;
    tracing::info!("Ticket {} assigned to {}", ticket.base.code, technician.username);
    Ok(ticket)
}

/// Technicians may only move tickets assigned to them
pub async fn change_status(
    db: &DatabaseConnection,
    id: Uuid,
    status: TicketStatus,
    actor: &TokenClaims,
) -> AppResult<ServiceTicket> {
    let mut ticket = load(db, id).await?;
    if actor.role == Role::Technician
        && ticket.assigned_technician_id.as_deref() != Some(actor.sub.as_str())
    {
        tracing::warn!(
            "{} tried to move ticket {} assigned to someone else",
            actor.username,
            ticket.base.code
        );
        return Err(AppError::Forbidden);
    }
    ticket.change_status(status).map_err(AppError::Conflict)?;
    ticket.before_write();
    repository::update(db, &ticket).await?;
    Ok(ticket)
}

/// Parts are priced now and taken out of stock when the ticket closes
pub async fn add_part(db: &DatabaseConnection, id: Uuid, dto: AddServicePartDto) -> AppResult<ServiceTicket> {
    let txn = db.begin().await?;
    let mut ticket = load(&txn, id).await?;
    let item = a003_inventory_item::service::load_ref(&txn, &dto.item_id).await?;
    if item.kind == ItemKind::Vehicle {
        return Err(AppError::Validation(format!(
            "Vehicle {} cannot be used as a part",
            item.base.code
        )));
    }
    let part = ServicePart::new(
        &ticket.base.id.value().to_string(),
        &item.base.id.value().to_string(),
        &item.base.description,
        dto.quantity,
        dto.unit_price.unwrap_or(item.selling_price),
    )
    .map_err(AppError::Validation)?;
    ticket.add_part(part.clone()).map_err(AppError::Conflict)?;
    part_repository::insert(&txn, &part).await?;
    ticket.before_write();
    repository::update(&txn, &ticket).await?;
    txn.commit().await?;
    Ok(ticket)
}

/// Close a completed ticket: parts leave stock, labour is waived under an
/// active Uptime Pass and the split must settle the final amount exactly.
pub async fn close(
    db: &DatabaseConnection,
    id: Uuid,
    dto: CloseTicketDto,
    received_by: Option<&str>,
) -> AppResult<TicketClosedResponse> {
    let txn = db.begin().await?;
    let mut ticket = load(&txn, id).await?;
    if ticket.status != TicketStatus::Completed {
        return Err(AppError::Conflict(format!(
            "Ticket {} must be COMPLETED before closing (currently {})",
            ticket.base.code, ticket.status
        )));
    }
    let mut customer =
        a002_customer::service::load(&txn, parse_ref("customer", &ticket.customer_id)?).await?;
    let today = config::today();

    let amounts = ticket.closing_amounts(customer.uptime_pass.is_active_on(today));
    dto.payments.validate().map_err(AppError::Validation)?;
    if !amounts_equal(dto.payments.total(), amounts.final_amount) {
        return Err(AppError::Validation(format!(
            "Payments {:.2} must equal the final amount {:.2}",
            dto.payments.total(),
            amounts.final_amount
        )));
    }
    ticket.close(amounts).map_err(AppError::Conflict)?;

    for part in &ticket.parts {
        a003_inventory_item::service::deduct(&txn, &part.item_id, part.quantity).await?;
    }
    let ticket_id = ticket.base.id.value().to_string();
    a005_payment::service::record_split(
        &txn,
        PaymentTarget::ServiceTicket(&ticket_id),
        &ticket.customer_id,
        &dto.payments,
        received_by,
    )
    .await?;

    customer.last_service_date = Some(today);
    customer.before_write();
    a002_customer::repository::update(&txn, &customer).await?;
    ticket.before_write();
    repository::update(&txn, &ticket).await?;
    txn.commit().await?;

    tracing::info!(
        "Ticket {} closed: {:.2}{}",
        ticket.base.code,
        ticket.final_amount,
        if ticket.covered_by_pass { " (labour covered by Uptime Pass)" } else { "" }
    );
    Ok(TicketClosedResponse {
        id: ticket_id,
        ticket_no: ticket.base.code,
        final_amount: ticket.final_amount,
        covered_by_pass: ticket.covered_by_pass,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a002_customer::service::tests::create_customer;
    use crate::domain::a003_inventory_item::service::tests::add_stock;
    use crate::shared::data::db::connect_in_memory;
    use crate::system::users::service::tests::create_user;
    use contracts::domain::a002_customer::aggregate::RenewUptimePassDto;
    use contracts::domain::a005_payment::aggregate::PaymentSplit;

    fn claims(user_id: &str, role: Role) -> TokenClaims {
        TokenClaims {
            sub: user_id.into(),
            username: "tester".into(),
            role,
            exp: 0,
            iat: 0,
        }
    }

    async fn open_ticket(db: &DatabaseConnection, customer_id: &str, labour: f64) -> ServiceTicket {
        create(
            db,
            ServiceTicketDto {
                customer_id: customer_id.into(),
                complaint: "Brake noise".into(),
                labour_charge: Some(labour),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_round_robin_allocation() {
        let db = connect_in_memory().await.unwrap();
        let customer = create_customer(&db, "Meena", "9000000001").await;
        let tech_b = create_user(&db, "tech_b", Role::Technician).await;
        let tech_a = create_user(&db, "tech_a", Role::Technician).await;
        create_user(&db, "sales_1", Role::Sales).await;

        let id = customer.base.id.value().to_string();
        let first = open_ticket(&db, &id, 300.0).await;
        let second = open_ticket(&db, &id, 300.0).await;
        let third = open_ticket(&db, &id, 300.0).await;

        assert_eq!(first.base.code, "SRV-0001");
        assert_eq!(third.base.code, "SRV-0003");
        assert_eq!(first.assigned_technician_id.as_deref(), Some(tech_a.as_str()));
        assert_eq!(second.assigned_technician_id.as_deref(), Some(tech_b.as_str()));
        assert_eq!(third.assigned_technician_id.as_deref(), Some(tech_a.as_str()));
        assert_eq!(first.status, TicketStatus::Assigned);
    }

    #[tokio::test]
    async fn test_without_technicians_ticket_stays_open() {
        let db = connect_in_memory().await.unwrap();
        let customer = create_customer(&db, "Meena", "9000000001").await;
        let ticket = open_ticket(&db, &customer.base.id.value().to_string(), 0.0).await;
        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.assigned_technician_id.is_none());
    }

    #[tokio::test]
    async fn test_technician_moves_only_own_tickets() {
        let db = connect_in_memory().await.unwrap();
        let customer = create_customer(&db, "Meena", "9000000001").await;
        let tech = create_user(&db, "tech_a", Role::Technician).await;
        let other = create_user(&db, "tech_z", Role::Technician).await;
        let ticket = open_ticket(&db, &customer.base.id.value().to_string(), 0.0).await;
        assert_eq!(ticket.assigned_technician_id.as_deref(), Some(tech.as_str()));

        let id = ticket.base.id.value();
        let err = change_status(&db, id, TicketStatus::InProgress, &claims(&other, Role::Technician))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let moved = change_status(&db, id, TicketStatus::InProgress, &claims(&tech, Role::Technician))
            .await
            .unwrap();
        assert_eq!(moved.status, TicketStatus::InProgress);

        let err = change_status(&db, id, TicketStatus::Closed, &claims("boss", Role::Manager))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    async fn completed_ticket_with_part(db: &DatabaseConnection, customer_id: &str) -> (ServiceTicket, String) {
        let tech = create_user(db, "tech_a", Role::Technician).await;
        let pad = add_stock(db, "SP-PAD", ItemKind::SparePart, 5, 350.0).await;
        let ticket = open_ticket(db, customer_id, 500.0).await;
        let id = ticket.base.id.value();
        change_status(db, id, TicketStatus::InProgress, &claims(&tech, Role::Technician))
            .await
            .unwrap();
        add_part(
            db,
            id,
            AddServicePartDto {
                item_id: pad.base.id.value().to_string(),
                quantity: 2,
                unit_price: None,
            },
        )
        .await
        .unwrap();
        let ticket = change_status(db, id, TicketStatus::Completed, &claims(&tech, Role::Technician))
            .await
            .unwrap();
        (ticket, pad.base.id.value().to_string())
    }

    #[tokio::test]
    async fn test_close_charges_labour_and_parts() {
        let db = connect_in_memory().await.unwrap();
        let customer = create_customer(&db, "Meena", "9000000001").await;
        let (ticket, pad_id) =
            completed_ticket_with_part(&db, &customer.base.id.value().to_string()).await;
        assert_eq!(ticket.parts_total, 700.0);

        let short = close(
            &db,
            ticket.base.id.value(),
            CloseTicketDto {
                payments: PaymentSplit {
                    cash: 700.0,
                    ..Default::default()
                },
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(short, AppError::Validation(_)));

        let closed = close(
            &db,
            ticket.base.id.value(),
            CloseTicketDto {
                payments: PaymentSplit {
                    cash: 1_000.0,
                    upi: 200.0,
                    ..Default::default()
                },
            },
            None,
        )
        .await
        .unwrap();
        assert_eq!(closed.final_amount, 1_200.0);
        assert!(!closed.covered_by_pass);

        let pad = a003_inventory_item::service::load_ref(&db, &pad_id).await.unwrap();
        assert_eq!(pad.quantity, 3);
        let customer = a002_customer::service::get_by_id(&db, customer.base.id.value())
            .await
            .unwrap();
        assert_eq!(customer.last_service_date, Some(config::today()));

        let again = close(&db, ticket.base.id.value(), CloseTicketDto::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_uptime_pass_waives_labour() {
        let db = connect_in_memory().await.unwrap();
        let customer = create_customer(&db, "Meena", "9000000001").await;
        a002_customer::service::renew_uptime_pass(
            &db,
            customer.base.id.value(),
            RenewUptimePassDto { months: Some(12) },
        )
        .await
        .unwrap();
        let (ticket, _) =
            completed_ticket_with_part(&db, &customer.base.id.value().to_string()).await;

        let closed = close(
            &db,
            ticket.base.id.value(),
            CloseTicketDto {
                payments: PaymentSplit {
                    cash: 700.0,
                    ..Default::default()
                },
            },
            None,
        )
        .await
        .unwrap();
        assert!(closed.covered_by_pass);
        assert_eq!(closed.final_amount, 700.0);

        let ticket = get_by_id(&db, ticket.base.id.value()).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);
        assert_eq!(ticket.labour_charge, 0.0);
    }

    #[tokio::test]
    async fn test_manual_assignment_requires_technician() {
        let db = connect_in_memory().await.unwrap();
        let customer = create_customer(&db, "Meena", "9000000001").await;
        let sales = create_user(&db, "sales_1", Role::Sales).await;
        let err = create(
            &db,
            ServiceTicketDto {
                customer_id: customer.base.id.value().to_string(),
                complaint: "Noise".into(),
                assigned_technician_id: Some(sales),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
