//! A customer buys with the Uptime Pass and comes back for a repair.

use backend::domain::{a002_customer, a003_inventory_item, a004_sale, a005_payment, a007_service_ticket};
use backend::shared::data::db::connect_in_memory;
use backend::shared::error::AppError;
use backend::system::users;
use chrono::Utc;
use contracts::domain::a003_inventory_item::aggregate::{InventoryItemDto, ItemKind};
use contracts::domain::a004_sale::aggregate::{CreateSaleDto, SaleCustomerDto};
use contracts::domain::a005_payment::aggregate::{PaymentListQuery, PaymentSplit};
use contracts::domain::a007_service_ticket::aggregate::{
    AddServicePartDto, CloseTicketDto, ServiceTicketDto, TicketStatus,
};
use contracts::system::auth::TokenClaims;
use contracts::system::roles::Role;
use contracts::system::users::CreateUserDto;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

fn item(sku: &str, kind: ItemKind, quantity: i32, price: f64) -> InventoryItemDto {
    InventoryItemDto {
        id: None,
        sku: sku.into(),
        model: format!("Item {}", sku),
        kind,
        variant: None,
        color: None,
        chassis_no: (kind == ItemKind::Vehicle).then(|| format!("CH-{}", sku)),
        motor_no: None,
        battery_no: None,
        quantity: Some(quantity),
        low_stock_threshold: Some(1),
        purchase_price: price * 0.8,
        selling_price: price,
        status: None,
        comment: None,
    }
}

async fn technician(db: &DatabaseConnection, username: &str) -> TokenClaims {
    let id = users::service::create(
        db,
        CreateUserDto {
            username: username.into(),
            password: "workshop1".into(),
            email: None,
            full_name: None,
            role: Role::Technician,
        },
        None,
    )
    .await
    .unwrap();
    TokenClaims {
        sub: id,
        username: username.into(),
        role: Role::Technician,
        exp: 0,
        iat: 0,
    }
}

#[tokio::test]
async fn pass_holder_pays_only_for_parts() {
    let db = connect_in_memory().await.unwrap();
    let tech = technician(&db, "ravi").await;
    let vehicle = a003_inventory_item::service::create(&db, item("V-1", ItemKind::Vehicle, 1, 90_000.0))
        .await
        .unwrap();
    let brake_pad = a003_inventory_item::service::create(&db, item("SP-PAD", ItemKind::SparePart, 4, 350.0))
        .await
        .unwrap();

    let sale = a004_sale::service::create_sale(
        &db,
        CreateSaleDto {
            customer: Some(SaleCustomerDto {
                name: "Walk-in Buyer".into(),
                phone: "9333333333".into(),
                ..Default::default()
            }),
            vehicle_id: vehicle.base.id.value().to_string(),
            payments: PaymentSplit {
                cash: 90_000.0,
                ..Default::default()
            },
            uptime_pass: true,
            ..Default::default()
        },
        None,
    )
    .await
    .unwrap();
    assert_eq!(sale.balance_due, 0.0);

    let customer = a002_customer::service::get_by_id(&db, Uuid::parse_str(&sale.customer_id).unwrap())
        .await
        .unwrap();
    assert!(customer.uptime_pass.is_active_on(Utc::now().date_naive()));

    let ticket = a007_service_ticket::service::create(
        &db,
        ServiceTicketDto {
            customer_id: sale.customer_id.clone(),
            vehicle_item_id: Some(vehicle.base.id.value().to_string()),
            complaint: "Brakes squeal".into(),
            labour_charge: Some(600.0),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(ticket.base.code, "SRV-0001");
    assert_eq!(ticket.status, TicketStatus::Assigned);
    assert_eq!(ticket.assigned_technician_id.as_deref(), Some(tech.sub.as_str()));

    let id = ticket.base.id.value();
    a007_service_ticket::service::add_part(
        &db,
        id,
        AddServicePartDto {
            item_id: brake_pad.base.id.value().to_string(),
            quantity: 2,
            unit_price: None,
        },
    )
    .await
    .unwrap();

    // Closing before the work is done
    let err = a007_service_ticket::service::close(&db, id, CloseTicketDto::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    a007_service_ticket::service::change_status(&db, id, TicketStatus::InProgress, &tech)
        .await
        .unwrap();
    a007_service_ticket::service::change_status(&db, id, TicketStatus::Completed, &tech)
        .await
        .unwrap();

    let closed = a007_service_ticket::service::close(
        &db,
        id,
        CloseTicketDto {
            payments: PaymentSplit {
                upi: 700.0,
                upi_reference: Some("UPI-77".into()),
                ..Default::default()
            },
        },
        Some(tech.sub.as_str()),
    )
    .await
    .unwrap();
    assert!(closed.covered_by_pass);
    assert_eq!(closed.final_amount, 700.0);

    let ticket = a007_service_ticket::service::get_by_id(&db, id).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::Closed);
    assert_eq!(ticket.labour_charge, 0.0);

    let brake_pad = a003_inventory_item::service::get_by_id(&db, brake_pad.base.id.value())
        .await
        .unwrap();
    assert_eq!(brake_pad.quantity, 2);

    let payments = a005_payment::service::list(
        &db,
        &PaymentListQuery {
            customer_id: Some(sale.customer_id.clone()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(payments.len(), 2);
    assert!(payments
        .iter()
        .any(|p| p.service_ticket_id.as_deref() == Some(closed.id.as_str()) && p.amount == 700.0));
}
