use contracts::domain::a001_lead::aggregate::{Lead, LeadStage};
use contracts::domain::a002_customer::aggregate::CustomerDto;
use contracts::domain::a003_inventory_item::aggregate::{InventoryItem, ItemKind};
use contracts::domain::a004_sale::aggregate::{
    CreateSaleDto, Sale, SaleCreatedResponse, SaleDetails, SaleId, SaleLine, SaleListQuery,
    SaleTotals,
};
use contracts::domain::a005_payment::aggregate::RecordPaymentDto;
use contracts::domain::common::money::round2;
use contracts::domain::common::{AggregateId, AggregateRoot, BaseAggregate};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use uuid::Uuid;

use super::{line_repository, repository};
use crate::domain::a005_payment::service::PaymentTarget;
use crate::domain::{
    a001_lead, a002_customer, a003_inventory_item, a005_payment, a006_referral, parse_ref,
};
use crate::shared::config;
use crate::shared::data::numbering;
use crate::shared::error::{AppError, AppResult};

pub async fn list(db: &DatabaseConnection, query: &SaleListQuery) -> AppResult<Vec<Sale>> {
    let mut sales = repository::list(db, query).await?;
    for sale in &mut sales {
        sale.lines = line_repository::list_by_sale(db, &sale.base.id.as_string()).await?;
    }
    Ok(sales)
}

/// Sale with its lines, or NotFound
pub(crate) async fn load<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Sale> {
    let mut sale = repository::get_by_id(conn, id)
        .await?
        .filter(|s| !s.base.metadata.is_deleted)
        .ok_or_else(|| AppError::not_found(Sale::element_name(), id))?;
    sale.lines = line_repository::list_by_sale(conn, &id.to_string()).await?;
    Ok(sale)
}

pub async fn get_details(db: &DatabaseConnection, id: Uuid) -> AppResult<SaleDetails> {
    let sale = load(db, id).await?;
    let payments = a005_payment::repository::list_by_sale(db, &id.to_string()).await?;
    Ok(SaleDetails { sale, payments })
}

/// Buyer contact: explicit details win, blanks fall back to the lead
fn buyer_details(dto: &CreateSaleDto, lead: Option<&Lead>) -> AppResult<CustomerDto> {
    match (&dto.customer, lead) {
        (Some(c), lead) => {
            let pick = |given: &str, from_lead: Option<&str>| {
                if given.trim().is_empty() {
                    from_lead.unwrap_or_default().to_string()
                } else {
                    given.to_string()
                }
            };
            Ok(CustomerDto {
                id: None,
                name: pick(&c.name, lead.map(|l| l.base.description.as_str())),
                phone: pick(&c.phone, lead.map(|l| l.phone.as_str())),
                email: c.email.clone().or_else(|| lead.and_then(|l| l.email.clone())),
                address: c.address.clone(),
                comment: None,
            })
        }
        (None, Some(lead)) => Ok(CustomerDto {
            id: None,
            name: lead.base.description.clone(),
            phone: lead.phone.clone(),
            email: lead.email.clone(),
            address: None,
            comment: None,
        }),
        (None, None) => Err(AppError::Validation(
            "Customer details are required when the sale has no lead".into(),
        )),
    }
}

async fn load_open_lead<C: ConnectionTrait>(conn: &C, lead_id: &str) -> AppResult<Lead> {
    let lead = a001_lead::service::load(conn, parse_ref("lead", lead_id)?).await?;
    match lead.stage {
        LeadStage::Won => Err(AppError::Conflict(format!(
            "Lead {} is already converted to sale {}",
            lead.base.code,
            lead.converted_sale_id.as_deref().unwrap_or("?")
        ))),
        LeadStage::Lost => Err(AppError::Conflict(format!(
            "Lead {} is lost; reopen it before selling",
            lead.base.code
        ))),
        _ => Ok(lead),
    }
}

/// Close a sale. Every write happens in one transaction: the customer upsert,
/// sale and lines, stock deduction, payment ledger, Uptime Pass, referral
/// credit and the lead conversion. Any failure leaves the database untouched.
pub async fn create_sale(
    db: &DatabaseConnection,
    dto: CreateSaleDto,
    sold_by: Option<&str>,
) -> AppResult<SaleCreatedResponse> {
    let txn = db.begin().await?;
    let today = config::today();

    let mut lead = match dto.lead_id.as_deref() {
        Some(lead_id) => Some(load_open_lead(&txn, lead_id).await?),
        None => None,
    };
    let lead_id = lead.as_ref().map(|l| l.base.id.as_string());

    let buyer = buyer_details(&dto, lead.as_ref())?;
    let mut customer =
        a002_customer::service::upsert_by_phone(&txn, &buyer, lead_id.as_deref()).await?;
    let customer_id = customer.base.id.as_string();

    let vehicle = a003_inventory_item::service::load_ref(&txn, &dto.vehicle_id).await?;
    if vehicle.kind != ItemKind::Vehicle {
        return Err(AppError::Validation(format!(
            "{} is not a vehicle",
            vehicle.base.code
        )));
    }
    if !vehicle.is_available_vehicle() {
        return Err(AppError::Conflict(format!(
            "Vehicle {} is not available (status {})",
            vehicle.base.code, vehicle.status
        )));
    }

    let mut accessories: Vec<(InventoryItem, i32, f64)> = Vec::with_capacity(dto.accessories.len());
    for line in &dto.accessories {
        let item = a003_inventory_item::service::load_ref(&txn, &line.item_id).await?;
        if item.kind == ItemKind::Vehicle {
            return Err(AppError::Validation(format!(
                "Vehicle {} cannot be sold as an accessory",
                item.base.code
            )));
        }
        if item.quantity < line.quantity {
            return Err(AppError::Conflict(format!(
                "Insufficient stock for {}: requested {}, available {}",
                item.base.code, line.quantity, item.quantity
            )));
        }
        let unit_price = line.unit_price.unwrap_or(item.selling_price);
        accessories.push((item, line.quantity, unit_price));
    }

    let vehicle_price = dto.vehicle_price.unwrap_or(vehicle.selling_price);
    let priced: Vec<(i32, f64)> = accessories.iter().map(|(_, q, p)| (*q, *p)).collect();
    let totals = SaleTotals::compute(vehicle_price, &priced, dto.discount, &dto.payments)
        .map_err(AppError::Validation)?;

    let sale_no = numbering::next_number(
        &txn,
        "a004_sale",
        "code",
        &config::current().dealership.sale_prefix,
    )
    .await?;
    let sale_uuid = SaleId::new_v4();
    let sale_id = sale_uuid.as_string();

    let mut lines = Vec::with_capacity(accessories.len() + 1);
    lines.push(SaleLine {
        id: Uuid::new_v4().to_string(),
        sale_id: sale_id.clone(),
        item_id: vehicle.base.id.as_string(),
        description: vehicle.base.description.clone(),
        quantity: 1,
        unit_price: totals.vehicle_price,
        line_total: totals.vehicle_price,
    });
    for (item, quantity, unit_price) in &accessories {
        lines.push(SaleLine {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            item_id: item.base.id.as_string(),
            description: item.base.description.clone(),
            quantity: *quantity,
            unit_price: round2(*unit_price),
            line_total: round2(f64::from(*quantity) * unit_price),
        });
    }

    let mut base = BaseAggregate::new(
        sale_uuid,
        sale_no.clone(),
        format!("{} to {}", vehicle.base.description, customer.base.description),
    );
    base.comment = dto.comment.clone();
    let mut sale = Sale {
        base,
        lead_id: lead_id.clone(),
        customer_id: customer_id.clone(),
        vehicle_id: vehicle.base.id.as_string(),
        sale_date: dto.sale_date.unwrap_or(today),
        vehicle_price: totals.vehicle_price,
        accessories_total: totals.accessories_total,
        subtotal: totals.subtotal,
        discount: totals.discount,
        total_amount: totals.total,
        cash_amount: round2(dto.payments.cash),
        upi_amount: round2(dto.payments.upi),
        finance_amount: round2(dto.payments.finance),
        finance_provider: dto.payments.finance_provider.clone(),
        amount_paid: totals.paid,
        balance_due: totals.balance_due,
        uptime_pass: dto.uptime_pass,
        referral_id: None,
        sold_by: sold_by.map(str::to_string),
        lines,
    };
    repository::insert(&txn, &sale).await?;
    for line in &sale.lines {
        line_repository::insert(&txn, line).await?;
    }

    a003_inventory_item::service::deduct(&txn, &sale.vehicle_id, 1).await?;
    for (item, quantity, _) in &accessories {
        a003_inventory_item::service::deduct(&txn, &item.base.id.as_string(), *quantity).await?;
    }

    a005_payment::service::record_split(
        &txn,
        PaymentTarget::Sale(&sale_id),
        &customer_id,
        &dto.payments,
        sold_by,
    )
    .await?;

    if dto.uptime_pass {
        a002_customer::service::apply_uptime_pass(&mut customer, today, dto.uptime_pass_months)?;
    }
    customer.record_purchase(sale.total_amount);
    customer.before_write();
    a002_customer::repository::update(&txn, &customer).await?;

    // Without an explicit referrer the lead's live pending referral decides;
    // a cancelled one credits nobody
    let pending_referrer = match lead_id.as_deref() {
        Some(lead_id) => a006_referral::service::pending_referrer(&txn, lead_id).await?,
        None => None,
    };
    let referrer = dto
        .referral_customer_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .or(pending_referrer);
    if let Some(referrer_id) = referrer {
        let referral = a006_referral::service::settle_for_sale(
            &txn,
            &referrer_id,
            lead_id.as_deref(),
            &customer_id,
            &sale_id,
        )
        .await?;
        sale.referral_id = Some(referral.id.clone());
        repository::update(&txn, &sale).await?;
    }

    if let Some(lead) = lead.as_mut() {
        lead.mark_won(&sale_id).map_err(AppError::Conflict)?;
        lead.before_write();
        a001_lead::repository::update(&txn, lead).await?;
    }

    txn.commit().await?;
    tracing::info!(
        "Sale {} closed for {}: total {:.2}, balance {:.2}",
        sale.sale_no(),
        customer.base.code,
        sale.total_amount,
        sale.balance_due
    );

    Ok(SaleCreatedResponse {
        id: sale_id,
        sale_no,
        customer_id,
        total_amount: sale.total_amount,
        balance_due: sale.balance_due,
    })
}

/// Later instalment against the balance due
pub async fn record_payment(
    db: &DatabaseConnection,
    id: Uuid,
    dto: RecordPaymentDto,
    received_by: Option<&str>,
) -> AppResult<SaleDetails> {
    let txn = db.begin().await?;
    let mut sale = load(&txn, id).await?;
    dto.validate().map_err(AppError::Validation)?;
    sale.apply_payment(dto.amount).map_err(AppError::Validation)?;
    let sale_id = sale.base.id.as_string();
    a005_payment::service::record_single(
        &txn,
        PaymentTarget::Sale(&sale_id),
        &sale.customer_id,
        &dto,
        received_by,
    )
    .await?;
    sale.base.touch();
    repository::update(&txn, &sale).await?;
    let payments = a005_payment::repository::list_by_sale(&txn, &sale_id).await?;
    txn.commit().await?;
    tracing::info!(
        "Payment of {:.2} on {}, balance {:.2}",
        dto.amount,
        sale.sale_no(),
        sale.balance_due
    );
    Ok(SaleDetails { sale, payments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a001_lead::service::tests::create_lead;
    use crate::domain::a002_customer::service::tests::create_customer;
    use crate::domain::a003_inventory_item::service::tests::{add_stock, add_vehicle};
    use crate::shared::data::db::connect_in_memory;
    use contracts::domain::a004_sale::aggregate::{SaleAccessoryDto, SaleCustomerDto};
    use contracts::domain::a005_payment::aggregate::{PaymentMode, PaymentSplit};
    use contracts::domain::a001_lead::aggregate::LeadDto;
    use contracts::domain::a003_inventory_item::aggregate::StockStatus;
    use contracts::domain::a006_referral::aggregate::{
        CreateReferralDto, ReferralListQuery, ReferralStatus,
    };

    fn cash(amount: f64) -> PaymentSplit {
        PaymentSplit {
            cash: amount,
            ..Default::default()
        }
    }

    fn walk_in(name: &str, phone: &str) -> Option<SaleCustomerDto> {
        Some(SaleCustomerDto {
            name: name.into(),
            phone: phone.into(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_sale_from_lead_converts_it() {
        let db = connect_in_memory().await.unwrap();
        let lead = create_lead(&db, "Ravi Kumar", "9876543210").await;
        let vehicle = add_vehicle(&db, "V-001", 95_000.0).await;
        let helmet = add_stock(&db, "ACC-HELMET", ItemKind::Accessory, 5, 1_500.0).await;

        let created = create_sale(
            &db,
            CreateSaleDto {
                lead_id: Some(lead.base.id.as_string()),
                vehicle_id: vehicle.base.id.as_string(),
                accessories: vec![SaleAccessoryDto {
                    item_id: helmet.base.id.as_string(),
                    quantity: 2,
                    unit_price: None,
                }],
                discount: 1_000.0,
                payments: PaymentSplit {
                    cash: 20_000.0,
                    upi: 5_000.0,
                    upi_reference: Some("UPI-77".into()),
                    ..Default::default()
                },
                uptime_pass: true,
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(created.sale_no, "SALE-0001");
        assert_eq!(created.total_amount, 97_000.0);
        assert_eq!(created.balance_due, 72_000.0);

        let details = get_details(&db, Uuid::parse_str(&created.id).unwrap()).await.unwrap();
        assert_eq!(details.sale.sale_no(), created.sale_no);
        assert_eq!(details.sale.lines.len(), 2);
        assert_eq!(details.payments.len(), 2);
        assert!(details.payments.iter().any(|p| p.mode == PaymentMode::Upi));

        let lead = a001_lead::service::get_by_id(&db, lead.base.id.value()).await.unwrap();
        assert_eq!(lead.stage, LeadStage::Won);
        assert_eq!(lead.converted_sale_id.as_deref(), Some(created.id.as_str()));

        let vehicle = a003_inventory_item::service::get_by_id(&db, vehicle.base.id.value())
            .await
            .unwrap();
        assert_eq!(vehicle.status, StockStatus::Sold);
        let helmet = a003_inventory_item::service::get_by_id(&db, helmet.base.id.value())
            .await
            .unwrap();
        assert_eq!(helmet.quantity, 3);

        let customer = a002_customer::service::get_by_id(
            &db,
            Uuid::parse_str(&created.customer_id).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(customer.total_purchases, 1);
        assert!(customer.uptime_pass.is_active_on(config::today()));
        assert_eq!(customer.source_lead_id.as_deref(), Some(lead.base.id.as_string().as_str()));
    }

    #[tokio::test]
    async fn test_converting_twice_is_a_conflict() {
        let db = connect_in_memory().await.unwrap();
        let lead = create_lead(&db, "Ravi Kumar", "9876543210").await;
        let first = add_vehicle(&db, "V-001", 90_000.0).await;
        let second = add_vehicle(&db, "V-002", 90_000.0).await;

        let sell = |vehicle_id: String| CreateSaleDto {
            lead_id: Some(lead.base.id.as_string()),
            vehicle_id,
            ..Default::default()
        };
        create_sale(&db, sell(first.base.id.as_string()), None).await.unwrap();
        let err = create_sale(&db, sell(second.base.id.as_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_shortage_rolls_back_everything() {
        let db = connect_in_memory().await.unwrap();
        let vehicle = add_vehicle(&db, "V-001", 90_000.0).await;
        let guard = add_stock(&db, "ACC-GUARD", ItemKind::Accessory, 1, 800.0).await;

        let err = create_sale(
            &db,
            CreateSaleDto {
                customer: walk_in("Meena", "9000000001"),
                vehicle_id: vehicle.base.id.as_string(),
                accessories: vec![SaleAccessoryDto {
                    item_id: guard.base.id.as_string(),
                    quantity: 2,
                    unit_price: None,
                }],
                payments: cash(10_000.0),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert!(list(&db, &SaleListQuery::default()).await.unwrap().is_empty());
        assert!(a002_customer::service::list_all(&db).await.unwrap().is_empty());
        let vehicle = a003_inventory_item::service::get_by_id(&db, vehicle.base.id.value())
            .await
            .unwrap();
        assert_eq!(vehicle.status, StockStatus::InStock);
    }

    #[tokio::test]
    async fn test_sold_vehicle_cannot_be_sold_again() {
        let db = connect_in_memory().await.unwrap();
        let vehicle = add_vehicle(&db, "V-001", 90_000.0).await;
        let dto = |phone: &str| CreateSaleDto {
            customer: walk_in("Buyer", phone),
            vehicle_id: vehicle.base.id.as_string(),
            ..Default::default()
        };
        create_sale(&db, dto("9000000001"), None).await.unwrap();
        let err = create_sale(&db, dto("9000000002"), None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_overpayment_is_rejected() {
        let db = connect_in_memory().await.unwrap();
        let vehicle = add_vehicle(&db, "V-001", 50_000.0).await;
        let err = create_sale(
            &db,
            CreateSaleDto {
                customer: walk_in("Meena", "9000000001"),
                vehicle_id: vehicle.base.id.as_string(),
                payments: cash(50_000.01),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_referral_is_credited() {
        let db = connect_in_memory().await.unwrap();
        let referrer = create_customer(&db, "Old Customer", "9111111111").await;
        let vehicle = add_vehicle(&db, "V-001", 80_000.0).await;

        let created = create_sale(
            &db,
            CreateSaleDto {
                customer: walk_in("New Buyer", "9222222222"),
                vehicle_id: vehicle.base.id.as_string(),
                referral_customer_id: Some(referrer.base.id.as_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

        let referrer = a002_customer::service::get_by_id(&db, referrer.base.id.value())
            .await
            .unwrap();
        assert_eq!(referrer.referral_count, 1);
        assert_eq!(
            referrer.referral_credit,
            config::current().dealership.referral_reward
        );
        let details = get_details(&db, Uuid::parse_str(&created.id).unwrap()).await.unwrap();
        assert!(details.sale.referral_id.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_referrer_is_not_credited() {
        let db = connect_in_memory().await.unwrap();
        let first = create_customer(&db, "First Referrer", "9111111111").await;
        let second = create_customer(&db, "Second Referrer", "9333333333").await;
        let vehicle = add_vehicle(&db, "V-001", 80_000.0).await;
        let lead = a001_lead::service::create(
            &db,
            LeadDto {
                name: "New Buyer".into(),
                phone: "9222222222".into(),
                referred_by_customer_id: Some(first.base.id.as_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let lead_id = lead.base.id.as_string();

        let original = a006_referral::service::list(&db, &ReferralListQuery::default())
            .await
            .unwrap();
        assert_eq!(original.len(), 1);
        a006_referral::service::cancel(&db, &original[0].id).await.unwrap();
        let manual = a006_referral::service::create(
            &db,
            CreateReferralDto {
                referrer_customer_id: second.base.id.as_string(),
                lead_id: lead_id.clone(),
                comment: None,
            },
        )
        .await
        .unwrap();

        let created = create_sale(
            &db,
            CreateSaleDto {
                lead_id: Some(lead_id),
                vehicle_id: vehicle.base.id.as_string(),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

        let details = get_details(&db, Uuid::parse_str(&created.id).unwrap()).await.unwrap();
        assert_eq!(details.sale.referral_id.as_deref(), Some(manual.id.as_str()));

        let referrals = a006_referral::service::list(&db, &ReferralListQuery::default())
            .await
            .unwrap();
        let status_of = |id: &str| referrals.iter().find(|r| r.id == id).map(|r| r.status);
        assert_eq!(status_of(&original[0].id), Some(ReferralStatus::Cancelled));
        assert_eq!(status_of(&manual.id), Some(ReferralStatus::Converted));

        let first = a002_customer::service::get_by_id(&db, first.base.id.value()).await.unwrap();
        let second = a002_customer::service::get_by_id(&db, second.base.id.value()).await.unwrap();
        assert_eq!(first.referral_count, 0);
        assert_eq!(first.referral_credit, 0.0);
        assert_eq!(second.referral_count, 1);
    }

    #[tokio::test]
    async fn test_cancelled_referral_without_replacement_credits_nobody() {
        let db = connect_in_memory().await.unwrap();
        let referrer = create_customer(&db, "Old Customer", "9111111111").await;
        let vehicle = add_vehicle(&db, "V-001", 80_000.0).await;
        let lead = a001_lead::service::create(
            &db,
            LeadDto {
                name: "New Buyer".into(),
                phone: "9222222222".into(),
                referred_by_customer_id: Some(referrer.base.id.as_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let pending = a006_referral::service::list(&db, &ReferralListQuery::default())
            .await
            .unwrap();
        a006_referral::service::cancel(&db, &pending[0].id).await.unwrap();

        let created = create_sale(
            &db,
            CreateSaleDto {
                lead_id: Some(lead.base.id.as_string()),
                vehicle_id: vehicle.base.id.as_string(),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

        let details = get_details(&db, Uuid::parse_str(&created.id).unwrap()).await.unwrap();
        assert_eq!(details.sale.referral_id, None);
        let referrer = a002_customer::service::get_by_id(&db, referrer.base.id.value())
            .await
            .unwrap();
        assert_eq!(referrer.referral_count, 0);
    }

    #[tokio::test]
    async fn test_later_payment_reduces_balance() {
        let db = connect_in_memory().await.unwrap();
        let vehicle = add_vehicle(&db, "V-001", 60_000.0).await;
        let created = create_sale(
            &db,
            CreateSaleDto {
                customer: walk_in("Meena", "9000000001"),
                vehicle_id: vehicle.base.id.as_string(),
                payments: cash(20_000.0),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
        let id = Uuid::parse_str(&created.id).unwrap();

        let details = record_payment(
            &db,
            id,
            RecordPaymentDto {
                mode: PaymentMode::Upi,
                amount: 15_000.0,
                reference: Some("UPI-1".into()),
                finance_provider: None,
            },
            None,
        )
        .await
        .unwrap();
        assert_eq!(details.sale.balance_due, 25_000.0);
        assert_eq!(details.payments.len(), 2);

        let err = record_payment(
            &db,
            id,
            RecordPaymentDto {
                mode: PaymentMode::Cash,
                amount: 25_000.5,
                reference: None,
                finance_provider: None,
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
