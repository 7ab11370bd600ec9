use chrono::{NaiveDate, Utc};
use contracts::domain::a005_payment::aggregate::{
    ModeTotal, Payment, PaymentListQuery, PaymentMode, PaymentSplit, PaymentSummary,
    PaymentSummaryQuery, RecordPaymentDto,
};
use contracts::domain::common::money::round2;
use sea_orm::{ConnectionTrait, DatabaseConnection};

use super::repository;
use crate::shared::error::{AppError, AppResult};

/// What a ledger entry is paid against
#[derive(Debug, Clone, Copy)]
pub(crate) enum PaymentTarget<'a> {
    Sale(&'a str),
    ServiceTicket(&'a str),
}

pub async fn list(db: &DatabaseConnection, query: &PaymentListQuery) -> AppResult<Vec<Payment>> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::Validation("'from' must not be after 'to'".into()));
        }
    }
    Ok(repository::list(db, query).await?)
}

fn new_payment(
    target: PaymentTarget<'_>,
    customer_id: &str,
    mode: PaymentMode,
    amount: f64,
    reference: Option<String>,
    finance_provider: Option<String>,
    received_by: Option<&str>,
) -> Payment {
    let (sale_id, service_ticket_id) = match target {
        PaymentTarget::Sale(id) => (Some(id.to_string()), None),
        PaymentTarget::ServiceTicket(id) => (None, Some(id.to_string())),
    };
    Payment {
        id: uuid::Uuid::new_v4().to_string(),
        sale_id,
        service_ticket_id,
        customer_id: customer_id.to_string(),
        mode,
        amount: round2(amount),
        reference,
        finance_provider,
        received_by: received_by.map(str::to_string),
        paid_at: Utc::now(),
    }
}

/// One ledger row per non-zero mode of the split
pub(crate) async fn record_split<C: ConnectionTrait>(
    conn: &C,
    target: PaymentTarget<'_>,
    customer_id: &str,
    split: &PaymentSplit,
    received_by: Option<&str>,
) -> AppResult<Vec<Payment>> {
    let mut payments = Vec::new();
    for entry in split.entries() {
        let payment = new_payment(
            target,
            customer_id,
            entry.mode,
            entry.amount,
            entry.reference,
            entry.finance_provider,
            received_by,
        );
        repository::insert(conn, &payment).await?;
        payments.push(payment);
    }
    Ok(payments)
}

pub(crate) async fn record_single<C: ConnectionTrait>(
    conn: &C,
    target: PaymentTarget<'_>,
    customer_id: &str,
    dto: &RecordPaymentDto,
    received_by: Option<&str>,
) -> AppResult<Payment> {
    dto.validate().map_err(AppError::Validation)?;
    let payment = new_payment(
        target,
        customer_id,
        dto.mode,
        dto.amount,
        dto.reference.clone(),
        dto.finance_provider.clone(),
        received_by,
    );
    repository::insert(conn, &payment).await?;
    Ok(payment)
}

/// Totals by mode for the inclusive date range; every mode is listed
pub(crate) async fn summarize<C: ConnectionTrait>(
    conn: &C,
    from: NaiveDate,
    to: NaiveDate,
) -> AppResult<Vec<ModeTotal>> {
    let payments = repository::list(
        conn,
        &PaymentListQuery {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        },
    )
    .await?;

    let mut totals: Vec<ModeTotal> = PaymentMode::ALL
        .iter()
        .map(|mode| ModeTotal {
            mode: *mode,
            count: 0,
            amount: 0.0,
        })
        .collect();
    for payment in &payments {
        if let Some(total) = totals.iter_mut().find(|t| t.mode == payment.mode) {
            total.count += 1;
            total.amount = round2(total.amount + payment.amount);
        }
    }
    Ok(totals)
}

pub async fn summary(db: &DatabaseConnection, query: PaymentSummaryQuery) -> AppResult<PaymentSummary> {
    if query.from > query.to {
        return Err(AppError::Validation("'from' must not be after 'to'".into()));
    }
    let by_mode = summarize(db, query.from, query.to).await?;
    let total = round2(by_mode.iter().map(|t| t.amount).sum());
    Ok(PaymentSummary {
        from: query.from,
        to: query.to,
        by_mode,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;

    #[tokio::test]
    async fn split_creates_one_row_per_mode_and_summary_adds_up() {
        let db = connect_in_memory().await.unwrap();
        let split = PaymentSplit {
            cash: 10000.0,
            upi: 5000.0,
            finance: 0.0,
            finance_provider: None,
            upi_reference: Some("UTR123".into()),
        };
        let rows = record_split(&db, PaymentTarget::Sale("sale-1"), "cust-1", &split, Some("u1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        record_single(
            &db,
            PaymentTarget::ServiceTicket("ticket-1"),
            "cust-1",
            &RecordPaymentDto {
                mode: PaymentMode::Card,
                amount: 750.0,
                reference: None,
                finance_provider: None,
            },
            None,
        )
        .await
        .unwrap();

        let today = Utc::now().date_naive();
        let summary = summary(&db, PaymentSummaryQuery { from: today, to: today })
            .await
            .unwrap();
        assert_eq!(summary.total, 15750.0);
        let upi = summary.by_mode.iter().find(|t| t.mode == PaymentMode::Upi).unwrap();
        assert_eq!((upi.count, upi.amount), (1, 5000.0));
        assert_eq!(summary.by_mode.len(), PaymentMode::ALL.len());

        let for_sale = list(
            &db,
            &PaymentListQuery {
                sale_id: Some("sale-1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(for_sale.len(), 2);

        let yesterday = today.pred_opt().unwrap();
        let none = list(
            &db,
            &PaymentListQuery {
                to: Some(yesterday),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn zero_and_finance_without_provider_are_rejected() {
        let db = connect_in_memory().await.unwrap();
        for dto in [
            RecordPaymentDto {
                mode: PaymentMode::Cash,
                amount: 0.0,
                reference: None,
                finance_provider: None,
            },
            RecordPaymentDto {
                mode: PaymentMode::Finance,
                amount: 100.0,
                reference: None,
                finance_provider: None,
            },
        ] {
            let result = record_single(&db, PaymentTarget::Sale("s"), "c", &dto, None).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }
}
