use chrono::{Datelike, NaiveDate};
use contracts::dashboards::d400_dealership_summary::dto::{
    DealershipSummaryRequest, DealershipSummaryResponse,
};
use contracts::domain::common::money::round2;
use sea_orm::DatabaseConnection;

use super::repository;
use crate::domain::{a002_customer, a003_inventory_item, a005_payment};
use crate::shared::config;
use crate::shared::error::{AppError, AppResult};

/// First and last day of the month containing `today`
fn current_month(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = today.with_day(1).unwrap_or(today);
    let last = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(today);
    (first, last)
}

pub async fn get_summary(
    db: &DatabaseConnection,
    request: DealershipSummaryRequest,
) -> AppResult<DealershipSummaryResponse> {
    let today = config::today();
    let (month_start, month_end) = current_month(today);
    let from = request.from.unwrap_or(month_start);
    let to = request.to.unwrap_or(month_end);
    if from > to {
        return Err(AppError::Validation("'from' must not be after 'to'".into()));
    }

    let leads_by_stage = repository::leads_by_stage(db).await?;
    let sales = repository::sales_totals(db, from, to).await?;
    let outstanding_balance = repository::outstanding_balance(db).await?;
    let payments_by_mode = a005_payment::service::summarize(db, from, to).await?;
    let open_tickets_by_status = repository::open_tickets_by_status(db).await?;
    let low_stock_count = a003_inventory_item::repository::list_low_stock(db).await?.len() as i64;
    let active_uptime_passes = a002_customer::repository::count_active_passes(db, today).await? as i64;

    tracing::debug!("Dealership summary for {}..{}", from, to);
    Ok(DealershipSummaryResponse {
        from,
        to,
        leads_by_stage,
        sales_count: sales.sales_count,
        sales_revenue: round2(sales.revenue),
        outstanding_balance: round2(outstanding_balance),
        payments_by_mode,
        open_tickets_by_status,
        low_stock_count,
        active_uptime_passes,
    })
}
