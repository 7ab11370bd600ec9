use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::a005_payment::aggregate::ModeTotal;

/// Period for the dealership summary; both ends inclusive, defaults to the current month
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DealershipSummaryRequest {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountByKey {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealershipSummaryResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// All non-deleted leads by current stage
    pub leads_by_stage: Vec<CountByKey>,
    pub sales_count: i64,
    pub sales_revenue: f64,
    pub outstanding_balance: f64,
    pub payments_by_mode: Vec<ModeTotal>,
    /// Tickets not yet closed or cancelled, by status
    pub open_tickets_by_status: Vec<CountByKey>,
    pub low_stock_count: i64,
    pub active_uptime_passes: i64,
}
