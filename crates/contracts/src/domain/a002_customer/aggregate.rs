use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::common::phone::validate_phone;
use crate::domain::common::BaseAggregate;

crate::aggregate_id!(CustomerId);

crate::string_enum! {
    pub enum UptimePassStatus {
        None => "NONE",
        Active => "ACTIVE",
        Expired => "EXPIRED",
    }
}

/// Warranty add-on tracked as a status/expiry pair on the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UptimePass {
    pub status: UptimePassStatus,
    pub expiry: Option<NaiveDate>,
}

impl Default for UptimePass {
    fn default() -> Self {
        Self {
            status: UptimePassStatus::None,
            expiry: None,
        }
    }
}

impl UptimePass {
    /// Status as of `today`; a stored `Active` pass past its expiry reads as `Expired`
    pub fn effective_status(&self, today: NaiveDate) -> UptimePassStatus {
        match (self.status, self.expiry) {
            (UptimePassStatus::Active, Some(expiry)) if expiry < today => UptimePassStatus::Expired,
            (UptimePassStatus::Active, None) => UptimePassStatus::Expired,
            (status, _) => status,
        }
    }

    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.effective_status(today) == UptimePassStatus::Active
    }

    /// Extends from the current expiry while still active, otherwise from `today`
    pub fn renew(&mut self, today: NaiveDate, months: u32) -> Result<NaiveDate, String> {
        if months == 0 {
            return Err("Uptime Pass duration must be at least one month".into());
        }
        let start = match self.expiry {
            Some(expiry) if self.is_active_on(today) => expiry,
            _ => today,
        };
        let expiry = start
            .checked_add_months(Months::new(months))
            .ok_or_else(|| "Uptime Pass expiry is out of range".to_string())?;
        self.status = UptimePassStatus::Active;
        self.expiry = Some(expiry);
        Ok(expiry)
    }
}

/// `base.description` is the customer's name, `base.code` the `CUST-NNNN` number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    #[serde(flatten)]
    pub base: BaseAggregate<CustomerId>,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub uptime_pass: UptimePass,
    pub total_purchases: i32,
    pub lifetime_value: f64,
    pub referral_count: i32,
    pub referral_credit: f64,
    pub last_service_date: Option<NaiveDate>,
    pub source_lead_id: Option<String>,
}

impl Customer {
    pub fn new_for_insert(code: String, dto: &CustomerDto) -> Self {
        let mut base = BaseAggregate::new(CustomerId::new_v4(), code, dto.name.trim().to_string());
        base.comment = dto.comment.clone();

        Self {
            base,
            phone: dto.phone.clone(),
            email: dto.email.clone(),
            address: dto.address.clone(),
            uptime_pass: UptimePass::default(),
            total_purchases: 0,
            lifetime_value: 0.0,
            referral_count: 0,
            referral_credit: 0.0,
            last_service_date: None,
            source_lead_id: None,
        }
    }

    pub fn update(&mut self, dto: &CustomerDto) {
        self.base.description = dto.name.trim().to_string();
        self.base.comment = dto.comment.clone();
        self.phone = dto.phone.clone();
        self.email = dto.email.clone();
        self.address = dto.address.clone();
    }

    /// Merge contact data from a sale; empty optional values never erase stored ones
    pub fn merge_contact(&mut self, name: &str, email: Option<&str>, address: Option<&str>) {
        if !name.trim().is_empty() {
            self.base.description = name.trim().to_string();
        }
        if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
            self.email = Some(email.to_string());
        }
        if let Some(address) = address.filter(|a| !a.trim().is_empty()) {
            self.address = Some(address.to_string());
        }
    }

    pub fn validate(&mut self) -> Result<(), String> {
        if self.base.description.trim().is_empty() {
            return Err("Customer name cannot be empty".into());
        }
        self.phone = validate_phone(&self.phone)?;
        if let Some(email) = &self.email {
            if !email.trim().is_empty() && !email.contains('@') {
                return Err("Invalid email format".into());
            }
        }
        Ok(())
    }

    pub fn record_purchase(&mut self, amount: f64) {
        self.total_purchases += 1;
        self.lifetime_value = crate::domain::common::money::round2(self.lifetime_value + amount);
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

crate::impl_aggregate_root!(Customer, CustomerId, "a002", "customer", "Customer", "Customers");

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CustomerDto {
    pub id: Option<String>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenewUptimePassDto {
    /// Falls back to the configured default duration
    pub months: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSearchQuery {
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassRefreshResult {
    pub expired_count: u64,
}
