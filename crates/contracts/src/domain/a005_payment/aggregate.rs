use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::common::money::{ensure_non_negative, round2};

crate::string_enum! {
    pub enum PaymentMode {
        Cash => "CASH",
        Upi => "UPI",
        Finance => "FINANCE",
        Card => "CARD",
    }
}

/// Payment ledger entry. Exactly one of `sale_id` / `service_ticket_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub sale_id: Option<String>,
    pub service_ticket_id: Option<String>,
    pub customer_id: String,
    pub mode: PaymentMode,
    pub amount: f64,
    pub reference: Option<String>,
    pub finance_provider: Option<String>,
    pub received_by: Option<String>,
    pub paid_at: DateTime<Utc>,
}

/// Split of a closing amount across cash, UPI and finance
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaymentSplit {
    #[serde(default)]
    pub cash: f64,
    #[serde(default)]
    pub upi: f64,
    #[serde(default)]
    pub finance: f64,
    pub finance_provider: Option<String>,
    pub upi_reference: Option<String>,
}

/// One ledger line produced from a [`PaymentSplit`]
#[derive(Debug, Clone, PartialEq)]
pub struct SplitEntry {
    pub mode: PaymentMode,
    pub amount: f64,
    pub reference: Option<String>,
    pub finance_provider: Option<String>,
}

impl PaymentSplit {
    pub fn validate(&self) -> Result<(), String> {
        ensure_non_negative("cash", self.cash)?;
        ensure_non_negative("upi", self.upi)?;
        ensure_non_negative("finance", self.finance)?;
        if self.finance > 0.0
            && self
                .finance_provider
                .as_deref()
                .map_or(true, |p| p.trim().is_empty())
        {
            return Err("A finance provider is required for financed amounts".into());
        }
        Ok(())
    }

    pub fn total(&self) -> f64 {
        round2(self.cash + self.upi + self.finance)
    }

    /// Ledger lines for every non-zero mode, in cash / UPI / finance order
    pub fn entries(&self) -> Vec<SplitEntry> {
        let mut entries = Vec::new();
        if self.cash > 0.0 {
            entries.push(SplitEntry {
                mode: PaymentMode::Cash,
                amount: round2(self.cash),
                reference: None,
                finance_provider: None,
            });
        }
        if self.upi > 0.0 {
            entries.push(SplitEntry {
                mode: PaymentMode::Upi,
                amount: round2(self.upi),
                reference: self.upi_reference.clone(),
                finance_provider: None,
            });
        }
        if self.finance > 0.0 {
            entries.push(SplitEntry {
                mode: PaymentMode::Finance,
                amount: round2(self.finance),
                reference: None,
                finance_provider: self.finance_provider.clone(),
            });
        }
        entries
    }
}

/// Payment recorded later against an outstanding sale balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentDto {
    pub mode: PaymentMode,
    pub amount: f64,
    pub reference: Option<String>,
    pub finance_provider: Option<String>,
}

impl RecordPaymentDto {
    pub fn validate(&self) -> Result<(), String> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err("Payment amount must be positive".into());
        }
        if self.mode == PaymentMode::Finance
            && self
                .finance_provider
                .as_deref()
                .map_or(true, |p| p.trim().is_empty())
        {
            return Err("A finance provider is required for financed amounts".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaymentListQuery {
    pub sale_id: Option<String>,
    pub service_ticket_id: Option<String>,
    pub customer_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummaryQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModeTotal {
    pub mode: PaymentMode,
    pub count: i64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub by_mode: Vec<ModeTotal>,
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_skip_zero_modes() {
        let split = PaymentSplit {
            cash: 5_000.0,
            upi: 0.0,
            finance: 95_000.0,
            finance_provider: Some("HDFC".into()),
            upi_reference: None,
        };
        let entries = split.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].mode, PaymentMode::Cash);
        assert_eq!(entries[1].mode, PaymentMode::Finance);
        assert_eq!(entries[1].finance_provider.as_deref(), Some("HDFC"));
        assert_eq!(split.total(), 100_000.0);
    }

    #[test]
    fn finance_requires_provider() {
        let split = PaymentSplit {
            finance: 10.0,
            ..Default::default()
        };
        assert!(split.validate().is_err());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let split = PaymentSplit {
            cash: -1.0,
            ..Default::default()
        };
        assert!(split.validate().is_err());
    }

    #[test]
    fn recorded_payment_must_be_positive() {
        let dto = RecordPaymentDto {
            mode: PaymentMode::Upi,
            amount: 0.0,
            reference: None,
            finance_provider: None,
        };
        assert!(dto.validate().is_err());
    }
}
