use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::a005_payment::aggregate::{Payment, PaymentSplit};
use crate::domain::common::money::{ensure_non_negative, round2};
use crate::domain::common::BaseAggregate;

crate::aggregate_id!(SaleId);

/// Closed sale. `base.code` is the sale number (`SALE-0001`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    #[serde(flatten)]
    pub base: BaseAggregate<SaleId>,
    pub lead_id: Option<String>,
    pub customer_id: String,
    pub vehicle_id: String,
    pub sale_date: NaiveDate,
    pub vehicle_price: f64,
    pub accessories_total: f64,
    pub subtotal: f64,
    pub discount: f64,
    pub total_amount: f64,
    pub cash_amount: f64,
    pub upi_amount: f64,
    pub finance_amount: f64,
    pub finance_provider: Option<String>,
    pub amount_paid: f64,
    pub balance_due: f64,
    pub uptime_pass: bool,
    pub referral_id: Option<String>,
    pub sold_by: Option<String>,
    pub lines: Vec<SaleLine>,
}

impl Sale {
    pub fn sale_no(&self) -> &str {
        &self.base.code
    }

    /// Apply a later payment to the outstanding balance
    pub fn apply_payment(&mut self, amount: f64) -> Result<(), String> {
        if amount <= 0.0 {
            return Err("Payment amount must be positive".into());
        }
        if round2(amount) > self.balance_due {
            return Err(format!(
                "Payment of {:.2} exceeds balance due {:.2} on {}",
                amount,
                self.balance_due,
                self.sale_no()
            ));
        }
        self.amount_paid = round2(self.amount_paid + amount);
        self.balance_due = round2(self.total_amount - self.amount_paid);
        Ok(())
    }
}

crate::impl_aggregate_root!(Sale, SaleId, "a004", "sale", "Sale", "Sales");

/// Vehicle or accessory line of a sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub item_id: String,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

/// Money side of a sale, computed before anything is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub vehicle_price: f64,
    pub accessories_total: f64,
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
    pub paid: f64,
    pub balance_due: f64,
}

impl SaleTotals {
    /// `accessories` are `(quantity, unit_price)` pairs
    pub fn compute(
        vehicle_price: f64,
        accessories: &[(i32, f64)],
        discount: f64,
        payments: &PaymentSplit,
    ) -> Result<Self, String> {
        ensure_non_negative("vehicle_price", vehicle_price)?;
        ensure_non_negative("discount", discount)?;
        payments.validate()?;

        let mut accessories_total = 0.0;
        for (quantity, unit_price) in accessories {
            if *quantity <= 0 {
                return Err("Accessory quantity must be positive".into());
            }
            ensure_non_negative("unit_price", *unit_price)?;
            accessories_total += f64::from(*quantity) * unit_price;
        }
        let accessories_total = round2(accessories_total);
        let subtotal = round2(vehicle_price + accessories_total);
        if discount > subtotal {
            return Err(format!(
                "Discount {:.2} exceeds subtotal {:.2}",
                discount, subtotal
            ));
        }
        let total = round2(subtotal - discount);
        let paid = payments.total();
        if paid > total {
            return Err(format!(
                "Payments {:.2} exceed sale total {:.2}",
                paid, total
            ));
        }

        Ok(Self {
            vehicle_price: round2(vehicle_price),
            accessories_total,
            subtotal,
            discount: round2(discount),
            total,
            paid,
            balance_due: round2(total - paid),
        })
    }
}

/// Buyer details when the sale is not made from a lead, or to override the lead's contact
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SaleCustomerDto {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleAccessoryDto {
    pub item_id: String,
    pub quantity: i32,
    /// Defaults to the item's selling price
    pub unit_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateSaleDto {
    pub lead_id: Option<String>,
    pub customer: Option<SaleCustomerDto>,
    pub vehicle_id: String,
    #[serde(default)]
    pub accessories: Vec<SaleAccessoryDto>,
    /// Defaults to the vehicle's selling price
    pub vehicle_price: Option<f64>,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub payments: PaymentSplit,
    #[serde(default)]
    pub uptime_pass: bool,
    pub uptime_pass_months: Option<u32>,
    pub referral_customer_id: Option<String>,
    /// Defaults to today
    pub sale_date: Option<NaiveDate>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleCreatedResponse {
    pub id: String,
    pub sale_no: String,
    pub customer_id: String,
    pub total_amount: f64,
    pub balance_due: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetails {
    pub sale: Sale,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SaleListQuery {
    pub customer_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(cash: f64, upi: f64, finance: f64) -> PaymentSplit {
        PaymentSplit {
            cash,
            upi,
            finance,
            finance_provider: (finance > 0.0).then(|| "Bajaj Finserv".to_string()),
            upi_reference: None,
        }
    }

    #[test]
    fn totals_with_accessories_and_discount() {
        let totals =
            SaleTotals::compute(100_000.0, &[(2, 1_500.0), (1, 999.5)], 2_000.0, &split(10_000.0, 5_000.0, 83_999.5))
                .unwrap();
        assert_eq!(totals.accessories_total, 3_999.5);
        assert_eq!(totals.subtotal, 103_999.5);
        assert_eq!(totals.total, 101_999.5);
        assert_eq!(totals.paid, 98_999.5);
        assert_eq!(totals.balance_due, 3_000.0);
    }

    #[test]
    fn overpayment_is_rejected() {
        let err = SaleTotals::compute(50_000.0, &[], 0.0, &split(50_001.0, 0.0, 0.0)).unwrap_err();
        assert!(err.contains("exceed"));
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        assert!(SaleTotals::compute(1_000.0, &[], 1_000.01, &split(0.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn zero_quantity_accessory_is_rejected() {
        assert!(SaleTotals::compute(1_000.0, &[(0, 10.0)], 0.0, &split(0.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn apply_payment_reduces_balance() {
        let mut sale = Sale {
            base: BaseAggregate::new(SaleId::new_v4(), "SALE-0001".into(), "test".into()),
            lead_id: None,
            customer_id: "c".into(),
            vehicle_id: "v".into(),
            sale_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            vehicle_price: 1_000.0,
            accessories_total: 0.0,
            subtotal: 1_000.0,
            discount: 0.0,
            total_amount: 1_000.0,
            cash_amount: 400.0,
            upi_amount: 0.0,
            finance_amount: 0.0,
            finance_provider: None,
            amount_paid: 400.0,
            balance_due: 600.0,
            uptime_pass: false,
            referral_id: None,
            sold_by: None,
            lines: vec![],
        };
        sale.apply_payment(250.0).unwrap();
        assert_eq!(sale.balance_due, 350.0);
        let err = sale.apply_payment(350.01).unwrap_err();
        assert!(err.contains(sale.sale_no()));
        sale.apply_payment(350.0).unwrap();
        assert_eq!(sale.balance_due, 0.0);
    }
}
