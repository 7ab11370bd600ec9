use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::a005_payment::aggregate::PaymentSplit;
use crate::domain::common::money::{ensure_non_negative, round2};
use crate::domain::common::BaseAggregate;

crate::aggregate_id!(ServiceTicketId);

crate::string_enum! {
    pub enum TicketStatus {
        Open => "OPEN",
        Assigned => "ASSIGNED",
        InProgress => "IN_PROGRESS",
        OnHold => "ON_HOLD",
        Completed => "COMPLETED",
        Closed => "CLOSED",
        Cancelled => "CANCELLED",
    }
}

impl TicketStatus {
    /// Transition table. `Closed` is reached only through the closing transaction.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Open, Assigned)
                | (Open, Cancelled)
                | (Assigned, InProgress)
                | (Assigned, Cancelled)
                | (InProgress, OnHold)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (OnHold, InProgress)
                | (OnHold, Cancelled)
                | (Completed, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Closed | TicketStatus::Cancelled)
    }
}

crate::string_enum! {
    pub enum TicketPriority {
        Low => "LOW",
        Normal => "NORMAL",
        High => "HIGH",
    }
}

/// Repair / maintenance work order.
/// `base.code` is the ticket number (`SRV-0001`), `base.description` the complaint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTicket {
    #[serde(flatten)]
    pub base: BaseAggregate<ServiceTicketId>,
    pub customer_id: String,
    pub vehicle_item_id: Option<String>,
    pub chassis_no: Option<String>,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub assigned_technician_id: Option<String>,
    pub labour_charge: f64,
    pub estimated_cost: f64,
    pub parts_total: f64,
    pub final_amount: f64,
    pub covered_by_pass: bool,
    pub opened_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub parts: Vec<ServicePart>,
}

/// Amounts settled when a ticket is closed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosingAmounts {
    pub labour_charge: f64,
    pub parts_total: f64,
    pub final_amount: f64,
    pub covered_by_pass: bool,
}

impl ServiceTicket {
    pub fn new_for_insert(code: String, dto: &ServiceTicketDto) -> Self {
        let mut base = BaseAggregate::new(
            ServiceTicketId::new_v4(),
            code,
            dto.complaint.trim().to_string(),
        );
        base.comment = dto.comment.clone();

        Self {
            base,
            customer_id: dto.customer_id.clone(),
            vehicle_item_id: dto.vehicle_item_id.clone(),
            chassis_no: dto.chassis_no.clone(),
            priority: dto.priority.unwrap_or(TicketPriority::Normal),
            status: TicketStatus::Open,
            assigned_technician_id: None,
            labour_charge: dto.labour_charge.unwrap_or(0.0),
            estimated_cost: dto.estimated_cost.unwrap_or(0.0),
            parts_total: 0.0,
            final_amount: 0.0,
            covered_by_pass: false,
            opened_at: Utc::now(),
            completed_at: None,
            closed_at: None,
            parts: Vec::new(),
        }
    }

    pub fn update(&mut self, dto: &ServiceTicketDto) -> Result<(), String> {
        self.ensure_editable()?;
        self.base.description = dto.complaint.trim().to_string();
        self.base.comment = dto.comment.clone();
        self.vehicle_item_id = dto.vehicle_item_id.clone();
        self.chassis_no = dto.chassis_no.clone();
        if let Some(priority) = dto.priority {
            self.priority = priority;
        }
        if let Some(labour) = dto.labour_charge {
            self.labour_charge = labour;
        }
        if let Some(estimate) = dto.estimated_cost {
            self.estimated_cost = estimate;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.description.trim().is_empty() {
            return Err("Complaint cannot be empty".into());
        }
        if self.customer_id.trim().is_empty() {
            return Err("Customer is required".into());
        }
        ensure_non_negative("labour_charge", self.labour_charge)?;
        ensure_non_negative("estimated_cost", self.estimated_cost)?;
        Ok(())
    }

    pub fn ensure_editable(&self) -> Result<(), String> {
        if self.status.is_terminal() {
            return Err(format!(
                "Ticket {} is {} and can no longer be changed",
                self.base.code, self.status
            ));
        }
        Ok(())
    }

    /// Manual or automatic technician assignment
    pub fn assign(&mut self, technician_id: &str) -> Result<(), String> {
        match self.status {
            TicketStatus::Open => self.status = TicketStatus::Assigned,
            TicketStatus::Assigned => {}
            other => {
                return Err(format!(
                    "Ticket {} cannot be reassigned while {}",
                    self.base.code, other
                ))
            }
        }
        self.assigned_technician_id = Some(technician_id.to_string());
        Ok(())
    }

    /// Status change requested through the API. Closing has its own path.
    pub fn change_status(&mut self, next: TicketStatus) -> Result<(), String> {
        if next == TicketStatus::Closed {
            return Err("Use the close operation to close a ticket".into());
        }
        if next == TicketStatus::Assigned {
            return Err("Use the assign operation to assign a technician".into());
        }
        self.transition(next)
    }

    fn transition(&mut self, next: TicketStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "Ticket {} cannot move from {} to {}",
                self.base.code, self.status, next
            ));
        }
        match next {
            TicketStatus::Completed => self.completed_at = Some(Utc::now()),
            TicketStatus::Closed => self.closed_at = Some(Utc::now()),
            _ => {}
        }
        self.status = next;
        Ok(())
    }

    pub fn add_part(&mut self, part: ServicePart) -> Result<(), String> {
        self.ensure_editable()?;
        if self.status == TicketStatus::Completed {
            return Err(format!(
                "Ticket {} is completed; parts can no longer be added",
                self.base.code
            ));
        }
        self.parts_total = round2(self.parts_total + part.line_total);
        self.parts.push(part);
        Ok(())
    }

    /// Labour is waived when the customer holds an active Uptime Pass
    pub fn closing_amounts(&self, pass_active: bool) -> ClosingAmounts {
        let parts_total = round2(self.parts.iter().map(|p| p.line_total).sum());
        let labour_charge = if pass_active { 0.0 } else { round2(self.labour_charge) };
        ClosingAmounts {
            labour_charge,
            parts_total,
            final_amount: round2(labour_charge + parts_total),
            covered_by_pass: pass_active,
        }
    }

    pub fn close(&mut self, amounts: ClosingAmounts) -> Result<(), String> {
        if self.status != TicketStatus::Completed {
            return Err(format!(
                "Ticket {} must be COMPLETED before closing (currently {})",
                self.base.code, self.status
            ));
        }
        self.transition(TicketStatus::Closed)?;
        self.labour_charge = amounts.labour_charge;
        self.parts_total = amounts.parts_total;
        self.final_amount = amounts.final_amount;
        self.covered_by_pass = amounts.covered_by_pass;
        self.base.metadata.is_posted = true;
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

crate::impl_aggregate_root!(
    ServiceTicket,
    ServiceTicketId,
    "a007",
    "service_ticket",
    "Service ticket",
    "Service tickets"
);

/// Part consumed by a ticket; stock is deducted when the ticket closes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePart {
    pub id: String,
    pub ticket_id: String,
    pub item_id: String,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

impl ServicePart {
    pub fn new(
        ticket_id: &str,
        item_id: &str,
        description: &str,
        quantity: i32,
        unit_price: f64,
    ) -> Result<Self, String> {
        if quantity <= 0 {
            return Err("Part quantity must be positive".into());
        }
        ensure_non_negative("unit_price", unit_price)?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            ticket_id: ticket_id.to_string(),
            item_id: item_id.to_string(),
            description: description.to_string(),
            quantity,
            unit_price,
            line_total: round2(f64::from(quantity) * unit_price),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceTicketDto {
    pub id: Option<String>,
    pub customer_id: String,
    pub vehicle_item_id: Option<String>,
    pub chassis_no: Option<String>,
    pub complaint: String,
    pub priority: Option<TicketPriority>,
    pub labour_charge: Option<f64>,
    pub estimated_cost: Option<f64>,
    /// When empty the ticket is auto-allocated round-robin
    pub assigned_technician_id: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignTicketDto {
    pub technician_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeTicketStatusDto {
    pub status: TicketStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddServicePartDto {
    pub item_id: String,
    pub quantity: i32,
    pub unit_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CloseTicketDto {
    #[serde(default)]
    pub payments: PaymentSplit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketClosedResponse {
    pub id: String,
    pub ticket_no: String,
    pub final_amount: f64,
    pub covered_by_pass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceTicketListQuery {
    pub status: Option<TicketStatus>,
    pub technician_id: Option<String>,
    pub customer_id: Option<String>,
}
