use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::common::phone::validate_phone;
use crate::domain::common::BaseAggregate;

crate::aggregate_id!(LeadId);

crate::string_enum! {
    /// Sales funnel stage of a lead
    pub enum LeadStage {
        New => "NEW",
        Contacted => "CONTACTED",
        TestRide => "TEST_RIDE",
        Negotiation => "NEGOTIATION",
        Booked => "BOOKED",
        Won => "WON",
        Lost => "LOST",
    }
}

impl LeadStage {
    fn funnel_rank(self) -> u8 {
        match self {
            LeadStage::New => 0,
            LeadStage::Contacted => 1,
            LeadStage::TestRide => 2,
            LeadStage::Negotiation => 3,
            LeadStage::Booked => 4,
            LeadStage::Won => 5,
            LeadStage::Lost => 5,
        }
    }

    /// Manual stage change rules. `Won` is reachable only through a sale.
    pub fn can_transition_to(self, next: LeadStage) -> bool {
        match (self, next) {
            (current, next) if current == next => false,
            (LeadStage::Won, _) | (_, LeadStage::Won) => false,
            (LeadStage::Lost, LeadStage::New) => true,
            (LeadStage::Lost, _) => false,
            (_, LeadStage::Lost) => true,
            (current, next) => next.funnel_rank() > current.funnel_rank(),
        }
    }

    pub fn is_open(self) -> bool {
        !matches!(self, LeadStage::Won | LeadStage::Lost)
    }
}

crate::string_enum! {
    pub enum LeadSource {
        WalkIn => "WALK_IN",
        Referral => "REFERRAL",
        Website => "WEBSITE",
        Phone => "PHONE",
        SocialMedia => "SOCIAL_MEDIA",
        Other => "OTHER",
    }
}

/// Prospective customer moving through the sales funnel.
/// `base.description` holds the prospect's name, `base.code` the `LEAD-NNNN` number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    #[serde(flatten)]
    pub base: BaseAggregate<LeadId>,
    pub phone: String,
    pub email: Option<String>,
    pub source: LeadSource,
    pub interested_model: Option<String>,
    pub stage: LeadStage,
    pub assigned_to: Option<String>,
    pub referred_by_customer_id: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub lost_reason: Option<String>,
    pub converted_sale_id: Option<String>,
}

impl Lead {
    pub fn new_for_insert(code: String, dto: &LeadDto) -> Self {
        let mut base = BaseAggregate::new(LeadId::new_v4(), code, dto.name.trim().to_string());
        base.comment = dto.comment.clone();

        let source = match (&dto.source, &dto.referred_by_customer_id) {
            (Some(source), _) => *source,
            (None, Some(_)) => LeadSource::Referral,
            (None, None) => LeadSource::WalkIn,
        };

        Self {
            base,
            phone: dto.phone.clone(),
            email: dto.email.clone(),
            source,
            interested_model: dto.interested_model.clone(),
            stage: LeadStage::New,
            assigned_to: dto.assigned_to.clone(),
            referred_by_customer_id: dto.referred_by_customer_id.clone(),
            follow_up_date: dto.follow_up_date,
            lost_reason: None,
            converted_sale_id: None,
        }
    }

    /// Apply editable fields. Stage and referral link are not editable here.
    pub fn update(&mut self, dto: &LeadDto) {
        self.base.description = dto.name.trim().to_string();
        self.base.comment = dto.comment.clone();
        self.phone = dto.phone.clone();
        self.email = dto.email.clone();
        if let Some(source) = dto.source {
            self.source = source;
        }
        self.interested_model = dto.interested_model.clone();
        self.assigned_to = dto.assigned_to.clone();
        self.follow_up_date = dto.follow_up_date;
    }

    /// Validates and normalizes the phone number in place
    pub fn validate(&mut self) -> Result<(), String> {
        if self.base.description.trim().is_empty() {
            return Err("Lead name cannot be empty".into());
        }
        self.phone = validate_phone(&self.phone)?;
        if let Some(email) = &self.email {
            if !email.trim().is_empty() && !email.contains('@') {
                return Err("Invalid email format".into());
            }
        }
        Ok(())
    }

    pub fn change_stage(&mut self, next: LeadStage, lost_reason: Option<String>) -> Result<(), String> {
        if !self.stage.can_transition_to(next) {
            return Err(format!(
                "Lead {} cannot move from {} to {}",
                self.base.code, self.stage, next
            ));
        }
        self.lost_reason = if next == LeadStage::Lost {
            lost_reason
        } else {
            None
        };
        self.stage = next;
        Ok(())
    }

    /// Called by the sale closure
    pub fn mark_won(&mut self, sale_id: &str) -> Result<(), String> {
        match self.stage {
            LeadStage::Won => Err(format!("Lead {} is already converted", self.base.code)),
            LeadStage::Lost => Err(format!("Lead {} is lost; reopen it first", self.base.code)),
            _ => {
                self.stage = LeadStage::Won;
                self.converted_sale_id = Some(sale_id.to_string());
                Ok(())
            }
        }
    }

    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

crate::impl_aggregate_root!(Lead, LeadId, "a001", "lead", "Lead", "Leads");

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeadDto {
    pub id: Option<String>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub source: Option<LeadSource>,
    pub interested_model: Option<String>,
    pub assigned_to: Option<String>,
    pub referred_by_customer_id: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLeadStageDto {
    pub stage: LeadStage,
    pub lost_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeadListQuery {
    pub stage: Option<LeadStage>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpQuery {
    /// Defaults to today
    pub due: Option<NaiveDate>,
}
