use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::string_enum! {
    pub enum ReferralStatus {
        Pending => "PENDING",
        Converted => "CONVERTED",
        Rewarded => "REWARDED",
        Cancelled => "CANCELLED",
    }
}

impl ReferralStatus {
    pub fn can_transition_to(self, next: ReferralStatus) -> bool {
        matches!(
            (self, next),
            (ReferralStatus::Pending, ReferralStatus::Converted)
                | (ReferralStatus::Pending, ReferralStatus::Cancelled)
                | (ReferralStatus::Converted, ReferralStatus::Rewarded)
        )
    }
}

/// An existing customer bringing in a new buyer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: String,
    pub referrer_customer_id: String,
    pub lead_id: Option<String>,
    pub referred_customer_id: Option<String>,
    pub sale_id: Option<String>,
    pub status: ReferralStatus,
    pub reward_amount: f64,
    pub rewarded_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Referral {
    pub fn new_pending(referrer_customer_id: String, lead_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            referrer_customer_id,
            lead_id,
            referred_customer_id: None,
            sale_id: None,
            status: ReferralStatus::Pending,
            reward_amount: 0.0,
            rewarded_at: None,
            comment: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, next: ReferralStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "Referral cannot move from {} to {}",
                self.status, next
            ));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn convert(&mut self, customer_id: &str, sale_id: &str, reward: f64) -> Result<(), String> {
        self.transition(ReferralStatus::Converted)?;
        self.referred_customer_id = Some(customer_id.to_string());
        self.sale_id = Some(sale_id.to_string());
        self.reward_amount = reward;
        Ok(())
    }

    pub fn mark_rewarded(&mut self) -> Result<(), String> {
        self.transition(ReferralStatus::Rewarded)?;
        self.rewarded_at = Some(self.updated_at);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), String> {
        self.transition(ReferralStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReferralDto {
    pub referrer_customer_id: String,
    pub lead_id: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReferralListQuery {
    pub referrer_customer_id: Option<String>,
    pub status: Option<ReferralStatus>,
}
