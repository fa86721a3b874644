// ============================================================================
// CRM Core - Deal Entity
// File: crates/crm-core/src/domain/deal.rs
// Description: Opportunity tracked through a pipeline stage
// ============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::Stage;
use crate::error::DomainError;

string_enum! {
    /// Derived from the stage flags, never set directly.
    pub enum DealStatus {
        Open => "open",
        Won => "won",
        Lost => "lost",
    }
    default = Open
}

impl DealStatus {
    pub fn for_stage(stage: &Stage) -> Self {
        if stage.is_won {
            DealStatus::Won
        } else if stage.is_lost {
            DealStatus::Lost
        } else {
            DealStatus::Open
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub title: String,
    pub contact_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub stage_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub expected_close_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
    pub status: DealStatus,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDeal {
    #[validate(length(min = 2, max = 150, message = "Deal title must be between 2 and 150 characters"))]
    pub title: String,
    pub contact_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    /// Defaults to the entry stage of the default pipeline.
    pub stage_id: Option<Uuid>,
    #[validate(range(min = 0, message = "Amount cannot be negative"))]
    pub amount_cents: i64,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub expected_close_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DealChanges {
    #[validate(length(min = 2, max = 150, message = "Deal title must be between 2 and 150 characters"))]
    pub title: Option<String>,
    pub contact_id: Option<Uuid>,
    #[validate(range(min = 0, message = "Amount cannot be negative"))]
    pub amount_cents: Option<i64>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub expected_close_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DealFilter {
    pub stage_id: Option<Uuid>,
    pub status: Option<DealStatus>,
    pub owner_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub search: Option<String>,
}

impl Deal {
    pub fn new(input: NewDeal, stage: &Stage) -> Result<Self, DomainError> {
        input.validate()?;
        let now = Utc::now();
        let status = DealStatus::for_stage(stage);
        Ok(Self {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            contact_id: input.contact_id,
            lead_id: input.lead_id,
            stage_id: stage.id,
            amount_cents: input.amount_cents,
            currency: input
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| crm_shared::constants::DEFAULT_CURRENCY.to_string()),
            expected_close_date: input.expected_close_date,
            owner_id: input.owner_id,
            status,
            closed_at: (status != DealStatus::Open).then_some(now),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, changes: DealChanges) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(title) = changes.title {
            self.title = title.trim().to_string();
        }
        if changes.contact_id.is_some() {
            self.contact_id = changes.contact_id;
        }
        if let Some(amount) = changes.amount_cents {
            self.amount_cents = amount;
        }
        if let Some(currency) = changes.currency {
            self.currency = currency.to_uppercase();
        }
        if changes.expected_close_date.is_some() {
            self.expected_close_date = changes.expected_close_date;
        }
        if changes.owner_id.is_some() {
            self.owner_id = changes.owner_id;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Moves the deal and recomputes its status from the target stage.
    pub fn move_to(&mut self, stage: &Stage) {
        let now = Utc::now();
        let status = DealStatus::for_stage(stage);
        self.stage_id = stage.id;
        self.closed_at = match (self.status, status) {
            (_, DealStatus::Open) => None,
            (previous, next) if previous == next => self.closed_at,
            _ => Some(now),
        };
        self.status = status;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Pipeline;

    fn new_deal() -> NewDeal {
        NewDeal {
            title: "Annual licence".to_string(),
            contact_id: None,
            lead_id: None,
            stage_id: None,
            amount_cents: 120_000,
            currency: None,
            expected_close_date: None,
            owner_id: None,
        }
    }

    #[test]
    fn test_status_follows_stage() {
        let pipeline = Pipeline::default_sales();
        let entry = pipeline.entry_stage().unwrap();
        let won = pipeline.stages.iter().find(|s| s.is_won).unwrap();
        let lost = pipeline.stages.iter().find(|s| s.is_lost).unwrap();

        let mut deal = Deal::new(new_deal(), entry).unwrap();
        assert_eq!(deal.status, DealStatus::Open);
        assert_eq!(deal.currency, "USD");
        assert!(deal.closed_at.is_none());

        deal.move_to(won);
        assert_eq!(deal.status, DealStatus::Won);
        assert!(deal.closed_at.is_some());

        deal.move_to(lost);
        assert_eq!(deal.status, DealStatus::Lost);

        deal.move_to(entry);
        assert_eq!(deal.status, DealStatus::Open);
        assert!(deal.closed_at.is_none());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let pipeline = Pipeline::default_sales();
        let mut input = new_deal();
        input.amount_cents = -1;
        assert!(Deal::new(input, pipeline.entry_stage().unwrap()).is_err());
    }
}
