// ============================================================================
// CRM Core - Discount Code Entity
// File: crates/crm-core/src/domain/discount_code.rs
// Description: Redeemable price reduction, optionally bound to a tier
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::Tier;
use crate::error::DomainError;

string_enum! {
    pub enum DiscountKind {
        Percent => "percent",
        Fixed => "fixed",
    }
    default = Percent
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: Uuid,
    pub code: String,
    pub kind: DiscountKind,
    /// Percentage (1..=100) or fixed amount in cents.
    pub value: i64,
    pub tier_id: Option<Uuid>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDiscountCode {
    #[validate(length(min = 3, max = 40, message = "Code must be between 3 and 40 characters"))]
    pub code: String,
    pub kind: DiscountKind,
    #[validate(range(min = 1, message = "Discount value must be positive"))]
    pub value: i64,
    pub tier_id: Option<Uuid>,
    #[validate(range(min = 1, message = "Max uses must be at least 1"))]
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Price breakdown for a tier purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub tier_id: Uuid,
    pub price_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub discount_code_id: Option<Uuid>,
}

impl PriceQuote {
    pub fn full_price(tier: &Tier) -> Self {
        Self {
            tier_id: tier.id,
            price_cents: tier.price_cents,
            discount_cents: 0,
            total_cents: tier.price_cents,
            currency: tier.currency.clone(),
            discount_code_id: None,
        }
    }

    /// Everything waived, e.g. when an activation code pays for the tier.
    pub fn prepaid(tier: &Tier) -> Self {
        Self {
            tier_id: tier.id,
            price_cents: tier.price_cents,
            discount_cents: tier.price_cents,
            total_cents: 0,
            currency: tier.currency.clone(),
            discount_code_id: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.total_cents == 0
    }
}

impl DiscountCode {
    pub fn new(input: NewDiscountCode) -> Result<Self, DomainError> {
        input.validate()?;
        if input.kind == DiscountKind::Percent && input.value > 100 {
            return Err(DomainError::ValidationError(
                "percent discount cannot exceed 100".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            code: crm_security::codes::normalize_code(&input.code),
            kind: input.kind,
            value: input.value,
            tier_id: input.tier_id,
            max_uses: input.max_uses,
            used_count: 0,
            expires_at: input.expires_at,
            is_active: true,
            created_at: Utc::now(),
        })
    }

    pub fn ensure_applicable(&self, tier_id: Uuid, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::DiscountNotApplicable("code is inactive".to_string()));
        }
        if self.expires_at.is_some_and(|at| at <= now) {
            return Err(DomainError::DiscountNotApplicable("code has expired".to_string()));
        }
        if self.max_uses.is_some_and(|max| self.used_count >= max) {
            return Err(DomainError::DiscountNotApplicable("code is used up".to_string()));
        }
        if self.tier_id.is_some_and(|id| id != tier_id) {
            return Err(DomainError::DiscountNotApplicable(
                "code is not valid for this tier".to_string(),
            ));
        }
        Ok(())
    }

    /// Discount in cents, never more than the price.
    pub fn discount_for(&self, price_cents: i64) -> i64 {
        let raw = match self.kind {
            DiscountKind::Percent => price_cents * self.value / 100,
            DiscountKind::Fixed => self.value,
        };
        raw.clamp(0, price_cents.max(0))
    }

    pub fn quote(&self, tier: &Tier, now: DateTime<Utc>) -> Result<PriceQuote, DomainError> {
        self.ensure_applicable(tier.id, now)?;
        let discount = self.discount_for(tier.price_cents);
        Ok(PriceQuote {
            tier_id: tier.id,
            price_cents: tier.price_cents,
            discount_cents: discount,
            total_cents: tier.price_cents - discount,
            currency: tier.currency.clone(),
            discount_code_id: Some(self.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::sample_tier;
    use chrono::Duration;

    fn code(kind: DiscountKind, value: i64) -> DiscountCode {
        DiscountCode::new(NewDiscountCode {
            code: "launch20".to_string(),
            kind,
            value,
            tier_id: None,
            max_uses: Some(2),
            expires_at: None,
        })
        .unwrap()
    }

    #[test]
    fn test_code_is_upper_cased() {
        assert_eq!(code(DiscountKind::Percent, 20).code, "LAUNCH20");
    }

    #[test]
    fn test_percent_quote() {
        let tier = sample_tier(5000);
        let quote = code(DiscountKind::Percent, 20).quote(&tier, Utc::now()).unwrap();
        assert_eq!(quote.discount_cents, 1000);
        assert_eq!(quote.total_cents, 4000);
    }

    #[test]
    fn test_fixed_discount_capped_at_price() {
        let tier = sample_tier(500);
        let quote = code(DiscountKind::Fixed, 900).quote(&tier, Utc::now()).unwrap();
        assert_eq!(quote.total_cents, 0);
        assert!(quote.is_free());
    }

    #[test]
    fn test_percent_over_hundred_rejected() {
        assert!(DiscountCode::new(NewDiscountCode {
            code: "bad".to_string(),
            kind: DiscountKind::Percent,
            value: 150,
            tier_id: None,
            max_uses: None,
            expires_at: None,
        })
        .is_err());
    }

    #[test]
    fn test_not_applicable_cases() {
        let tier = sample_tier(5000);
        let now = Utc::now();

        let mut used_up = code(DiscountKind::Percent, 10);
        used_up.used_count = 2;
        assert!(used_up.quote(&tier, now).is_err());

        let mut expired = code(DiscountKind::Percent, 10);
        expired.expires_at = Some(now - Duration::days(1));
        assert!(expired.quote(&tier, now).is_err());

        let mut other_tier = code(DiscountKind::Percent, 10);
        other_tier.tier_id = Some(Uuid::new_v4());
        assert!(other_tier.quote(&tier, now).is_err());

        let mut inactive = code(DiscountKind::Percent, 10);
        inactive.is_active = false;
        assert!(inactive.quote(&tier, now).is_err());
    }
}
