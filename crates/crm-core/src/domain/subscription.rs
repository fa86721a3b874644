// ============================================================================
// CRM Core - Subscription Entity
// File: crates/crm-core/src/domain/subscription.rs
// Description: Client <-> Tier link with subscription and payment state
// ============================================================================
//! Subscription state machine.
//!
//! ```text
//! pending ──paid/free──▶ active ──ends_at passed──▶ expired
//!    │                     │
//!    └──────cancel─────────┴──────▶ cancelled
//! ```
//! Payment status moves independently: `unpaid → paid | failed`, or starts as
//! `free` when nothing is owed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{PriceQuote, Tier};
use crate::error::DomainError;

string_enum! {
    pub enum SubscriptionStatus {
        Pending => "pending",
        Active => "active",
        Expired => "expired",
        Cancelled => "cancelled",
    }
    default = Pending
}

string_enum! {
    pub enum PaymentStatus {
        Unpaid => "unpaid",
        Paid => "paid",
        Failed => "failed",
        Free => "free",
    }
    default = Unpaid
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub client_id: Uuid,
    pub tier_id: Uuid,
    pub subscription_status: SubscriptionStatus,
    pub payment_status: PaymentStatus,
    pub auto_renew: bool,
    pub amount_cents: i64,
    pub discount_cents: i64,
    pub currency: String,
    pub discount_code_id: Option<Uuid>,
    pub activation_code_id: Option<Uuid>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionFilter {
    pub client_id: Option<Uuid>,
    pub status: Option<SubscriptionStatus>,
}

impl Subscription {
    /// New subscription priced by `quote`. Free quotes start active right away.
    pub fn new(client_id: Uuid, tier: &Tier, quote: &PriceQuote, auto_renew: bool, now: DateTime<Utc>) -> Self {
        let mut subscription = Self {
            id: Uuid::new_v4(),
            client_id,
            tier_id: tier.id,
            subscription_status: SubscriptionStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            auto_renew,
            amount_cents: quote.price_cents,
            discount_cents: quote.discount_cents,
            currency: quote.currency.clone(),
            discount_code_id: quote.discount_code_id,
            activation_code_id: None,
            starts_at: None,
            ends_at: None,
            created_at: now,
            updated_at: now,
        };
        if quote.is_free() {
            subscription.payment_status = PaymentStatus::Free;
            subscription.start_period(now, tier);
        }
        subscription
    }

    /// Active subscription paid for by an activation code, running from `start`.
    pub fn prepaid(
        client_id: Uuid,
        tier: &Tier,
        activation_code_id: Uuid,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut subscription = Self::new(client_id, tier, &PriceQuote::prepaid(tier), false, now);
        subscription.payment_status = PaymentStatus::Paid;
        subscription.activation_code_id = Some(activation_code_id);
        subscription.start_period(start, tier);
        subscription
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.starts_at.is_some_and(|start| start <= now)
    }

    pub fn total_cents(&self) -> i64 {
        self.amount_cents - self.discount_cents
    }

    pub fn is_active(&self) -> bool {
        self.subscription_status == SubscriptionStatus::Active
    }

    fn start_period(&mut self, start: DateTime<Utc>, tier: &Tier) {
        self.subscription_status = SubscriptionStatus::Active;
        self.starts_at = Some(start);
        self.ends_at = Some(tier.period_end(start));
        self.updated_at = Utc::now();
    }

    /// Begin the paid period at `start` (which may lie in the future for renewals).
    pub fn activate(&mut self, start: DateTime<Utc>, tier: &Tier) -> Result<(), DomainError> {
        if self.subscription_status != SubscriptionStatus::Pending {
            return Err(DomainError::transition(
                "subscription",
                self.subscription_status,
                SubscriptionStatus::Active,
            ));
        }
        self.start_period(start, tier);
        Ok(())
    }

    /// Record a successful payment. A pending subscription becomes active with
    /// its period beginning at `start`; an already active one only has its
    /// payment status updated.
    pub fn record_payment(&mut self, start: DateTime<Utc>, now: DateTime<Utc>, tier: &Tier) -> Result<(), DomainError> {
        match self.subscription_status {
            SubscriptionStatus::Pending => {
                self.payment_status = PaymentStatus::Paid;
                self.start_period(start, tier);
                Ok(())
            }
            SubscriptionStatus::Active => {
                self.payment_status = PaymentStatus::Paid;
                self.updated_at = now;
                Ok(())
            }
            other => Err(DomainError::transition("subscription", other, "paid")),
        }
    }

    pub fn record_payment_failure(&mut self, now: DateTime<Utc>) {
        if self.payment_status != PaymentStatus::Paid {
            self.payment_status = PaymentStatus::Failed;
            self.updated_at = now;
        }
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self.subscription_status {
            SubscriptionStatus::Pending | SubscriptionStatus::Active => {
                self.subscription_status = SubscriptionStatus::Cancelled;
                self.auto_renew = false;
                self.updated_at = now;
                Ok(())
            }
            other => Err(DomainError::transition("subscription", other, SubscriptionStatus::Cancelled)),
        }
    }

    pub fn is_due_for_expiry(&self, now: DateTime<Utc>) -> bool {
        self.subscription_status == SubscriptionStatus::Active
            && self.ends_at.is_some_and(|end| end <= now)
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_due_for_expiry(now) {
            return Err(DomainError::transition(
                "subscription",
                self.subscription_status,
                SubscriptionStatus::Expired,
            ));
        }
        self.subscription_status = SubscriptionStatus::Expired;
        self.updated_at = now;
        Ok(())
    }

    /// Where the next period should start: the end of this one if it is still
    /// running, otherwise now.
    pub fn next_period_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match (self.subscription_status, self.ends_at) {
            (SubscriptionStatus::Active, Some(end)) if end > now => end,
            _ => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::sample_tier;
    use chrono::Duration;

    #[test]
    fn test_paid_tier_starts_pending() {
        let tier = sample_tier(4900);
        let sub = Subscription::new(Uuid::new_v4(), &tier, &PriceQuote::full_price(&tier), false, Utc::now());
        assert_eq!(sub.subscription_status, SubscriptionStatus::Pending);
        assert_eq!(sub.payment_status, PaymentStatus::Unpaid);
        assert!(sub.starts_at.is_none());
        assert_eq!(sub.total_cents(), 4900);
    }

    #[test]
    fn test_free_quote_starts_active() {
        let tier = sample_tier(0);
        let now = Utc::now();
        let sub = Subscription::new(Uuid::new_v4(), &tier, &PriceQuote::full_price(&tier), false, now);
        assert_eq!(sub.subscription_status, SubscriptionStatus::Active);
        assert_eq!(sub.payment_status, PaymentStatus::Free);
        assert_eq!(sub.ends_at, Some(now + Duration::days(30)));
    }

    #[test]
    fn test_payment_activates_pending() {
        let tier = sample_tier(4900);
        let now = Utc::now();
        let mut sub = Subscription::new(Uuid::new_v4(), &tier, &PriceQuote::full_price(&tier), false, now);
        sub.record_payment(now, now, &tier).unwrap();
        assert!(sub.is_active());
        assert_eq!(sub.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_cancel_and_expire_transitions() {
        let tier = sample_tier(0);
        let now = Utc::now();
        let mut sub = Subscription::new(Uuid::new_v4(), &tier, &PriceQuote::full_price(&tier), true, now);
        assert!(!sub.is_due_for_expiry(now));
        assert!(sub.expire(now).is_err());

        let later = now + Duration::days(31);
        assert!(sub.is_due_for_expiry(later));
        sub.expire(later).unwrap();
        assert_eq!(sub.subscription_status, SubscriptionStatus::Expired);
        assert!(sub.cancel(later).is_err());
    }

    #[test]
    fn test_cancel_clears_auto_renew() {
        let tier = sample_tier(0);
        let mut sub = Subscription::new(Uuid::new_v4(), &tier, &PriceQuote::full_price(&tier), true, Utc::now());
        sub.cancel(Utc::now()).unwrap();
        assert!(!sub.auto_renew);
        assert!(sub.record_payment(Utc::now(), Utc::now(), &tier).is_err());
    }

    #[test]
    fn test_prepaid_can_start_later() {
        let tier = sample_tier(4900);
        let now = Utc::now();
        let start = now + Duration::days(10);
        let sub = Subscription::prepaid(Uuid::new_v4(), &tier, Uuid::new_v4(), start, now);
        assert_eq!(sub.payment_status, PaymentStatus::Paid);
        assert_eq!(sub.total_cents(), 0);
        assert!(sub.is_active());
        assert!(!sub.has_started(now));
        assert!(sub.has_started(start));
        assert_eq!(sub.ends_at, Some(start + Duration::days(30)));
    }

    #[test]
    fn test_next_period_start() {
        let tier = sample_tier(0);
        let now = Utc::now();
        let sub = Subscription::new(Uuid::new_v4(), &tier, &PriceQuote::full_price(&tier), false, now);
        assert_eq!(sub.next_period_start(now), now + Duration::days(30));
        assert_eq!(sub.next_period_start(now + Duration::days(40)), now + Duration::days(40));
    }
}
