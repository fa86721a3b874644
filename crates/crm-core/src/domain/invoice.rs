// ============================================================================
// CRM Core - Invoice Entity
// File: crates/crm-core/src/domain/invoice.rs
// Description: Bill for one subscription period
// ============================================================================

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Subscription;
use crate::error::DomainError;

string_enum! {
    pub enum InvoiceStatus {
        Unpaid => "unpaid",
        Paid => "paid",
        Void => "void",
        Overdue => "overdue",
    }
    default = Unpaid
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub number: String,
    pub client_id: Uuid,
    pub subscription_id: Uuid,
    pub amount_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
    pub client_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
}

impl Invoice {
    /// Invoice for a subscription. Nothing owed means it is issued already paid.
    pub fn for_subscription(subscription: &Subscription, now: DateTime<Utc>, due_days: i64) -> Self {
        let total = subscription.total_cents();
        let settled = total == 0;
        Self {
            id: Uuid::new_v4(),
            number: crm_security::codes::invoice_number(now.date_naive()),
            client_id: subscription.client_id,
            subscription_id: subscription.id,
            amount_cents: subscription.amount_cents,
            discount_cents: subscription.discount_cents,
            total_cents: total,
            currency: subscription.currency.clone(),
            status: if settled { InvoiceStatus::Paid } else { InvoiceStatus::Unpaid },
            due_date: (now + Duration::days(due_days.max(0))).date_naive(),
            paid_at: settled.then_some(now),
            payment_reference: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.payment_reference = Some(reference.into());
        self
    }

    pub fn is_payable(&self) -> bool {
        matches!(self.status, InvoiceStatus::Unpaid | InvoiceStatus::Overdue)
    }

    pub fn mark_paid(&mut self, reference: Option<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_payable() {
            return Err(DomainError::transition("invoice", self.status, InvoiceStatus::Paid));
        }
        self.status = InvoiceStatus::Paid;
        self.paid_at = Some(now);
        if reference.is_some() {
            self.payment_reference = reference;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn void(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_payable() {
            return Err(DomainError::transition("invoice", self.status, InvoiceStatus::Void));
        }
        self.status = InvoiceStatus::Void;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Unpaid && self.due_date < today
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::sample_tier;
    use crate::domain::PriceQuote;

    fn subscription(price: i64) -> Subscription {
        let tier = sample_tier(price);
        Subscription::new(Uuid::new_v4(), &tier, &PriceQuote::full_price(&tier), false, Utc::now())
    }

    #[test]
    fn test_invoice_for_paid_subscription() {
        let now = Utc::now();
        let sub = subscription(4900);
        let invoice = Invoice::for_subscription(&sub, now, 7);
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(invoice.total_cents, 4900);
        assert_eq!(invoice.subscription_id, sub.id);
        assert_eq!(invoice.due_date, (now + Duration::days(7)).date_naive());
    }

    #[test]
    fn test_zero_total_invoice_is_settled() {
        let invoice = Invoice::for_subscription(&subscription(0), Utc::now(), 7);
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(invoice.paid_at.is_some());
    }

    #[test]
    fn test_mark_paid_once() {
        let mut invoice = Invoice::for_subscription(&subscription(100), Utc::now(), 7);
        invoice.mark_paid(Some("gw-1".to_string()), Utc::now()).unwrap();
        assert_eq!(invoice.payment_reference.as_deref(), Some("gw-1"));
        assert!(invoice.mark_paid(None, Utc::now()).is_err());
        assert!(invoice.void(Utc::now()).is_err());
    }

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let invoice = Invoice::for_subscription(&subscription(100), now, 1);
        assert!(!invoice.is_overdue(now.date_naive()));
        assert!(invoice.is_overdue((now + Duration::days(2)).date_naive()));
    }
}
