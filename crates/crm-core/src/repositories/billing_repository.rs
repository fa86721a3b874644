//! Subscription and invoice repository traits (ports)

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use crm_shared::{PaginatedResult, Pagination};
use uuid::Uuid;

use crate::domain::{Invoice, InvoiceFilter, Subscription, SubscriptionFilter};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Subscription>, DomainError>;
    async fn list(
        &self,
        filter: &SubscriptionFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Subscription>, DomainError>;
    /// Active or pending subscriptions of a client, newest first.
    async fn find_open_for_client(&self, client_id: &Uuid) -> Result<Vec<Subscription>, DomainError>;
    /// Active subscriptions whose period ended at or before `now`.
    async fn find_due_for_expiry(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, DomainError>;
    async fn update(&self, subscription: &Subscription) -> Result<Subscription, DomainError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Invoice>, DomainError>;
    async fn find_by_number(&self, number: &str) -> Result<Option<Invoice>, DomainError>;
    async fn list(&self, filter: &InvoiceFilter, pagination: Pagination) -> Result<PaginatedResult<Invoice>, DomainError>;
    async fn update(&self, invoice: &Invoice) -> Result<Invoice, DomainError>;
    /// Flags unpaid invoices due before `today` as overdue; returns how many changed.
    async fn mark_overdue(&self, today: NaiveDate) -> Result<u64, DomainError>;
}
