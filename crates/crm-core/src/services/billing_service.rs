// ============================================================================
// CRM Core - Billing Service
// File: crates/crm-core/src/services/billing_service.rs
// ============================================================================
//! Invoices and payment settlement, including the payment gateway callback.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crm_security::signature::{SignatureError, WebhookSigner};
use crm_shared::{PaginatedResult, Pagination};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    Invoice, InvoiceFilter, InvoiceStatus, PaymentCallback, PaymentCallbackStatus, PaymentSettlement,
};
use crate::error::DomainError;
use crate::repositories::{InvoiceRepository, ProvisioningStore, SubscriptionRepository, TenantRepository, TierRepository};
use crate::services::subscription_service::period_start_for;

#[derive(Debug, Clone, Serialize)]
pub struct CallbackOutcome {
    pub invoice: Invoice,
    /// False when the callback repeated an already applied payment.
    pub changed: bool,
}

pub struct BillingService<I, S, T, N, P>
where
    I: InvoiceRepository,
    S: SubscriptionRepository,
    T: TierRepository,
    N: TenantRepository,
    P: ProvisioningStore,
{
    invoice_repo: Arc<I>,
    subscription_repo: Arc<S>,
    tier_repo: Arc<T>,
    tenant_repo: Arc<N>,
    store: Arc<P>,
    signer: WebhookSigner,
}

impl<I, S, T, N, P> BillingService<I, S, T, N, P>
where
    I: InvoiceRepository,
    S: SubscriptionRepository,
    T: TierRepository,
    N: TenantRepository,
    P: ProvisioningStore,
{
    pub fn new(
        invoice_repo: Arc<I>,
        subscription_repo: Arc<S>,
        tier_repo: Arc<T>,
        tenant_repo: Arc<N>,
        store: Arc<P>,
        signer: WebhookSigner,
    ) -> Self {
        Self {
            invoice_repo,
            subscription_repo,
            tier_repo,
            tenant_repo,
            store,
            signer,
        }
    }

    pub async fn list(&self, filter: &InvoiceFilter, pagination: Pagination) -> Result<PaginatedResult<Invoice>, DomainError> {
        self.invoice_repo.list(filter, pagination.normalized()).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Invoice, DomainError> {
        self.invoice_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("invoice", id))
    }

    /// Manual settlement by a central administrator.
    pub async fn mark_paid(&self, id: &Uuid, reference: Option<String>) -> Result<Invoice, DomainError> {
        let invoice = self.get(id).await?;
        self.settle(invoice, reference, Utc::now()).await
    }

    pub async fn void(&self, id: &Uuid) -> Result<Invoice, DomainError> {
        let mut invoice = self.get(id).await?;
        invoice.void(Utc::now())?;
        let updated = self.invoice_repo.update(&invoice).await?;
        info!("Invoice voided: {}", updated.number);
        Ok(updated)
    }

    /// Verifies and applies a payment gateway callback. The signature is
    /// checked before anything is read from storage.
    pub async fn handle_callback(
        &self,
        timestamp: i64,
        signature: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<CallbackOutcome, DomainError> {
        self.signer
            .verify(timestamp, body, signature, now.timestamp())
            .map_err(|e| {
                warn!("Rejected payment callback: {}", e);
                match e {
                    SignatureError::Malformed => DomainError::ValidationError("malformed signature".to_string()),
                    _ => DomainError::InvalidCredentials,
                }
            })?;

        let callback: PaymentCallback = serde_json::from_slice(body)
            .map_err(|e| DomainError::ValidationError(format!("malformed callback payload: {}", e)))?;

        let invoice = self
            .invoice_repo
            .find_by_number(&callback.invoice_number)
            .await?
            .ok_or_else(|| DomainError::not_found("invoice", &callback.invoice_number))?;

        match callback.status {
            PaymentCallbackStatus::Paid => {
                if invoice.status == InvoiceStatus::Paid {
                    info!("Payment callback for {} already applied", invoice.number);
                    return Ok(CallbackOutcome { invoice, changed: false });
                }
                if callback.amount_cents != invoice.total_cents {
                    return Err(DomainError::ValidationError(format!(
                        "paid amount {} does not match invoice total {}",
                        callback.amount_cents, invoice.total_cents
                    )));
                }
                let invoice = self.settle(invoice, callback.reference, now).await?;
                Ok(CallbackOutcome { invoice, changed: true })
            }
            PaymentCallbackStatus::Failed => {
                if invoice.status == InvoiceStatus::Paid {
                    return Ok(CallbackOutcome { invoice, changed: false });
                }
                let mut subscription = self
                    .subscription_repo
                    .find_by_id(&invoice.subscription_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("subscription", invoice.subscription_id))?;
                subscription.record_payment_failure(now);
                self.subscription_repo.update(&subscription).await?;
                warn!("Payment failed for invoice {}", invoice.number);
                Ok(CallbackOutcome { invoice, changed: true })
            }
        }
    }

    async fn settle(&self, mut invoice: Invoice, reference: Option<String>, now: DateTime<Utc>) -> Result<Invoice, DomainError> {
        invoice.mark_paid(reference, now)?;

        let mut subscription = self
            .subscription_repo
            .find_by_id(&invoice.subscription_id)
            .await?
            .ok_or_else(|| DomainError::not_found("subscription", invoice.subscription_id))?;
        let tier = self
            .tier_repo
            .find_by_id(&subscription.tier_id)
            .await?
            .ok_or_else(|| DomainError::not_found("tier", subscription.tier_id))?;

        let start = period_start_for(self.subscription_repo.as_ref(), &subscription.client_id, &subscription.id, now).await?;
        subscription.record_payment(start, now, &tier)?;

        let tenant = match self.tenant_repo.find_by_client(&subscription.client_id).await? {
            Some(mut tenant) if tenant.subscription_id == subscription.id || subscription.has_started(now) => {
                tenant.attach(&subscription, now);
                Some(tenant)
            }
            _ => None,
        };

        self.store
            .commit_settlement(&PaymentSettlement {
                invoice: invoice.clone(),
                subscription,
                tenant,
            })
            .await?;

        info!("Invoice {} paid", invoice.number);
        Ok(invoice)
    }
}
