// ============================================================================
// CRM Core - Provisioning Records
// File: crates/crm-core/src/domain/provisioning.rs
// Description: Value objects passed between provisioning services and adapters
// ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Invoice, Subscription, Tenant, TenantDomain};

/// Administrator created inside a fresh tenant database.
#[derive(Debug, Clone)]
pub struct TenantAdminSeed {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Everything a tenant database needs to come up.
#[derive(Debug, Clone)]
pub struct TenantBlueprint {
    pub tenant_id: Uuid,
    pub database_name: String,
    pub admin: TenantAdminSeed,
}

/// Central rows written in one transaction once the tenant database is ready.
#[derive(Debug, Clone)]
pub struct ProvisioningRecord {
    pub subscription: Subscription,
    pub invoice: Invoice,
    pub tenant: Tenant,
    pub domain: TenantDomain,
    /// Incremented with a guard against `max_uses`.
    pub discount_code_id: Option<Uuid>,
    /// Flipped from `unused` to `used` with a guard on the current status.
    pub activation_code_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionOutcome {
    pub subscription: Subscription,
    pub invoice: Invoice,
    pub tenant: Tenant,
    pub domain: TenantDomain,
}

/// New subscription period for a client that already has a tenant.
#[derive(Debug, Clone)]
pub struct RenewalRecord {
    pub subscription: Subscription,
    pub invoice: Invoice,
    /// Present when the tenant switches to the new subscription right away.
    pub tenant: Option<Tenant>,
    pub activation_code_id: Option<Uuid>,
}

string_enum! {
    pub enum PaymentCallbackStatus {
        Paid => "paid",
        Failed => "failed",
    }
    default = Failed
}

/// Payload posted by the payment gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCallback {
    pub invoice_number: String,
    pub status: PaymentCallbackStatus,
    pub reference: Option<String>,
    pub amount_cents: i64,
}

/// State changes caused by a payment, persisted atomically.
#[derive(Debug, Clone)]
pub struct PaymentSettlement {
    pub invoice: Invoice,
    pub subscription: Subscription,
    pub tenant: Option<Tenant>,
}
