//! Tenant and domain entities (central database)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Subscription;
use crate::error::DomainError;

string_enum! {
    pub enum TenantStatus {
        Pending => "pending",
        Active => "active",
        Suspended => "suspended",
    }
    default = Pending
}

/// One provisioned CRM instance with its own database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub client_id: Uuid,
    pub subscription_id: Uuid,
    pub tier_id: Uuid,
    pub database_name: String,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Host name routed to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantDomain {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub domain: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
}

impl Tenant {
    pub fn new(subscription: &Subscription, database_name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id: subscription.client_id,
            subscription_id: subscription.id,
            tier_id: subscription.tier_id,
            database_name,
            status: if subscription.is_active() { TenantStatus::Active } else { TenantStatus::Pending },
            created_at: now,
            updated_at: now,
        }
    }

    pub fn ensure_serving(&self) -> Result<(), DomainError> {
        match self.status {
            TenantStatus::Active => Ok(()),
            TenantStatus::Pending => Err(DomainError::TenantAwaitingPayment),
            TenantStatus::Suspended => Err(DomainError::TenantNotActive),
        }
    }

    /// Point the tenant at a newly active subscription.
    pub fn attach(&mut self, subscription: &Subscription, now: DateTime<Utc>) {
        self.subscription_id = subscription.id;
        self.tier_id = subscription.tier_id;
        if subscription.is_active() {
            self.status = TenantStatus::Active;
        }
        self.updated_at = now;
    }

    pub fn suspend(&mut self, now: DateTime<Utc>) {
        self.status = TenantStatus::Suspended;
        self.updated_at = now;
    }

    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.status = TenantStatus::Active;
        self.updated_at = now;
    }
}

impl TenantDomain {
    pub fn new(tenant_id: Uuid, domain: &str, is_primary: bool) -> Result<Self, DomainError> {
        let domain = crm_shared::utils::normalize_host(domain);
        let valid = domain.len() <= 253
            && domain.contains('.')
            && domain.split('.').all(|label| {
                !label.is_empty()
                    && label.len() <= 63
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            });
        if !valid {
            return Err(DomainError::ValidationError(format!("invalid domain '{}'", domain)));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            domain,
            is_primary,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::sample_tier;
    use crate::domain::PriceQuote;

    #[test]
    fn test_tenant_status_follows_subscription() {
        let now = Utc::now();
        let paid = sample_tier(100);
        let pending = Subscription::new(Uuid::new_v4(), &paid, &PriceQuote::full_price(&paid), false, now);
        let tenant = Tenant::new(&pending, "tenant_acme".into(), now);
        assert_eq!(tenant.status, TenantStatus::Pending);
        assert!(matches!(tenant.ensure_serving(), Err(DomainError::TenantAwaitingPayment)));

        let free = sample_tier(0);
        let active = Subscription::new(Uuid::new_v4(), &free, &PriceQuote::full_price(&free), false, now);
        let tenant = Tenant::new(&active, "tenant_acme".into(), now);
        assert!(tenant.ensure_serving().is_ok());
    }

    #[test]
    fn test_domain_validation() {
        let tenant_id = Uuid::new_v4();
        assert_eq!(
            TenantDomain::new(tenant_id, "CRM.Acme.com:443", false).unwrap().domain,
            "crm.acme.com"
        );
        assert!(TenantDomain::new(tenant_id, "localhost", false).is_err());
        assert!(TenantDomain::new(tenant_id, "bad_label.acme.com", false).is_err());
        assert!(TenantDomain::new(tenant_id, "-acme.com", false).is_err());
    }
}
