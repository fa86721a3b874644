//! Tenant administration and host resolution

use std::sync::Arc;

use chrono::Utc;
use crm_shared::utils::{normalize_host, tenant_host};
use crm_shared::{PaginatedResult, Pagination};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Tenant, TenantDomain, TenantFilter};
use crate::error::DomainError;
use crate::repositories::{SubscriptionRepository, TenantRepository};

#[derive(Debug, Clone, Serialize)]
pub struct TenantDetails {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub domains: Vec<TenantDomain>,
}

pub struct TenantService<N: TenantRepository, S: SubscriptionRepository> {
    tenant_repo: Arc<N>,
    subscription_repo: Arc<S>,
    central_domain: String,
}

impl<N: TenantRepository, S: SubscriptionRepository> TenantService<N, S> {
    pub fn new(tenant_repo: Arc<N>, subscription_repo: Arc<S>, central_domain: String) -> Self {
        Self {
            tenant_repo,
            subscription_repo,
            central_domain,
        }
    }

    pub async fn list(&self, filter: &TenantFilter, pagination: Pagination) -> Result<PaginatedResult<Tenant>, DomainError> {
        self.tenant_repo.list(filter, pagination.normalized()).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<TenantDetails, DomainError> {
        let tenant = self.load(id).await?;
        let domains = self.tenant_repo.domains(&tenant.id).await?;
        Ok(TenantDetails { tenant, domains })
    }

    pub async fn suspend(&self, id: &Uuid) -> Result<Tenant, DomainError> {
        let mut tenant = self.load(id).await?;
        tenant.suspend(Utc::now());
        let tenant = self.tenant_repo.update(&tenant).await?;
        info!("Tenant suspended: {}", tenant.database_name);
        Ok(tenant)
    }

    /// Reactivation needs the current subscription to be running.
    pub async fn activate(&self, id: &Uuid) -> Result<Tenant, DomainError> {
        let mut tenant = self.load(id).await?;
        let subscription = self
            .subscription_repo
            .find_by_id(&tenant.subscription_id)
            .await?
            .ok_or_else(|| DomainError::not_found("subscription", tenant.subscription_id))?;
        if !subscription.is_active() {
            return Err(DomainError::transition("tenant", tenant.status, "active"));
        }
        tenant.activate(Utc::now());
        let tenant = self.tenant_repo.update(&tenant).await?;
        info!("Tenant activated: {}", tenant.database_name);
        Ok(tenant)
    }

    pub async fn add_domain(&self, tenant_id: &Uuid, domain: &str) -> Result<TenantDomain, DomainError> {
        let tenant = self.load(tenant_id).await?;
        let domain = TenantDomain::new(tenant.id, domain, false)?;
        if self.tenant_repo.find_domain(&domain.domain).await?.is_some() {
            return Err(DomainError::DomainAlreadyExists(domain.domain));
        }
        let domain = self.tenant_repo.add_domain(&domain).await?;
        info!("Domain {} added to tenant {}", domain.domain, tenant.database_name);
        Ok(domain)
    }

    pub async fn remove_domain(&self, tenant_id: &Uuid, domain_id: &Uuid) -> Result<(), DomainError> {
        let domains = self.tenant_repo.domains(tenant_id).await?;
        let domain = domains
            .iter()
            .find(|d| &d.id == domain_id)
            .ok_or_else(|| DomainError::not_found("domain", domain_id))?;
        if domain.is_primary {
            return Err(DomainError::ValidationError("the primary domain cannot be removed".to_string()));
        }
        self.tenant_repo.remove_domain(domain_id).await?;
        info!("Domain {} removed", domain.domain);
        Ok(())
    }

    /// Tenant serving a `Host` header value.
    pub async fn resolve_host(&self, host: &str) -> Result<Tenant, DomainError> {
        let host = normalize_host(host);
        self.tenant_repo
            .find_by_host(&host)
            .await?
            .ok_or_else(|| DomainError::not_found("tenant", host))
    }

    /// Tenant addressed by subdomain, as sent in the `X-Tenant` header.
    pub async fn resolve_subdomain(&self, subdomain: &str) -> Result<Tenant, DomainError> {
        let host = tenant_host(subdomain.trim(), &self.central_domain);
        self.resolve_host(&host).await
    }

    async fn load(&self, id: &Uuid) -> Result<Tenant, DomainError> {
        self.tenant_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("tenant", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::sample_tier;
    use crate::domain::{PriceQuote, Subscription, TenantStatus};
    use crate::repositories::{MockSubscriptionRepository, MockTenantRepository};

    fn tenant_on(subscription: &Subscription) -> Tenant {
        Tenant::new(subscription, "tenant_acme".into(), Utc::now())
    }

    fn service(tenants: MockTenantRepository, subs: MockSubscriptionRepository) -> TenantService<MockTenantRepository, MockSubscriptionRepository> {
        TenantService::new(Arc::new(tenants), Arc::new(subs), "crm.test".into())
    }

    #[tokio::test]
    async fn test_activate_requires_active_subscription() {
        let tier = sample_tier(4900);
        let pending = Subscription::new(Uuid::new_v4(), &tier, &PriceQuote::full_price(&tier), false, Utc::now());
        let tenant = tenant_on(&pending);
        let id = tenant.id;

        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        tenants.expect_update().never();
        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_by_id().returning(move |_| Ok(Some(pending.clone())));

        let result = service(tenants, subs).activate(&id).await;
        assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_activate_suspended_tenant() {
        let tier = sample_tier(0);
        let active = Subscription::new(Uuid::new_v4(), &tier, &PriceQuote::full_price(&tier), false, Utc::now());
        let mut tenant = tenant_on(&active);
        tenant.suspend(Utc::now());
        let id = tenant.id;

        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        tenants
            .expect_update()
            .withf(|t| t.status == TenantStatus::Active)
            .times(1)
            .returning(|t| Ok(t.clone()));
        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_by_id().returning(move |_| Ok(Some(active.clone())));

        assert_eq!(service(tenants, subs).activate(&id).await.unwrap().status, TenantStatus::Active);
    }

    #[tokio::test]
    async fn test_primary_domain_cannot_be_removed() {
        let tenant_id = Uuid::new_v4();
        let primary = TenantDomain::new(tenant_id, "acme.crm.test", true).unwrap();
        let primary_id = primary.id;

        let mut tenants = MockTenantRepository::new();
        tenants.expect_domains().returning(move |_| Ok(vec![primary.clone()]));
        tenants.expect_remove_domain().never();

        let result = service(tenants, MockSubscriptionRepository::new())
            .remove_domain(&tenant_id, &primary_id)
            .await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_duplicate_domain_rejected() {
        let tier = sample_tier(0);
        let active = Subscription::new(Uuid::new_v4(), &tier, &PriceQuote::full_price(&tier), false, Utc::now());
        let tenant = tenant_on(&active);
        let id = tenant.id;
        let taken = TenantDomain::new(Uuid::new_v4(), "crm.acme.com", false).unwrap();

        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        tenants
            .expect_find_domain()
            .withf(|d| d == "crm.acme.com")
            .returning(move |_| Ok(Some(taken.clone())));
        tenants.expect_add_domain().never();

        let result = service(tenants, MockSubscriptionRepository::new())
            .add_domain(&id, "CRM.Acme.com")
            .await;
        assert!(matches!(result, Err(DomainError::DomainAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_resolve_subdomain_uses_primary_host() {
        let mut tenants = MockTenantRepository::new();
        tenants
            .expect_find_by_host()
            .withf(|h| h == "acme.crm.test")
            .times(1)
            .returning(|_| Ok(None));

        let result = service(tenants, MockSubscriptionRepository::new())
            .resolve_subdomain("acme")
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_resolve_host_normalizes_header_value() {
        let mut tenants = MockTenantRepository::new();
        tenants
            .expect_find_by_host()
            .withf(|h| h == "acme.crm.test")
            .times(2)
            .returning(|_| Ok(None));
        let service = service(tenants, MockSubscriptionRepository::new());

        assert!(service.resolve_host("Acme.CRM.test.:8080").await.is_err());
        assert!(service.resolve_host(" acme.crm.test. ").await.is_err());
    }
}
