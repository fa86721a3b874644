// ============================================================================
// CRM Core - Subscription Service
// File: crates/crm-core/src/services/subscription_service.rs
// ============================================================================
//! Subscription lifecycle: cancel, auto-renew, renew and the expiry sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crm_shared::config::TenancySettings;
use crm_shared::{PaginatedResult, Pagination};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    Invoice, PriceQuote, RenewalRecord, Subscription, SubscriptionFilter, SubscriptionStatus, Tenant, Tier,
};
use crate::error::DomainError;
use crate::repositories::{InvoiceRepository, ProvisioningStore, SubscriptionRepository, TenantRepository, TierRepository};

/// Where a newly activated period for `client_id` should begin: after the
/// latest running period of another subscription, or now.
pub(crate) async fn period_start_for<S: SubscriptionRepository>(
    subscription_repo: &S,
    client_id: &Uuid,
    excluding: &Uuid,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, DomainError> {
    let open = subscription_repo.find_open_for_client(client_id).await?;
    Ok(open
        .iter()
        .filter(|s| &s.id != excluding && s.is_active())
        .filter_map(|s| s.ends_at)
        .filter(|end| *end > now)
        .max()
        .unwrap_or(now))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub expired: usize,
    pub renewed: usize,
    pub suspended_tenants: usize,
    pub overdue_invoices: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Renewal {
    pub subscription: Subscription,
    pub invoice: Invoice,
}

pub struct SubscriptionService<S, I, T, N, P>
where
    S: SubscriptionRepository,
    I: InvoiceRepository,
    T: TierRepository,
    N: TenantRepository,
    P: ProvisioningStore,
{
    subscription_repo: Arc<S>,
    invoice_repo: Arc<I>,
    tier_repo: Arc<T>,
    tenant_repo: Arc<N>,
    store: Arc<P>,
    settings: TenancySettings,
}

impl<S, I, T, N, P> SubscriptionService<S, I, T, N, P>
where
    S: SubscriptionRepository,
    I: InvoiceRepository,
    T: TierRepository,
    N: TenantRepository,
    P: ProvisioningStore,
{
    pub fn new(
        subscription_repo: Arc<S>,
        invoice_repo: Arc<I>,
        tier_repo: Arc<T>,
        tenant_repo: Arc<N>,
        store: Arc<P>,
        settings: TenancySettings,
    ) -> Self {
        Self {
            subscription_repo,
            invoice_repo,
            tier_repo,
            tenant_repo,
            store,
            settings,
        }
    }

    pub async fn list(
        &self,
        filter: &SubscriptionFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Subscription>, DomainError> {
        self.subscription_repo.list(filter, pagination.normalized()).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Subscription, DomainError> {
        self.subscription_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("subscription", id))
    }

    /// Cancels a pending or active subscription. A tenant running on it is suspended.
    pub async fn cancel(&self, id: &Uuid) -> Result<Subscription, DomainError> {
        let now = Utc::now();
        let mut subscription = self.get(id).await?;
        subscription.cancel(now)?;

        let tenant = match self.tenant_repo.find_by_client(&subscription.client_id).await? {
            Some(mut tenant) if tenant.subscription_id == subscription.id => {
                tenant.suspend(now);
                Some(tenant)
            }
            _ => None,
        };

        self.store.commit_subscription_change(&subscription, tenant).await?;
        info!("Subscription cancelled: {}", subscription.id);
        Ok(subscription)
    }

    pub async fn set_auto_renew(&self, id: &Uuid, auto_renew: bool) -> Result<Subscription, DomainError> {
        let mut subscription = self.get(id).await?;
        if !matches!(
            subscription.subscription_status,
            SubscriptionStatus::Pending | SubscriptionStatus::Active
        ) {
            return Err(DomainError::ValidationError(format!(
                "auto-renew cannot change on a {} subscription",
                subscription.subscription_status
            )));
        }
        subscription.auto_renew = auto_renew;
        subscription.updated_at = Utc::now();
        self.subscription_repo.update(&subscription).await
    }

    /// Opens the next period for the subscription's client: a pending
    /// subscription with an unpaid invoice, or an active one on a free tier.
    pub async fn renew(&self, id: &Uuid) -> Result<Renewal, DomainError> {
        let now = Utc::now();
        let current = self.get(id).await?;
        if current.subscription_status == SubscriptionStatus::Cancelled {
            return Err(DomainError::transition("subscription", current.subscription_status, "renewed"));
        }
        let tier = self.load_tier(&current.tier_id).await?;
        tier.ensure_purchasable()?;
        let tenant = self.tenant_repo.find_by_client(&current.client_id).await?;
        self.open_renewal(&current, &tier, tenant, now).await
    }

    async fn open_renewal(
        &self,
        current: &Subscription,
        tier: &Tier,
        tenant: Option<Tenant>,
        now: DateTime<Utc>,
    ) -> Result<Renewal, DomainError> {
        let open = self.subscription_repo.find_open_for_client(&current.client_id).await?;
        if open
            .iter()
            .any(|s| s.id != current.id && s.subscription_status == SubscriptionStatus::Pending)
        {
            return Err(DomainError::ValidationError(
                "a renewal is already awaiting payment".to_string(),
            ));
        }

        let mut subscription = Subscription::new(current.client_id, tier, &PriceQuote::full_price(tier), current.auto_renew, now);
        if subscription.is_active() {
            // Free tiers activate on the spot; line the period up after the running one.
            let start = current.next_period_start(now);
            subscription.starts_at = Some(start);
            subscription.ends_at = Some(tier.period_end(start));
        }
        let invoice = Invoice::for_subscription(&subscription, now, self.settings.invoice_due_days);

        let tenant = tenant.and_then(|mut t| {
            if subscription.has_started(now) {
                t.attach(&subscription, now);
                Some(t)
            } else {
                None
            }
        });

        self.store
            .commit_renewal(&RenewalRecord {
                subscription: subscription.clone(),
                invoice: invoice.clone(),
                tenant,
                activation_code_id: None,
            })
            .await?;

        info!(
            "Renewal {} opened for client {} ({})",
            subscription.id, subscription.client_id, subscription.subscription_status
        );
        Ok(Renewal { subscription, invoice })
    }

    /// Expires finished periods, moves or suspends their tenants, opens
    /// renewals for auto-renewing subscriptions and flags overdue invoices.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, DomainError> {
        let mut report = SweepReport::default();

        for mut subscription in self.subscription_repo.find_due_for_expiry(now).await? {
            if let Err(e) = subscription.expire(now) {
                warn!("Skipping subscription {} in sweep: {}", subscription.id, e);
                continue;
            }

            let tenant = self.tenant_repo.find_by_client(&subscription.client_id).await?;
            let successor = self.successor_of(&subscription, now).await?;

            let tenant = match tenant {
                Some(mut tenant) if tenant.subscription_id == subscription.id => {
                    match &successor {
                        Some(next) => tenant.attach(next, now),
                        None => {
                            tenant.suspend(now);
                            report.suspended_tenants += 1;
                        }
                    }
                    Some(tenant)
                }
                _ => None,
            };

            self.store.commit_subscription_change(&subscription, tenant.clone()).await?;
            report.expired += 1;
            info!("Subscription expired: {}", subscription.id);

            if subscription.auto_renew && successor.is_none() {
                match self.auto_renew(&subscription, tenant, now).await {
                    Ok(true) => report.renewed += 1,
                    Ok(false) => {}
                    Err(e) => error!("Auto-renewal of {} failed: {}", subscription.id, e),
                }
            }
        }

        report.overdue_invoices = self.invoice_repo.mark_overdue(now.date_naive()).await?;

        if report.expired > 0 || report.overdue_invoices > 0 {
            info!(
                "Sweep finished: {} expired, {} renewed, {} tenants suspended, {} invoices overdue",
                report.expired, report.renewed, report.suspended_tenants, report.overdue_invoices
            );
        }
        Ok(report)
    }

    /// An already running subscription of the same client that can take over.
    async fn successor_of(&self, expired: &Subscription, now: DateTime<Utc>) -> Result<Option<Subscription>, DomainError> {
        let open = self.subscription_repo.find_open_for_client(&expired.client_id).await?;
        Ok(open
            .into_iter()
            .filter(|s| s.id != expired.id && s.has_started(now) && s.ends_at.is_some_and(|end| end > now))
            .max_by_key(|s| s.ends_at))
    }

    async fn auto_renew(&self, expired: &Subscription, tenant: Option<Tenant>, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let tier = self.load_tier(&expired.tier_id).await?;
        if !tier.is_active {
            warn!("Not renewing {}: tier {} is no longer sold", expired.id, tier.id);
            return Ok(false);
        }
        match self.open_renewal(expired, &tier, tenant, now).await {
            Ok(_) => Ok(true),
            Err(DomainError::ValidationError(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn load_tier(&self, id: &Uuid) -> Result<Tier, DomainError> {
        self.tier_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("tier", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::sample_tier;
    use crate::domain::{InvoiceStatus, TenantStatus};
    use crate::repositories::{
        MockInvoiceRepository, MockProvisioningStore, MockSubscriptionRepository, MockTenantRepository,
        MockTierRepository,
    };
    use chrono::Duration;

    struct Mocks {
        subscriptions: MockSubscriptionRepository,
        invoices: MockInvoiceRepository,
        tiers: MockTierRepository,
        tenants: MockTenantRepository,
        store: MockProvisioningStore,
    }

    impl Mocks {
        fn new(tier: &Tier) -> Self {
            let mut tiers = MockTierRepository::new();
            let t = tier.clone();
            tiers.expect_find_by_id().returning(move |_| Ok(Some(t.clone())));
            Self {
                subscriptions: MockSubscriptionRepository::new(),
                invoices: MockInvoiceRepository::new(),
                tiers,
                tenants: MockTenantRepository::new(),
                store: MockProvisioningStore::new(),
            }
        }

        fn service(
            self,
        ) -> SubscriptionService<
            MockSubscriptionRepository,
            MockInvoiceRepository,
            MockTierRepository,
            MockTenantRepository,
            MockProvisioningStore,
        > {
            SubscriptionService::new(
                Arc::new(self.subscriptions),
                Arc::new(self.invoices),
                Arc::new(self.tiers),
                Arc::new(self.tenants),
                Arc::new(self.store),
                TenancySettings {
                    central_domain: "crm.test".into(),
                    database_prefix: "tenant_".into(),
                    invoice_due_days: 7,
                    sweep_interval_seconds: 60,
                },
            )
        }
    }

    fn active_on(tier: &Tier, start: DateTime<Utc>, auto_renew: bool) -> Subscription {
        let mut sub = Subscription::new(Uuid::new_v4(), tier, &PriceQuote::full_price(tier), auto_renew, start);
        sub.record_payment(start, start, tier).unwrap();
        sub
    }

    #[tokio::test]
    async fn test_cancel_suspends_tenant() {
        let tier = sample_tier(4900);
        let sub = active_on(&tier, Utc::now(), true);
        let tenant = Tenant::new(&sub, "tenant_acme".into(), Utc::now());
        let id = sub.id;

        let mut mocks = Mocks::new(&tier);
        mocks.subscriptions.expect_find_by_id().returning(move |_| Ok(Some(sub.clone())));
        mocks.tenants.expect_find_by_client().returning(move |_| Ok(Some(tenant.clone())));
        mocks
            .store
            .expect_commit_subscription_change()
            .withf(|s, t| {
                s.subscription_status == SubscriptionStatus::Cancelled
                    && t.as_ref().is_some_and(|t| t.status == TenantStatus::Suspended)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let cancelled = mocks.service().cancel(&id).await.unwrap();
        assert!(!cancelled.auto_renew);
    }

    #[tokio::test]
    async fn test_renew_creates_pending_with_invoice() {
        let tier = sample_tier(4900);
        let sub = active_on(&tier, Utc::now(), false);
        let id = sub.id;
        let current = sub.clone();

        let mut mocks = Mocks::new(&tier);
        mocks.subscriptions.expect_find_by_id().returning(move |_| Ok(Some(sub.clone())));
        mocks.subscriptions.expect_find_open_for_client().returning(move |_| Ok(vec![current.clone()]));
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks
            .store
            .expect_commit_renewal()
            .withf(|r| r.tenant.is_none() && r.invoice.status == InvoiceStatus::Unpaid)
            .times(1)
            .returning(|_| Ok(()));

        let renewal = mocks.service().renew(&id).await.unwrap();
        assert_eq!(renewal.subscription.subscription_status, SubscriptionStatus::Pending);
        assert_eq!(renewal.invoice.total_cents, 4900);
        assert_eq!(renewal.invoice.subscription_id, renewal.subscription.id);
    }

    #[tokio::test]
    async fn test_renew_refused_while_another_is_pending() {
        let tier = sample_tier(4900);
        let sub = active_on(&tier, Utc::now(), false);
        let id = sub.id;
        let pending = Subscription::new(sub.client_id, &tier, &PriceQuote::full_price(&tier), false, Utc::now());

        let mut mocks = Mocks::new(&tier);
        mocks.subscriptions.expect_find_by_id().returning(move |_| Ok(Some(sub.clone())));
        mocks.subscriptions.expect_find_open_for_client().returning(move |_| Ok(vec![pending.clone()]));
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks.store.expect_commit_renewal().never();

        assert!(mocks.service().renew(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_sweep_expires_and_suspends() {
        let tier = sample_tier(4900);
        let now = Utc::now();
        let sub = active_on(&tier, now - Duration::days(31), false);
        let tenant = Tenant::new(&sub, "tenant_acme".into(), now);

        let mut mocks = Mocks::new(&tier);
        mocks.subscriptions.expect_find_due_for_expiry().returning(move |_| Ok(vec![sub.clone()]));
        mocks.subscriptions.expect_find_open_for_client().returning(|_| Ok(vec![]));
        mocks.tenants.expect_find_by_client().returning(move |_| Ok(Some(tenant.clone())));
        mocks
            .store
            .expect_commit_subscription_change()
            .withf(|s, t| {
                s.subscription_status == SubscriptionStatus::Expired
                    && t.as_ref().is_some_and(|t| t.status == TenantStatus::Suspended)
            })
            .times(1)
            .returning(|_, _| Ok(()));
        mocks.store.expect_commit_renewal().never();
        mocks.invoices.expect_mark_overdue().returning(|_| Ok(2));

        let report = mocks.service().sweep(now).await.unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.suspended_tenants, 1);
        assert_eq!(report.renewed, 0);
        assert_eq!(report.overdue_invoices, 2);
    }

    #[tokio::test]
    async fn test_sweep_moves_tenant_to_running_successor() {
        let tier = sample_tier(4900);
        let now = Utc::now();
        let expired = active_on(&tier, now - Duration::days(30), true);
        let mut successor = active_on(&tier, now - Duration::hours(1), false);
        successor.client_id = expired.client_id;
        let successor_id = successor.id;
        let tenant = Tenant::new(&expired, "tenant_acme".into(), now);

        let mut mocks = Mocks::new(&tier);
        mocks.subscriptions.expect_find_due_for_expiry().returning(move |_| Ok(vec![expired.clone()]));
        mocks
            .subscriptions
            .expect_find_open_for_client()
            .returning(move |_| Ok(vec![successor.clone()]));
        mocks.tenants.expect_find_by_client().returning(move |_| Ok(Some(tenant.clone())));
        mocks
            .store
            .expect_commit_subscription_change()
            .withf(move |_, t| {
                t.as_ref()
                    .is_some_and(|t| t.subscription_id == successor_id && t.status == TenantStatus::Active)
            })
            .times(1)
            .returning(|_, _| Ok(()));
        mocks.store.expect_commit_renewal().never();
        mocks.invoices.expect_mark_overdue().returning(|_| Ok(0));

        let report = mocks.service().sweep(now).await.unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.suspended_tenants, 0);
    }

    #[tokio::test]
    async fn test_sweep_auto_renews() {
        let tier = sample_tier(4900);
        let now = Utc::now();
        let sub = active_on(&tier, now - Duration::days(31), true);

        let mut mocks = Mocks::new(&tier);
        mocks.subscriptions.expect_find_due_for_expiry().returning(move |_| Ok(vec![sub.clone()]));
        mocks.subscriptions.expect_find_open_for_client().returning(|_| Ok(vec![]));
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks.store.expect_commit_subscription_change().returning(|_, _| Ok(()));
        mocks
            .store
            .expect_commit_renewal()
            .withf(|r| r.subscription.subscription_status == SubscriptionStatus::Pending && r.subscription.auto_renew)
            .times(1)
            .returning(|_| Ok(()));
        mocks.invoices.expect_mark_overdue().returning(|_| Ok(0));

        let report = mocks.service().sweep(now).await.unwrap();
        assert_eq!(report.renewed, 1);
    }
}
