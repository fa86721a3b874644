// ============================================================================
// CRM Core - Provisioning Service
// File: crates/crm-core/src/services/provisioning_service.rs
// ============================================================================
//! Subscription purchase and tenant provisioning.
//!
//! Order of work:
//! 1. load and check client, tier, price (no writes)
//! 2. create and initialize the tenant database
//! 3. write every central row in one transaction
//!
//! A failure in step 2 or 3 drops the tenant database again, so the central
//! database never references a database that does not exist and no orphan
//! database outlives a failed request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crm_security::password::{PasswordPolicy, PasswordService};
use crm_shared::config::TenancySettings;
use crm_shared::utils::{ensure_database_name_fits, tenant_database_name, tenant_host};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::domain::{
    ActivationCode, Client, Invoice, PriceQuote, ProvisionOutcome, ProvisioningRecord, RenewalRecord,
    Subscription, Tenant, TenantAdminSeed, TenantBlueprint, TenantDomain, Tier,
};
use crate::error::DomainError;
use crate::repositories::{
    ActivationCodeRepository, ClientRepository, DiscountCodeRepository, ProvisioningStore, SubscriptionRepository,
    TenantDatabaseManager, TenantRepository, TierRepository,
};

/// Administrator account requested for the new tenant.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TenantAdminInput {
    #[validate(length(max = 255, message = "Name is too long"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid admin email"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProvisionRequest {
    pub client_id: Uuid,
    pub tier_id: Uuid,
    pub discount_code: Option<String>,
    #[serde(default)]
    pub auto_renew: bool,
    #[validate(nested)]
    pub admin: TenantAdminInput,
}

/// What an activation code redemption produced.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RedemptionOutcome {
    /// The client had no tenant; one was provisioned.
    Provisioned(ProvisionOutcome),
    /// The client already had a tenant; a new prepaid period was added.
    Extended { subscription: Subscription, invoice: Invoice },
}

pub struct ProvisioningService<C, T, D, A, N, S, M, P>
where
    C: ClientRepository,
    T: TierRepository,
    D: DiscountCodeRepository,
    A: ActivationCodeRepository,
    N: TenantRepository,
    S: SubscriptionRepository,
    M: TenantDatabaseManager,
    P: ProvisioningStore,
{
    client_repo: Arc<C>,
    tier_repo: Arc<T>,
    discount_repo: Arc<D>,
    activation_repo: Arc<A>,
    tenant_repo: Arc<N>,
    subscription_repo: Arc<S>,
    databases: Arc<M>,
    store: Arc<P>,
    settings: TenancySettings,
}

impl<C, T, D, A, N, S, M, P> ProvisioningService<C, T, D, A, N, S, M, P>
where
    C: ClientRepository,
    T: TierRepository,
    D: DiscountCodeRepository,
    A: ActivationCodeRepository,
    N: TenantRepository,
    S: SubscriptionRepository,
    M: TenantDatabaseManager,
    P: ProvisioningStore,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_repo: Arc<C>,
        tier_repo: Arc<T>,
        discount_repo: Arc<D>,
        activation_repo: Arc<A>,
        tenant_repo: Arc<N>,
        subscription_repo: Arc<S>,
        databases: Arc<M>,
        store: Arc<P>,
        settings: TenancySettings,
    ) -> Self {
        Self {
            client_repo,
            tier_repo,
            discount_repo,
            activation_repo,
            tenant_repo,
            subscription_repo,
            databases,
            store,
            settings,
        }
    }

    /// Creates a subscription for a client and provisions its tenant.
    pub async fn provision(&self, request: ProvisionRequest) -> Result<ProvisionOutcome, DomainError> {
        let now = Utc::now();
        info!("Provisioning requested for client {} on tier {}", request.client_id, request.tier_id);

        let client = self.load_client(&request.client_id).await?;
        let tier = self.load_tier(&request.tier_id).await?;
        tier.ensure_purchasable()?;

        let quote = match request.discount_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                let code = crm_security::codes::normalize_code(code);
                let discount = self
                    .discount_repo
                    .find_by_code(&code)
                    .await?
                    .ok_or_else(|| DomainError::not_found("discount code", &code))?;
                discount.quote(&tier, now)?
            }
            None => PriceQuote::full_price(&tier),
        };

        let subscription = Subscription::new(client.id, &tier, &quote, request.auto_renew, now);
        self.provision_tenant(&client, subscription, &request.admin, None, now).await
    }

    /// Redeems an activation code for a client. Without a tenant the client is
    /// provisioned on the code's tier; otherwise a prepaid period is appended
    /// to its current one.
    pub async fn redeem_activation_code(
        &self,
        code: &str,
        client_id: &Uuid,
        admin: Option<TenantAdminInput>,
    ) -> Result<RedemptionOutcome, DomainError> {
        let now = Utc::now();
        let normalized = crm_security::codes::normalize_code(code);
        let mut activation = self
            .activation_repo
            .find_by_code(&normalized)
            .await?
            .ok_or_else(|| DomainError::not_found("activation code", &normalized))?;
        activation.ensure_redeemable(now)?;

        let client = self.load_client(client_id).await?;
        // Codes are prepaid, so a tier retired after issuing is still honored.
        let tier = self.load_tier(&activation.tier_id).await?;
        activation.redeem(client.id, now)?;

        match self.tenant_repo.find_by_client(&client.id).await? {
            None => {
                let admin = admin.ok_or_else(|| {
                    DomainError::ValidationError("admin credentials are required to provision a tenant".to_string())
                })?;
                let subscription = Subscription::prepaid(client.id, &tier, activation.id, now, now);
                let outcome = self
                    .provision_tenant(&client, subscription, &admin, Some(&activation), now)
                    .await?;
                Ok(RedemptionOutcome::Provisioned(outcome))
            }
            Some(tenant) => {
                let (subscription, invoice) = self.extend_tenant(tenant, &tier, &activation, now).await?;
                Ok(RedemptionOutcome::Extended { subscription, invoice })
            }
        }
    }

    async fn extend_tenant(
        &self,
        mut tenant: Tenant,
        tier: &Tier,
        activation: &ActivationCode,
        now: DateTime<Utc>,
    ) -> Result<(Subscription, Invoice), DomainError> {
        let current = self.subscription_repo.find_by_id(&tenant.subscription_id).await?;
        let start = current.map(|s| s.next_period_start(now)).unwrap_or(now);

        let subscription = Subscription::prepaid(tenant.client_id, tier, activation.id, start, now);
        let invoice = Invoice::for_subscription(&subscription, now, self.settings.invoice_due_days)
            .with_reference(format!("activation:{}", activation.code));

        // Switch right away only when nothing is running; otherwise the sweep
        // moves the tenant over when the current period ends.
        let switch_now = subscription.has_started(now);
        if switch_now {
            tenant.attach(&subscription, now);
        }

        self.store
            .commit_renewal(&RenewalRecord {
                subscription: subscription.clone(),
                invoice: invoice.clone(),
                tenant: switch_now.then_some(tenant),
                activation_code_id: Some(activation.id),
            })
            .await?;

        info!(
            "Activation code {} extended client {} until {:?}",
            activation.code, subscription.client_id, subscription.ends_at
        );
        Ok((subscription, invoice))
    }

    async fn provision_tenant(
        &self,
        client: &Client,
        subscription: Subscription,
        admin: &TenantAdminInput,
        activation: Option<&ActivationCode>,
        now: DateTime<Utc>,
    ) -> Result<ProvisionOutcome, DomainError> {
        if self.tenant_repo.find_by_client(&client.id).await?.is_some() {
            warn!("Provisioning refused, client {} already has a tenant", client.id);
            return Err(DomainError::TenantAlreadyExists(client.id));
        }

        ensure_database_name_fits(&self.settings.database_prefix, &client.subdomain)?;
        let database_name = tenant_database_name(&self.settings.database_prefix, &client.subdomain);
        if self.tenant_repo.database_name_taken(&database_name).await?
            || self.databases.database_exists(&database_name).await?
        {
            warn!("Provisioning refused, database {} already exists", database_name);
            return Err(DomainError::SubdomainAlreadyExists(client.subdomain.clone()));
        }

        let host = tenant_host(&client.subdomain, &self.settings.central_domain);
        if self.tenant_repo.find_domain(&host).await?.is_some() {
            return Err(DomainError::DomainAlreadyExists(host));
        }

        let admin = self.admin_seed(client, admin)?;

        // Build every central row before touching any database.
        let mut invoice = Invoice::for_subscription(&subscription, now, self.settings.invoice_due_days);
        if let Some(code) = activation {
            invoice = invoice.with_reference(format!("activation:{}", code.code));
        }
        let tenant = Tenant::new(&subscription, database_name.clone(), now);
        let domain = TenantDomain::new(tenant.id, &host, true)?;
        let record = ProvisioningRecord {
            discount_code_id: subscription.discount_code_id,
            activation_code_id: activation.map(|a| a.id),
            subscription,
            invoice,
            tenant,
            domain,
        };
        let blueprint = TenantBlueprint {
            tenant_id: record.tenant.id,
            database_name: database_name.clone(),
            admin,
        };

        self.databases.create_database(&database_name).await?;
        info!("Tenant database created: {}", database_name);

        let committed = match self.databases.initialize(&blueprint).await {
            Ok(()) => self.store.commit_provisioning(&record).await,
            Err(e) => Err(e),
        };

        if let Err(e) = committed {
            error!("Provisioning of {} failed, dropping tenant database: {}", database_name, e);
            if let Err(drop_err) = self.databases.drop_database(&database_name).await {
                error!("Failed to drop tenant database {}: {}", database_name, drop_err);
            }
            return Err(e);
        }

        info!(
            "Tenant {} provisioned for client {} ({}, {})",
            record.tenant.id, client.id, record.domain.domain, record.tenant.status
        );

        Ok(ProvisionOutcome {
            subscription: record.subscription,
            invoice: record.invoice,
            tenant: record.tenant,
            domain: record.domain,
        })
    }

    fn admin_seed(&self, client: &Client, input: &TenantAdminInput) -> Result<TenantAdminSeed, DomainError> {
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(client.name.as_str())
            .to_string();
        let email = match input.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) if email.validate_email() => email.to_lowercase(),
            Some(email) => return Err(DomainError::ValidationError(format!("invalid admin email '{}'", email))),
            None => format!(
                "admin@{}",
                tenant_host(&client.subdomain, &self.settings.central_domain)
            ),
        };

        PasswordPolicy::check(&input.password, &[email.as_str(), name.as_str(), client.subdomain.as_str()])?;
        let password_hash = PasswordService::hash(&input.password)?;
        Ok(TenantAdminSeed { name, email, password_hash })
    }

    async fn load_client(&self, id: &Uuid) -> Result<Client, DomainError> {
        self.client_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("client", id))
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
    use crate::domain::{
        DiscountCode, DiscountKind, InvoiceStatus, NewClient, NewDiscountCode, PaymentStatus, SubscriptionStatus,
        TenantStatus,
    };
    use crate::repositories::{
        MockActivationCodeRepository, MockClientRepository, MockDiscountCodeRepository, MockProvisioningStore,
        MockSubscriptionRepository, MockTenantDatabaseManager, MockTenantRepository, MockTierRepository,
    };
    use chrono::Duration;
    use std::sync::Mutex;

    const STRONG_PASSWORD: &str = "violet-Harbor-lamp-93";

    type Service = ProvisioningService<
        MockClientRepository,
        MockTierRepository,
        MockDiscountCodeRepository,
        MockActivationCodeRepository,
        MockTenantRepository,
        MockSubscriptionRepository,
        MockTenantDatabaseManager,
        MockProvisioningStore,
    >;

    struct Mocks {
        clients: MockClientRepository,
        tiers: MockTierRepository,
        discounts: MockDiscountCodeRepository,
        activations: MockActivationCodeRepository,
        tenants: MockTenantRepository,
        subscriptions: MockSubscriptionRepository,
        databases: MockTenantDatabaseManager,
        store: MockProvisioningStore,
    }

    impl Mocks {
        fn new(client: &Client, tier: &Tier) -> Self {
            let mut clients = MockClientRepository::new();
            let c = client.clone();
            clients.expect_find_by_id().returning(move |_| Ok(Some(c.clone())));
            let mut tiers = MockTierRepository::new();
            let t = tier.clone();
            tiers.expect_find_by_id().returning(move |_| Ok(Some(t.clone())));
            let mut tenants = MockTenantRepository::new();
            tenants.expect_database_name_taken().returning(|_| Ok(false));
            tenants.expect_find_domain().returning(|_| Ok(None));
            let mut databases = MockTenantDatabaseManager::new();
            databases.expect_database_exists().returning(|_| Ok(false));

            Self {
                clients,
                tiers,
                discounts: MockDiscountCodeRepository::new(),
                activations: MockActivationCodeRepository::new(),
                tenants,
                subscriptions: MockSubscriptionRepository::new(),
                databases,
                store: MockProvisioningStore::new(),
            }
        }

        fn service(self) -> Service {
            ProvisioningService::new(
                Arc::new(self.clients),
                Arc::new(self.tiers),
                Arc::new(self.discounts),
                Arc::new(self.activations),
                Arc::new(self.tenants),
                Arc::new(self.subscriptions),
                Arc::new(self.databases),
                Arc::new(self.store),
                settings(),
            )
        }
    }

    fn settings() -> TenancySettings {
        TenancySettings {
            central_domain: "crm.test".to_string(),
            database_prefix: "tenant_".to_string(),
            invoice_due_days: 14,
            sweep_interval_seconds: 3600,
        }
    }

    fn client() -> Client {
        Client::new(NewClient {
            name: "Acme Corp".to_string(),
            email: "owner@acme.test".to_string(),
            phone: None,
            company: None,
            subdomain: "acme-eg".to_string(),
        })
        .unwrap()
    }

    fn request(client: &Client, tier: &Tier) -> ProvisionRequest {
        ProvisionRequest {
            client_id: client.id,
            tier_id: tier.id,
            discount_code: None,
            auto_renew: true,
            admin: TenantAdminInput { name: None, email: None, password: STRONG_PASSWORD.to_string() },
        }
    }

    #[tokio::test]
    async fn test_provision_paid_tier() {
        let client = client();
        let tier = sample_tier(4900);
        let mut mocks = Mocks::new(&client, &tier);
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks
            .databases
            .expect_create_database()
            .withf(|name| name == "tenant_acme_eg")
            .times(1)
            .returning(|_| Ok(()));
        mocks
            .databases
            .expect_initialize()
            .withf(|bp| bp.admin.email == "admin@acme-eg.crm.test" && bp.admin.password_hash != STRONG_PASSWORD)
            .times(1)
            .returning(|_| Ok(()));
        mocks.databases.expect_drop_database().never();
        mocks.store.expect_commit_provisioning().times(1).returning(|_| Ok(()));

        let outcome = mocks.service().provision(request(&client, &tier)).await.unwrap();
        assert_eq!(outcome.subscription.subscription_status, SubscriptionStatus::Pending);
        assert_eq!(outcome.subscription.payment_status, PaymentStatus::Unpaid);
        assert_eq!(outcome.invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(outcome.invoice.total_cents, 4900);
        assert_eq!(outcome.tenant.status, TenantStatus::Pending);
        assert_eq!(outcome.tenant.database_name, "tenant_acme_eg");
        assert_eq!(outcome.domain.domain, "acme-eg.crm.test");
        assert!(outcome.domain.is_primary);
        assert_eq!(outcome.domain.tenant_id, outcome.tenant.id);
    }

    #[tokio::test]
    async fn test_provision_with_full_discount_is_free() {
        let client = client();
        let tier = sample_tier(4900);
        let discount = DiscountCode::new(NewDiscountCode {
            code: "FOUNDERS".into(),
            kind: DiscountKind::Percent,
            value: 100,
            tier_id: Some(tier.id),
            max_uses: Some(10),
            expires_at: None,
        })
        .unwrap();
        let discount_id = discount.id;

        let mut mocks = Mocks::new(&client, &tier);
        mocks.discounts.expect_find_by_code().returning(move |_| Ok(Some(discount.clone())));
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks.databases.expect_create_database().returning(|_| Ok(()));
        mocks.databases.expect_initialize().returning(|_| Ok(()));
        mocks
            .store
            .expect_commit_provisioning()
            .withf(move |r| r.discount_code_id == Some(discount_id) && r.activation_code_id.is_none())
            .times(1)
            .returning(|_| Ok(()));

        let mut req = request(&client, &tier);
        req.discount_code = Some("founders".into());
        let outcome = mocks.service().provision(req).await.unwrap();
        assert_eq!(outcome.subscription.subscription_status, SubscriptionStatus::Active);
        assert_eq!(outcome.subscription.payment_status, PaymentStatus::Free);
        assert_eq!(outcome.invoice.status, InvoiceStatus::Paid);
        assert_eq!(outcome.tenant.status, TenantStatus::Active);
        assert_eq!(
            outcome.subscription.ends_at.zip(outcome.subscription.starts_at).map(|(e, s)| e - s),
            Some(Duration::days(30))
        );
    }

    #[tokio::test]
    async fn test_existing_tenant_conflicts_before_any_database_work() {
        let client = client();
        let tier = sample_tier(0);
        let existing = {
            let sub = Subscription::new(client.id, &tier, &PriceQuote::full_price(&tier), false, Utc::now());
            Tenant::new(&sub, "tenant_acme_eg".into(), Utc::now())
        };
        let mut mocks = Mocks::new(&client, &tier);
        mocks.tenants.expect_find_by_client().returning(move |_| Ok(Some(existing.clone())));
        mocks.databases.expect_create_database().never();
        mocks.store.expect_commit_provisioning().never();

        let result = mocks.service().provision(request(&client, &tier)).await;
        assert!(matches!(result, Err(DomainError::TenantAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_weak_admin_password_rejected_up_front() {
        let client = client();
        let tier = sample_tier(0);
        let mut mocks = Mocks::new(&client, &tier);
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks.databases.expect_create_database().never();

        let mut req = request(&client, &tier);
        req.admin.password = "password".into();
        assert!(mocks.service().provision(req).await.is_err());
    }

    #[tokio::test]
    async fn test_non_ascii_admin_email_rejected_before_database_work() {
        let client = client();
        let tier = sample_tier(0);
        let mut mocks = Mocks::new(&client, &tier);
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks.databases.expect_create_database().never();
        mocks.store.expect_commit_provisioning().never();

        let mut req = request(&client, &tier);
        req.admin.email = Some("日本語@acme.test".into());
        assert!(req.validate().is_err());
        let result = mocks.service().provision(req).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_subdomain_too_long_for_database_name_is_validation_error() {
        let mut client = client();
        client.subdomain = "a".repeat(60);
        let tier = sample_tier(0);
        let mut mocks = Mocks::new(&client, &tier);
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks.databases.expect_create_database().never();

        let result = mocks.service().provision(request(&client, &tier)).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_failed_commit_drops_tenant_database() {
        let client = client();
        let tier = sample_tier(4900);
        let dropped = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen = dropped.clone();

        let mut mocks = Mocks::new(&client, &tier);
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks.databases.expect_create_database().returning(|_| Ok(()));
        mocks.databases.expect_initialize().returning(|_| Ok(()));
        mocks
            .databases
            .expect_drop_database()
            .times(1)
            .returning(move |name| {
                seen.lock().unwrap().push(name.to_string());
                Ok(())
            });
        mocks
            .store
            .expect_commit_provisioning()
            .returning(|_| Err(DomainError::DatabaseError("connection reset".into())));

        let result = mocks.service().provision(request(&client, &tier)).await;
        assert!(matches!(result, Err(DomainError::DatabaseError(_))));
        assert_eq!(*dropped.lock().unwrap(), vec!["tenant_acme_eg".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_initialization_drops_database_and_skips_commit() {
        let client = client();
        let tier = sample_tier(4900);
        let mut mocks = Mocks::new(&client, &tier);
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks.databases.expect_create_database().returning(|_| Ok(()));
        mocks
            .databases
            .expect_initialize()
            .returning(|_| Err(DomainError::ProvisioningFailed("schema".into())));
        mocks.databases.expect_drop_database().times(1).returning(|_| Ok(()));
        mocks.store.expect_commit_provisioning().never();

        assert!(mocks.service().provision(request(&client, &tier)).await.is_err());
    }

    #[tokio::test]
    async fn test_redeem_code_provisions_new_client() {
        let client = client();
        let tier = sample_tier(9900);
        let code = ActivationCode::generate(tier.id, None);
        let code_id = code.id;
        let code_text = code.code.clone();

        let mut mocks = Mocks::new(&client, &tier);
        mocks.activations.expect_find_by_code().returning(move |_| Ok(Some(code.clone())));
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks.databases.expect_create_database().returning(|_| Ok(()));
        mocks.databases.expect_initialize().returning(|_| Ok(()));
        mocks
            .store
            .expect_commit_provisioning()
            .withf(move |r| r.activation_code_id == Some(code_id))
            .times(1)
            .returning(|_| Ok(()));

        let admin = TenantAdminInput { name: None, email: None, password: STRONG_PASSWORD.into() };
        let outcome = mocks
            .service()
            .redeem_activation_code(&code_text.to_lowercase(), &client.id, Some(admin))
            .await
            .unwrap();

        match outcome {
            RedemptionOutcome::Provisioned(o) => {
                assert_eq!(o.subscription.payment_status, PaymentStatus::Paid);
                assert_eq!(o.subscription.subscription_status, SubscriptionStatus::Active);
                assert_eq!(o.invoice.total_cents, 0);
                assert_eq!(o.invoice.status, InvoiceStatus::Paid);
                assert_eq!(o.invoice.payment_reference, Some(format!("activation:{}", code_text)));
                assert_eq!(o.tenant.status, TenantStatus::Active);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redeem_code_extends_existing_tenant() {
        let client = client();
        let tier = sample_tier(9900);
        let now = Utc::now();
        let free = sample_tier(0);
        let running = Subscription::new(client.id, &free, &PriceQuote::full_price(&free), false, now);
        let running_end = running.ends_at.unwrap();
        let tenant = Tenant::new(&running, "tenant_acme_eg".into(), now);
        let code = ActivationCode::generate(tier.id, None);
        let code_text = code.code.clone();

        let mut mocks = Mocks::new(&client, &tier);
        mocks.activations.expect_find_by_code().returning(move |_| Ok(Some(code.clone())));
        mocks.tenants.expect_find_by_client().returning(move |_| Ok(Some(tenant.clone())));
        mocks.subscriptions.expect_find_by_id().returning(move |_| Ok(Some(running.clone())));
        mocks.databases.expect_create_database().never();
        mocks
            .store
            .expect_commit_renewal()
            .withf(|r| r.tenant.is_none() && r.activation_code_id.is_some())
            .times(1)
            .returning(|_| Ok(()));

        let outcome = mocks.service().redeem_activation_code(&code_text, &client.id, None).await.unwrap();
        match outcome {
            RedemptionOutcome::Extended { subscription, invoice } => {
                assert_eq!(subscription.starts_at, Some(running_end));
                assert_eq!(invoice.total_cents, 0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_used_code_cannot_be_redeemed_again() {
        let client = client();
        let tier = sample_tier(0);
        let mut code = ActivationCode::generate(tier.id, None);
        code.redeem(Uuid::new_v4(), Utc::now()).unwrap();

        let mut mocks = Mocks::new(&client, &tier);
        mocks.activations.expect_find_by_code().returning(move |_| Ok(Some(code.clone())));
        mocks.store.expect_commit_provisioning().never();
        mocks.store.expect_commit_renewal().never();

        let result = mocks.service().redeem_activation_code("ANY", &client.id, None).await;
        assert!(matches!(result, Err(DomainError::ActivationCodeAlreadyUsed)));
    }

    #[tokio::test]
    async fn test_concurrent_redemption_surfaces_conflict() {
        // The store's guarded update finds the code already used.
        let client = client();
        let tier = sample_tier(0);
        let code = ActivationCode::generate(tier.id, None);

        let mut mocks = Mocks::new(&client, &tier);
        mocks.activations.expect_find_by_code().returning(move |_| Ok(Some(code.clone())));
        mocks.tenants.expect_find_by_client().returning(|_| Ok(None));
        mocks.databases.expect_create_database().returning(|_| Ok(()));
        mocks.databases.expect_initialize().returning(|_| Ok(()));
        mocks
            .store
            .expect_commit_provisioning()
            .returning(|_| Err(DomainError::ActivationCodeAlreadyUsed));
        mocks.databases.expect_drop_database().times(1).returning(|_| Ok(()));

        let admin = TenantAdminInput { name: None, email: None, password: STRONG_PASSWORD.into() };
        let result = mocks.service().redeem_activation_code("X", &client.id, Some(admin)).await;
        assert!(matches!(result, Err(DomainError::ActivationCodeAlreadyUsed)));
    }
}
