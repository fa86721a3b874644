//! Application state shared across handlers

use std::sync::Arc;

use crm_core::services::{
    ActivationCodeService, BillingService, CentralAuthService, ClientService, DiscountCodeService,
    ProvisioningService, SubscriptionService, TenantService, TierService,
};
use crm_infrastructure::{
    PgActivationCodeRepository, PgCentralUserRepository, PgClientRepository, PgDiscountCodeRepository,
    PgInvoiceRepository, PgProvisioningStore, PgSubscriptionRepository, PgTenantDatabaseManager,
    PgTenantRepository, PgTierRepository, TenantPools,
};
use crm_security::{JwtService, WebhookSigner};
use crm_shared::config::AppConfig;
use sqlx::PgPool;

pub type CentralAuth = CentralAuthService<PgCentralUserRepository>;
pub type Clients = ClientService<PgClientRepository, PgTenantRepository>;
pub type Tiers = TierService<PgTierRepository>;
pub type ActivationCodes = ActivationCodeService<PgActivationCodeRepository, PgTierRepository>;
pub type DiscountCodes = DiscountCodeService<PgDiscountCodeRepository, PgTierRepository>;
pub type Tenants = TenantService<PgTenantRepository, PgSubscriptionRepository>;
pub type Provisioning = ProvisioningService<
    PgClientRepository,
    PgTierRepository,
    PgDiscountCodeRepository,
    PgActivationCodeRepository,
    PgTenantRepository,
    PgSubscriptionRepository,
    PgTenantDatabaseManager,
    PgProvisioningStore,
>;
pub type Subscriptions = SubscriptionService<
    PgSubscriptionRepository,
    PgInvoiceRepository,
    PgTierRepository,
    PgTenantRepository,
    PgProvisioningStore,
>;
pub type Billing = BillingService<
    PgInvoiceRepository,
    PgSubscriptionRepository,
    PgTierRepository,
    PgTenantRepository,
    PgProvisioningStore,
>;

#[derive(Clone)]
pub struct AppState {
    /// Central (landlord) database.
    pub db: PgPool,
    pub tenant_pools: Arc<TenantPools>,
    pub config: AppConfig,
    pub jwt: Arc<JwtService>,
    pub signer: WebhookSigner,
}

impl AppState {
    pub fn new(db: PgPool, config: AppConfig) -> Self {
        let tenant_pools = Arc::new(TenantPools::new(config.database.clone()));
        let jwt = Arc::new(JwtService::new(config.jwt.secret.clone(), config.jwt.access_token_expiry));
        let signer = WebhookSigner::new(config.payment.webhook_secret.clone(), config.payment.timestamp_tolerance);
        Self {
            db,
            tenant_pools,
            config,
            jwt,
            signer,
        }
    }

    pub fn central_auth(&self) -> CentralAuth {
        CentralAuthService::new(Arc::new(PgCentralUserRepository::new(self.db.clone())), self.jwt.clone())
    }

    pub fn clients(&self) -> Clients {
        ClientService::new(
            self.client_repo(),
            self.tenant_repo(),
            self.config.tenancy.database_prefix.clone(),
        )
    }

    pub fn tiers(&self) -> Tiers {
        TierService::new(self.tier_repo())
    }

    pub fn activation_codes(&self) -> ActivationCodes {
        ActivationCodeService::new(Arc::new(PgActivationCodeRepository::new(self.db.clone())), self.tier_repo())
    }

    pub fn discount_codes(&self) -> DiscountCodes {
        DiscountCodeService::new(Arc::new(PgDiscountCodeRepository::new(self.db.clone())), self.tier_repo())
    }

    pub fn tenants(&self) -> Tenants {
        TenantService::new(
            self.tenant_repo(),
            self.subscription_repo(),
            self.config.tenancy.central_domain.clone(),
        )
    }

    pub fn provisioning(&self) -> Provisioning {
        ProvisioningService::new(
            self.client_repo(),
            self.tier_repo(),
            Arc::new(PgDiscountCodeRepository::new(self.db.clone())),
            Arc::new(PgActivationCodeRepository::new(self.db.clone())),
            self.tenant_repo(),
            self.subscription_repo(),
            Arc::new(PgTenantDatabaseManager::new(self.db.clone(), self.tenant_pools.clone())),
            self.store(),
            self.config.tenancy.clone(),
        )
    }

    pub fn subscriptions(&self) -> Subscriptions {
        SubscriptionService::new(
            self.subscription_repo(),
            self.invoice_repo(),
            self.tier_repo(),
            self.tenant_repo(),
            self.store(),
            self.config.tenancy.clone(),
        )
    }

    pub fn billing(&self) -> Billing {
        BillingService::new(
            self.invoice_repo(),
            self.subscription_repo(),
            self.tier_repo(),
            self.tenant_repo(),
            self.store(),
            self.signer.clone(),
        )
    }

    pub(crate) fn tier_repo(&self) -> Arc<PgTierRepository> {
        Arc::new(PgTierRepository::new(self.db.clone()))
    }

    fn client_repo(&self) -> Arc<PgClientRepository> {
        Arc::new(PgClientRepository::new(self.db.clone()))
    }

    fn tenant_repo(&self) -> Arc<PgTenantRepository> {
        Arc::new(PgTenantRepository::new(self.db.clone()))
    }

    fn subscription_repo(&self) -> Arc<PgSubscriptionRepository> {
        Arc::new(PgSubscriptionRepository::new(self.db.clone()))
    }

    fn invoice_repo(&self) -> Arc<PgInvoiceRepository> {
        Arc::new(PgInvoiceRepository::new(self.db.clone()))
    }

    fn store(&self) -> Arc<PgProvisioningStore> {
        Arc::new(PgProvisioningStore::new(self.db.clone()))
    }
}
