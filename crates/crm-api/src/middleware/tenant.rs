// ============================================================================
// CRM API - Tenant Resolution
// File: crates/crm-api/src/middleware/tenant.rs
// ============================================================================
//! Resolves the tenant a request is addressed to and hands out services bound
//! to that tenant's database.
//!
//! The `X-Tenant` header (a subdomain) wins over `Host`, which may be any
//! domain registered for the tenant. Pending tenants answer 402, suspended
//! ones 403. The resolved context is cached in the request extensions so
//! several extractors on one handler resolve it once.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::HOST, request::Parts},
};
use crm_core::domain::{Tenant, TierLimits};
use crm_core::error::DomainError;
use crm_core::repositories::TierRepository;
use crm_core::services::{
    CatalogService, ContactService, DashboardService, DealService, LeadService, LocationService,
    PipelineService, RoleService, TaskService, TeamService, TenantAuthService, UserService,
};
use crm_infrastructure::{
    PgCatalogRepository, PgContactRepository, PgDealRepository, PgLeadRepository, PgLocationRepository,
    PgPipelineRepository, PgRoleRepository, PgTaskRepository, PgTeamRepository, PgUserRepository,
};
use crm_security::JwtService;
use crm_shared::constants::TENANT_HEADER;
use sqlx::PgPool;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::state::AppState;

pub type Leads = LeadService<PgLeadRepository, PgCatalogRepository, PgPipelineRepository>;
pub type Contacts = ContactService<PgContactRepository>;
pub type Deals = DealService<PgDealRepository, PgPipelineRepository>;
pub type Tasks = TaskService<PgTaskRepository>;
pub type Pipelines = PipelineService<PgPipelineRepository, PgDealRepository>;
pub type Catalog = CatalogService<PgCatalogRepository>;
pub type Locations = LocationService<PgLocationRepository>;
pub type Users = UserService<PgUserRepository, PgRoleRepository>;
pub type Roles = RoleService<PgRoleRepository>;
pub type Teams = TeamService<PgTeamRepository, PgUserRepository>;
pub type Dashboard = DashboardService<PgLeadRepository, PgDealRepository, PgTaskRepository>;
pub type TenantAuthentication = TenantAuthService<PgUserRepository, PgRoleRepository>;

#[derive(Clone)]
pub struct TenantContext {
    pub tenant: Tenant,
    pub limits: TierLimits,
    pub pool: PgPool,
}

impl FromRequestParts<AppState> for TenantContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<TenantContext>() {
            return Ok(ctx.clone());
        }

        let header = |name| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        let tenants = state.tenants();
        let tenant = match (header(TENANT_HEADER), header(HOST.as_str())) {
            (Some(subdomain), _) => tenants.resolve_subdomain(subdomain).await?,
            (None, Some(host)) => tenants.resolve_host(host).await?,
            (None, None) => return Err(ApiError::UnknownTenant),
        };
        tenant.ensure_serving()?;

        let tier = state
            .tier_repo()
            .find_by_id(&tenant.tier_id)
            .await?
            .ok_or_else(|| DomainError::InternalError(format!("tenant {} has no tier", tenant.id)))?;
        let pool = state.tenant_pools.get(&tenant.database_name).map_err(|e| {
            error!("Tenant pool for {} unavailable: {}", tenant.database_name, e);
            ApiError::Internal("tenant database unavailable".to_string())
        })?;
        debug!("Request resolved to tenant {} ({})", tenant.id, tenant.database_name);

        let ctx = TenantContext {
            tenant,
            limits: tier.limits(),
            pool,
        };
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

impl TenantContext {
    /// Fails with 403 when the tenant's tier does not include `module`.
    pub fn module(&self, module: &str) -> Result<(), ApiError> {
        Ok(self.limits.ensure_module(module)?)
    }

    fn lead_repo(&self) -> Arc<PgLeadRepository> {
        Arc::new(PgLeadRepository::new(self.pool.clone()))
    }

    fn deal_repo(&self) -> Arc<PgDealRepository> {
        Arc::new(PgDealRepository::new(self.pool.clone()))
    }

    fn task_repo(&self) -> Arc<PgTaskRepository> {
        Arc::new(PgTaskRepository::new(self.pool.clone()))
    }

    fn pipeline_repo(&self) -> Arc<PgPipelineRepository> {
        Arc::new(PgPipelineRepository::new(self.pool.clone()))
    }

    fn catalog_repo(&self) -> Arc<PgCatalogRepository> {
        Arc::new(PgCatalogRepository::new(self.pool.clone()))
    }

    fn user_repo(&self) -> Arc<PgUserRepository> {
        Arc::new(PgUserRepository::new(self.pool.clone()))
    }

    fn role_repo(&self) -> Arc<PgRoleRepository> {
        Arc::new(PgRoleRepository::new(self.pool.clone()))
    }

    pub fn auth(&self, jwt: Arc<JwtService>) -> TenantAuthentication {
        TenantAuthService::new(self.user_repo(), self.role_repo(), jwt, self.tenant.id)
    }

    pub fn leads(&self) -> Leads {
        LeadService::new(self.lead_repo(), self.catalog_repo(), self.pipeline_repo(), self.limits.clone())
    }

    pub fn contacts(&self) -> Contacts {
        ContactService::new(Arc::new(PgContactRepository::new(self.pool.clone())))
    }

    pub fn deals(&self) -> Deals {
        DealService::new(self.deal_repo(), self.pipeline_repo())
    }

    pub fn tasks(&self) -> Tasks {
        TaskService::new(self.task_repo())
    }

    pub fn pipelines(&self) -> Pipelines {
        PipelineService::new(self.pipeline_repo(), self.deal_repo())
    }

    pub fn catalog(&self) -> Catalog {
        CatalogService::new(self.catalog_repo())
    }

    pub fn locations(&self) -> Locations {
        LocationService::new(Arc::new(PgLocationRepository::new(self.pool.clone())))
    }

    pub fn users(&self) -> Users {
        UserService::new(self.user_repo(), self.role_repo(), self.limits.clone())
    }

    pub fn roles(&self) -> Roles {
        RoleService::new(self.role_repo())
    }

    pub fn teams(&self) -> Teams {
        TeamService::new(Arc::new(PgTeamRepository::new(self.pool.clone())), self.user_repo())
    }

    pub fn dashboard(&self) -> Dashboard {
        DashboardService::new(self.lead_repo(), self.deal_repo(), self.task_repo())
    }
}
