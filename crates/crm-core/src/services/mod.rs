//! Domain services (business logic)

// Central
pub mod auth_service;
pub mod client_service;
pub mod tier_service;
pub mod provisioning_service;
pub mod code_service;
pub mod subscription_service;
pub mod billing_service;
pub mod tenant_service;

// Tenant
pub mod lead_service;
pub mod contact_service;
pub mod deal_service;
pub mod task_service;
pub mod pipeline_service;
pub mod catalog_service;
pub mod location_service;
pub mod user_service;
pub mod role_service;
pub mod team_service;
pub mod dashboard_service;

pub use auth_service::{CentralAuthService, LoginResult, TenantAuthService, UserInfo};
pub use client_service::ClientService;
pub use tier_service::TierService;
pub use provisioning_service::{ProvisionRequest, ProvisioningService, RedemptionOutcome, TenantAdminInput};
pub use code_service::{ActivationCodeService, DiscountCodeService};
pub use subscription_service::{Renewal, SubscriptionService, SweepReport};
pub use billing_service::{BillingService, CallbackOutcome};
pub use tenant_service::{TenantDetails, TenantService};

pub use lead_service::{Conversion, ConvertLead, LeadService};
pub use contact_service::ContactService;
pub use deal_service::DealService;
pub use task_service::TaskService;
pub use pipeline_service::{NewPipeline, PipelineChanges, PipelineService};
pub use catalog_service::{CatalogItemInput, CatalogService, CustomFieldChanges, NewCustomField};
pub use location_service::LocationService;
pub use user_service::UserService;
pub use role_service::{NewRole, RoleChanges, RoleService};
pub use team_service::{NewTeam, TeamChanges, TeamService};
pub use dashboard_service::DashboardService;
