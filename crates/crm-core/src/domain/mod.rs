//! # CRM Core - Domain Module
//!
//! Domain entities for the CRM backend.
//!
//! Central (landlord) database: clients, tiers, subscriptions, invoices,
//! tenants and their domains, activation and discount codes, central users.
//! Tenant databases: leads, contacts, deals, tasks, pipelines, catalog,
//! locations, users, roles and teams.

/// Declares a string-backed status enum with `as_str`/`from_str` helpers.
/// Stored as text in the database and serialized in snake_case.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident => $text:literal ),+ $(,)?
        }
        default = $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }

            #[allow(clippy::should_implement_trait)]
            pub fn from_str(s: &str) -> Option<Self> {
                match s {
                    $( $text => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Central
pub mod client;
pub mod tier;
pub mod subscription;
pub mod invoice;
pub mod tenant;
pub mod activation_code;
pub mod discount_code;
pub mod central_user;
pub mod provisioning;

// Tenant
pub mod pipeline;
pub mod catalog;
pub mod lead;
pub mod contact;
pub mod deal;
pub mod task;
pub mod location;
pub mod user;
pub mod role;
pub mod team;
pub mod dashboard;

// Re-export all entities and enums
pub use client::{Client, ClientChanges, ClientFilter, ClientStatus, NewClient};
pub use tier::{NewTier, Tier, TierChanges, TierLimits, TIER_MODULES};
pub use subscription::{PaymentStatus, Subscription, SubscriptionFilter, SubscriptionStatus};
pub use invoice::{Invoice, InvoiceFilter, InvoiceStatus};
pub use tenant::{Tenant, TenantDomain, TenantFilter, TenantStatus};
pub use activation_code::{ActivationCode, ActivationCodeFilter, ActivationCodeStatus};
pub use discount_code::{DiscountCode, DiscountKind, NewDiscountCode, PriceQuote};
pub use central_user::CentralUser;
pub use provisioning::{
    PaymentCallback, PaymentCallbackStatus, PaymentSettlement, ProvisionOutcome,
    ProvisioningRecord, RenewalRecord, TenantAdminSeed, TenantBlueprint,
};
pub use pipeline::{NewStage, Pipeline, Stage, StageChanges};
pub use catalog::{CatalogItem, CatalogKind, CustomField, CustomFieldType, CustomFieldValue};
pub use lead::{Lead, LeadChanges, LeadFilter, LeadStatus, NewLead};
pub use contact::{Contact, ContactChanges, ContactFilter, NewContact};
pub use deal::{Deal, DealChanges, DealFilter, DealStatus, NewDeal};
pub use task::{CalendarWindow, NewTask, Task, TaskChanges, TaskFilter, TaskKind, TaskPriority, TaskStatus};
pub use location::{Location, LocationKind, LocationTree, NewLocation};
pub use user::{NewTenantUser, TenantUser, UserChanges};
pub use role::{effective_permissions, Role, ADMIN_ROLE, PERMISSIONS};
pub use team::Team;
pub use dashboard::DashboardSummary;
