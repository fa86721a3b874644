//! PostgreSQL repository implementations
//!
//! Central adapters hold the landlord pool. Tenant adapters hold the pool of a
//! single tenant database and are built per request.

// Central
pub mod client_repo_impl;
pub mod tier_repo_impl;
pub mod billing_repo_impl;
pub mod tenant_repo_impl;
pub mod code_repo_impl;
pub mod central_user_repo_impl;
pub mod provisioning_store_impl;

// Tenant
pub mod lead_repo_impl;
pub mod contact_repo_impl;
pub mod deal_repo_impl;
pub mod task_repo_impl;
pub mod pipeline_repo_impl;
pub mod catalog_repo_impl;
pub mod location_repo_impl;
pub mod user_repo_impl;
pub mod role_repo_impl;
pub mod team_repo_impl;

pub use client_repo_impl::PgClientRepository;
pub use tier_repo_impl::PgTierRepository;
pub use billing_repo_impl::{PgInvoiceRepository, PgSubscriptionRepository};
pub use tenant_repo_impl::PgTenantRepository;
pub use code_repo_impl::{PgActivationCodeRepository, PgDiscountCodeRepository};
pub use central_user_repo_impl::PgCentralUserRepository;
pub use provisioning_store_impl::PgProvisioningStore;

pub use lead_repo_impl::PgLeadRepository;
pub use contact_repo_impl::PgContactRepository;
pub use deal_repo_impl::PgDealRepository;
pub use task_repo_impl::PgTaskRepository;
pub use pipeline_repo_impl::PgPipelineRepository;
pub use catalog_repo_impl::PgCatalogRepository;
pub use location_repo_impl::PgLocationRepository;
pub use user_repo_impl::PgUserRepository;
pub use role_repo_impl::PgRoleRepository;
pub use team_repo_impl::PgTeamRepository;

use crm_core::error::DomainError;
use tracing::error;

/// Logs and wraps a driver error.
pub(crate) fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    error!("Database error {}: {}", context, e);
    DomainError::DatabaseError(e.to_string())
}

/// Name of the violated unique constraint, if `e` is a unique violation.
pub(crate) fn unique_violation(e: &sqlx::Error) -> Option<String> {
    e.as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.constraint().unwrap_or_default().to_string())
}

/// Maps a unique violation through `on_conflict`, anything else through [`db_error`].
pub(crate) fn conflict_or<F>(context: &str, e: sqlx::Error, on_conflict: F) -> DomainError
where
    F: FnOnce(&str) -> DomainError,
{
    match unique_violation(&e) {
        Some(constraint) => {
            tracing::warn!("Unique violation {} ({})", context, constraint);
            on_conflict(&constraint)
        }
        None => db_error(context, e),
    }
}

/// `ILIKE` pattern for a free-text search, `None` when the search is blank.
pub(crate) fn search_pattern(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        assert_eq!(search_pattern(&Some(" 50%_off ".into())), Some("%50\\%\\_off%".into()));
        assert_eq!(search_pattern(&Some("   ".into())), None);
        assert_eq!(search_pattern(&None), None);
    }
}
