//! Utility functions

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::constants::{
    MAX_DATABASE_NAME_LENGTH, MAX_SUBDOMAIN_LENGTH, MIN_SUBDOMAIN_LENGTH, RESERVED_SUBDOMAINS,
};
use crate::error::AppError;

static SUBDOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").expect("valid subdomain regex"));

pub fn is_valid_uuid(s: &str) -> bool {
    Uuid::parse_str(s).is_ok()
}

/// Lower-case and validate a client subdomain.
pub fn normalize_subdomain(raw: &str) -> Result<String, AppError> {
    let subdomain = raw.trim().to_lowercase();

    if subdomain.len() < MIN_SUBDOMAIN_LENGTH || subdomain.len() > MAX_SUBDOMAIN_LENGTH {
        return Err(AppError::InvalidSubdomain(format!(
            "must be between {} and {} characters",
            MIN_SUBDOMAIN_LENGTH, MAX_SUBDOMAIN_LENGTH
        )));
    }
    if !SUBDOMAIN_RE.is_match(&subdomain) {
        return Err(AppError::InvalidSubdomain(
            "only letters, digits and inner hyphens are allowed".to_string(),
        ));
    }
    if RESERVED_SUBDOMAINS.contains(&subdomain.as_str()) {
        return Err(AppError::InvalidSubdomain(format!("'{}' is reserved", subdomain)));
    }

    Ok(subdomain)
}

/// Tenant database name for a normalized subdomain.
pub fn tenant_database_name(prefix: &str, subdomain: &str) -> String {
    format!("{}{}", prefix, subdomain.replace('-', "_"))
}

/// Reject a subdomain whose tenant database name would exceed the identifier limit.
pub fn ensure_database_name_fits(prefix: &str, subdomain: &str) -> Result<(), AppError> {
    let max = MAX_DATABASE_NAME_LENGTH.saturating_sub(prefix.len());
    if tenant_database_name(prefix, subdomain).len() > MAX_DATABASE_NAME_LENGTH {
        return Err(AppError::InvalidSubdomain(format!("must be at most {} characters", max)));
    }
    Ok(())
}

/// Primary host of a tenant.
pub fn tenant_host(subdomain: &str, central_domain: &str) -> String {
    format!("{}.{}", subdomain, central_domain)
}

/// Strip an optional port and lower-case a `Host` header value.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    without_port.trim_end_matches('.').to_lowercase()
}

pub fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let (local, domain) = email.split_at(at_pos);
        let keep = if local.chars().count() <= 2 { 1 } else { 2 };
        let visible: String = local.chars().take(keep).collect();
        format!("{}***{}", visible, domain)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_subdomain() {
        assert_eq!(normalize_subdomain("  Acme-Corp ").unwrap(), "acme-corp");
        assert!(normalize_subdomain("ab").is_err());
        assert!(normalize_subdomain("-acme").is_err());
        assert!(normalize_subdomain("acme-").is_err());
        assert!(normalize_subdomain("ac_me").is_err());
        assert!(normalize_subdomain("admin").is_err());
    }

    #[test]
    fn test_tenant_database_name_is_deterministic() {
        assert_eq!(tenant_database_name("tenant_", "acme-corp"), "tenant_acme_corp");
        assert_eq!(
            tenant_database_name("tenant_", "acme-corp"),
            tenant_database_name("tenant_", "acme-corp")
        );
    }

    #[test]
    fn test_database_name_length_limit() {
        let longest = "a".repeat(63 - "tenant_".len());
        assert!(ensure_database_name_fits("tenant_", &longest).is_ok());

        let too_long = "a".repeat(60);
        assert!(normalize_subdomain(&too_long).is_ok());
        let err = ensure_database_name_fits("tenant_", &too_long).unwrap_err();
        assert!(err.to_string().contains("at most 56"));
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Acme.CRM.test:8080"), "acme.crm.test");
        assert_eq!(normalize_host("acme.crm.test."), "acme.crm.test");
        assert_eq!(tenant_host("acme", "crm.test"), "acme.crm.test");
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("john@example.com"), "jo***@example.com");
        assert_eq!(mask_email("a@example.com"), "a***@example.com");
        assert_eq!(mask_email("invalid"), "***");
        assert_eq!(mask_email("日本語@acme.test"), "日本***@acme.test");
        assert_eq!(mask_email("é@acme.test"), "é***@acme.test");
        assert_eq!(mask_email("@acme.test"), "***@acme.test");
    }
}
