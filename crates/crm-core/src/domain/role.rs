//! Tenant roles and permission keys

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Every permission key a role may carry.
pub const PERMISSIONS: &[&str] = &[
    "leads.view",
    "leads.create",
    "leads.update",
    "leads.delete",
    "contacts.view",
    "contacts.create",
    "contacts.update",
    "contacts.delete",
    "deals.view",
    "deals.create",
    "deals.update",
    "deals.delete",
    "tasks.view",
    "tasks.create",
    "tasks.update",
    "tasks.delete",
    "pipelines.manage",
    "catalog.manage",
    "locations.manage",
    "users.manage",
    "teams.manage",
];

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_role_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim().to_lowercase();
    if name.len() < 2 || name.len() > 50 {
        return Err(DomainError::ValidationError(
            "Role name must be between 2 and 50 characters".to_string(),
        ));
    }
    Ok(name)
}

/// Rejects unknown keys; returns the keys sorted and deduplicated.
pub fn validate_permissions(permissions: Vec<String>) -> Result<Vec<String>, DomainError> {
    let mut out: Vec<String> = Vec::with_capacity(permissions.len());
    for key in permissions {
        let key = key.trim().to_string();
        if !PERMISSIONS.contains(&key.as_str()) {
            return Err(DomainError::ValidationError(format!("unknown permission: {}", key)));
        }
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out.sort();
    Ok(out)
}

impl Role {
    pub fn new(name: &str, permissions: Vec<String>) -> Result<Self, DomainError> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: validate_role_name(name)?,
            permissions: validate_permissions(permissions)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(&mut self, name: Option<&str>, permissions: Option<Vec<String>>) -> Result<(), DomainError> {
        if let Some(name) = name {
            let name = validate_role_name(name)?;
            if self.is_admin() && name != ADMIN_ROLE {
                return Err(DomainError::ValidationError("the admin role cannot be renamed".to_string()));
            }
            self.name = name;
        }
        if let Some(permissions) = permissions {
            if self.is_admin() {
                return Err(DomainError::ValidationError(
                    "the admin role always holds every permission".to_string(),
                ));
            }
            self.permissions = validate_permissions(permissions)?;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_admin(&self) -> bool {
        self.name == ADMIN_ROLE
    }

    /// Roles seeded into every tenant database.
    pub fn defaults() -> Vec<Role> {
        let all: Vec<String> = PERMISSIONS.iter().map(|p| p.to_string()).collect();
        let sales: Vec<String> = PERMISSIONS
            .iter()
            .filter(|p| {
                let resource = p.split('.').next().unwrap_or_default();
                matches!(resource, "leads" | "contacts" | "deals" | "tasks") && !p.ends_with(".delete")
            })
            .map(|p| p.to_string())
            .collect();
        let viewer: Vec<String> = PERMISSIONS
            .iter()
            .filter(|p| p.ends_with(".view"))
            .map(|p| p.to_string())
            .collect();

        [(ADMIN_ROLE, all), ("sales", sales), ("viewer", viewer)]
            .into_iter()
            .filter_map(|(name, permissions)| Role::new(name, permissions).ok())
            .collect()
    }
}

/// Union of the permissions of `roles`, sorted.
pub fn effective_permissions(roles: &[Role]) -> Vec<String> {
    let mut out: Vec<String> = roles.iter().flat_map(|r| r.permissions.iter().cloned()).collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles() {
        let roles = Role::defaults();
        assert_eq!(roles.len(), 3);
        let admin = roles.iter().find(|r| r.is_admin()).unwrap();
        assert_eq!(admin.permissions.len(), PERMISSIONS.len());

        let sales = roles.iter().find(|r| r.name == "sales").unwrap();
        assert!(sales.permissions.contains(&"leads.create".to_string()));
        assert!(!sales.permissions.contains(&"leads.delete".to_string()));
        assert!(!sales.permissions.contains(&"users.manage".to_string()));
    }

    #[test]
    fn test_unknown_permission_rejected() {
        assert!(Role::new("support", vec!["leads.fly".to_string()]).is_err());
    }

    #[test]
    fn test_admin_role_is_fixed() {
        let mut admin = Role::defaults().into_iter().find(|r| r.is_admin()).unwrap();
        assert!(admin.update(Some("boss"), None).is_err());
        assert!(admin.update(None, Some(vec![])).is_err());
    }

    #[test]
    fn test_effective_permissions_union() {
        let a = Role::new("closers", vec!["leads.view".into(), "deals.view".into()]).unwrap();
        let b = Role::new("support", vec!["leads.view".into(), "tasks.view".into()]).unwrap();
        assert_eq!(
            effective_permissions(&[a, b]),
            vec!["deals.view".to_string(), "leads.view".to_string(), "tasks.view".to_string()]
        );
    }
}
