// ============================================================================
// CRM Core - Tenant User Entity
// File: crates/crm-core/src/domain/user.rs
// Description: Users stored in a tenant database
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub role_ids: Vec<Uuid>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTenantUser {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserChanges {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl TenantUser {
    pub fn new(name: &str, email: &str, password_hash: String, role_ids: Vec<Uuid>) -> Self {
        let now = Utc::now();
        let mut unique: Vec<Uuid> = Vec::with_capacity(role_ids.len());
        for id in role_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
            is_active: true,
            role_ids: unique,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies profile fields. Passwords are hashed by the caller and passed separately.
    pub fn apply(&mut self, changes: &UserChanges, password_hash: Option<String>) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(name) = &changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(email) = &changes.email {
            self.email = email.trim().to_lowercase();
        }
        if let Some(active) = changes.is_active {
            self.is_active = active;
        }
        if let Some(hash) = password_hash {
            self.password_hash = hash;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::UserNotActive);
        }
        Ok(())
    }
}
