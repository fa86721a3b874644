// ============================================================================
// CRM Core - Tier Entity
// File: crates/crm-core/src/domain/tier.rs
// Description: Purchasable subscription package
// ============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

/// Module keys a tier may unlock.
pub const TIER_MODULES: &[&str] = &[
    "leads", "contacts", "deals", "tasks", "calendar", "teams", "reports",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub duration_days: i32,
    pub modules: Vec<String>,
    pub max_users: i32,
    pub max_leads: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quotas a tenant inherits from its tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub max_users: i32,
    pub max_leads: Option<i32>,
    pub modules: Vec<String>,
}

impl TierLimits {
    pub fn ensure_capacity(&self, resource: &str, current: i64) -> Result<(), DomainError> {
        let limit = match resource {
            "users" => Some(self.max_users),
            "leads" => self.max_leads,
            _ => None,
        };
        match limit {
            Some(max) if current >= max as i64 => Err(DomainError::TierLimitReached(format!(
                "{} limit of {} reached",
                resource, max
            ))),
            _ => Ok(()),
        }
    }

    /// Routes of a module the tier does not include are refused.
    pub fn ensure_module(&self, module: &str) -> Result<(), DomainError> {
        if self.modules.iter().any(|m| m == module) {
            Ok(())
        } else {
            Err(DomainError::PermissionDenied(format!("module '{}' is not part of the subscription", module)))
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTier {
    #[validate(length(min = 2, max = 100, message = "Tier name must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: i64,

    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    #[validate(range(min = 1, max = 3660, message = "Duration must be between 1 and 3660 days"))]
    pub duration_days: i32,

    #[validate(length(min = 1, message = "At least one module is required"))]
    pub modules: Vec<String>,

    #[validate(range(min = 1, max = 100000, message = "Max users must be at least 1"))]
    pub max_users: i32,

    #[validate(range(min = 1, message = "Max leads must be at least 1"))]
    pub max_leads: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TierChanges {
    #[validate(length(min = 2, max = 100, message = "Tier name must be between 2 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: Option<i64>,

    #[validate(range(min = 1, max = 3660, message = "Duration must be between 1 and 3660 days"))]
    pub duration_days: Option<i32>,

    #[validate(length(min = 1, message = "At least one module is required"))]
    pub modules: Option<Vec<String>>,

    #[validate(range(min = 1, max = 100000, message = "Max users must be at least 1"))]
    pub max_users: Option<i32>,

    #[validate(range(min = 1, message = "Max leads must be at least 1"))]
    pub max_leads: Option<i32>,

    pub is_active: Option<bool>,
}

fn normalize_modules(modules: Vec<String>) -> Result<Vec<String>, DomainError> {
    let mut normalized: Vec<String> = Vec::with_capacity(modules.len());
    for module in modules {
        let module = module.trim().to_lowercase();
        if !TIER_MODULES.contains(&module.as_str()) {
            return Err(DomainError::ValidationError(format!("unknown module '{}'", module)));
        }
        if !normalized.contains(&module) {
            normalized.push(module);
        }
    }
    Ok(normalized)
}

impl Tier {
    pub fn new(input: NewTier) -> Result<Self, DomainError> {
        input.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            description: input.description.map(|d| d.trim().to_string()),
            price_cents: input.price_cents,
            currency: input
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| crm_shared::constants::DEFAULT_CURRENCY.to_string()),
            duration_days: input.duration_days,
            modules: normalize_modules(input.modules)?,
            max_users: input.max_users,
            max_leads: input.max_leads,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, changes: TierChanges) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            self.description = Some(description.trim().to_string());
        }
        if let Some(price) = changes.price_cents {
            self.price_cents = price;
        }
        if let Some(days) = changes.duration_days {
            self.duration_days = days;
        }
        if let Some(modules) = changes.modules {
            self.modules = normalize_modules(modules)?;
        }
        if let Some(max_users) = changes.max_users {
            self.max_users = max_users;
        }
        if changes.max_leads.is_some() {
            self.max_leads = changes.max_leads;
        }
        if let Some(active) = changes.is_active {
            self.is_active = active;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn limits(&self) -> TierLimits {
        TierLimits {
            max_users: self.max_users,
            max_leads: self.max_leads,
            modules: self.modules.clone(),
        }
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }

    pub fn period_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + Duration::days(self.duration_days as i64)
    }

    pub fn ensure_purchasable(&self) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::ValidationError(format!(
                "tier '{}' is not available",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_tier(price_cents: i64) -> Tier {
    Tier::new(NewTier {
        name: "Growth".to_string(),
        description: None,
        price_cents,
        currency: None,
        duration_days: 30,
        modules: vec!["leads".to_string(), "contacts".to_string()],
        max_users: 5,
        max_leads: Some(100),
    })
    .unwrap()
}
