// ============================================================================
// CRM Core - Client Entity
// File: crates/crm-core/src/domain/client.rs
// Description: Prospective or paying company (central database)
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

string_enum! {
    /// Client lifecycle status
    pub enum ClientStatus {
        Prospect => "prospect",
        Active => "active",
        Suspended => "suspended",
    }
    default = Prospect
}

/// Client entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    /// Normalized, unique; the tenant database name is derived from it.
    pub subdomain: String,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewClient {
    #[validate(length(min = 2, max = 150, message = "Name must be between 2 and 150 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email"))]
    pub email: String,

    #[validate(length(max = 30, message = "Phone too long"))]
    pub phone: Option<String>,

    #[validate(length(max = 150, message = "Company too long"))]
    pub company: Option<String>,

    pub subdomain: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ClientChanges {
    #[validate(length(min = 2, max = 150, message = "Name must be between 2 and 150 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,

    #[validate(length(max = 30, message = "Phone too long"))]
    pub phone: Option<String>,

    #[validate(length(max = 150, message = "Company too long"))]
    pub company: Option<String>,

    pub subdomain: Option<String>,
    pub status: Option<ClientStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientFilter {
    pub search: Option<String>,
    pub status: Option<ClientStatus>,
}

impl Client {
    pub fn new(input: NewClient) -> Result<Self, DomainError> {
        input.validate()?;
        let subdomain = crm_shared::utils::normalize_subdomain(&input.subdomain)?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            phone: input.phone.map(|p| p.trim().to_string()),
            company: input.company.map(|c| c.trim().to_string()),
            subdomain,
            status: ClientStatus::Prospect,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply changes; a subdomain change is normalized here, uniqueness is the caller's job.
    pub fn apply(&mut self, changes: ClientChanges) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(email) = changes.email {
            self.email = email.trim().to_lowercase();
        }
        if let Some(phone) = changes.phone {
            self.phone = Some(phone.trim().to_string());
        }
        if let Some(company) = changes.company {
            self.company = Some(company.trim().to_string());
        }
        if let Some(subdomain) = changes.subdomain {
            self.subdomain = crm_shared::utils::normalize_subdomain(&subdomain)?;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(subdomain: &str) -> NewClient {
        NewClient {
            name: "Acme Corp".to_string(),
            email: "Sales@Acme.test".to_string(),
            phone: None,
            company: Some("Acme".to_string()),
            subdomain: subdomain.to_string(),
        }
    }

    #[test]
    fn test_new_client_normalizes() {
        let client = Client::new(input("  ACME ")).unwrap();
        assert_eq!(client.subdomain, "acme");
        assert_eq!(client.email, "sales@acme.test");
        assert_eq!(client.status, ClientStatus::Prospect);
    }

    #[test]
    fn test_new_client_rejects_bad_subdomain() {
        assert!(matches!(
            Client::new(input("www")),
            Err(DomainError::ValidationError(_))
        ));
    }

    #[test]
    fn test_new_client_rejects_bad_email() {
        let mut bad = input("acme");
        bad.email = "nope".to_string();
        assert!(Client::new(bad).is_err());
    }
}
