//! Contact entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::Lead;
use crate::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub lead_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewContact {
    #[validate(length(min = 1, max = 100, message = "First name must be between 1 and 100 characters"))]
    pub first_name: String,
    #[validate(length(max = 100, message = "Last name too long"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    #[validate(length(max = 30, message = "Phone too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 150, message = "Company too long"))]
    pub company: Option<String>,
    #[validate(length(max = 100, message = "Position too long"))]
    pub position: Option<String>,
    pub location_id: Option<Uuid>,
    #[validate(length(max = 5000, message = "Notes too long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ContactChanges {
    #[validate(length(min = 1, max = 100, message = "First name must be between 1 and 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "Last name too long"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    #[validate(length(max = 30, message = "Phone too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 150, message = "Company too long"))]
    pub company: Option<String>,
    #[validate(length(max = 100, message = "Position too long"))]
    pub position: Option<String>,
    pub location_id: Option<Uuid>,
    #[validate(length(max = 5000, message = "Notes too long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactFilter {
    pub search: Option<String>,
    pub lead_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Contact {
    pub fn new(input: NewContact) -> Result<Self, DomainError> {
        input.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            first_name: input.first_name.trim().to_string(),
            last_name: clean(input.last_name),
            email: clean(input.email).map(|e| e.to_lowercase()),
            phone: clean(input.phone),
            company: clean(input.company),
            position: clean(input.position),
            lead_id: None,
            location_id: input.location_id,
            notes: clean(input.notes),
            created_at: now,
            updated_at: now,
        })
    }

    /// Contact created when a lead is converted. The lead's name is split on
    /// the first whitespace into first and last name.
    pub fn from_lead(lead: &Lead) -> Self {
        let now = Utc::now();
        let mut parts = lead.name.trim().splitn(2, char::is_whitespace);
        let first_name = parts.next().unwrap_or_default().to_string();
        let last_name = clean(parts.next().map(str::to_string));
        Self {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            company: lead.company.clone(),
            position: None,
            lead_id: Some(lead.id),
            location_id: lead.location_id,
            notes: lead.notes.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }

    pub fn apply(&mut self, changes: ContactChanges) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(first_name) = changes.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if changes.last_name.is_some() {
            self.last_name = clean(changes.last_name);
        }
        if changes.email.is_some() {
            self.email = clean(changes.email).map(|e| e.to_lowercase());
        }
        if changes.phone.is_some() {
            self.phone = clean(changes.phone);
        }
        if changes.company.is_some() {
            self.company = clean(changes.company);
        }
        if changes.position.is_some() {
            self.position = clean(changes.position);
        }
        if changes.location_id.is_some() {
            self.location_id = changes.location_id;
        }
        if changes.notes.is_some() {
            self.notes = clean(changes.notes);
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lead::sample_lead;

    #[test]
    fn test_from_lead_splits_name() {
        let lead = sample_lead();
        let contact = Contact::from_lead(&lead);
        assert_eq!(contact.first_name, "Jane");
        assert_eq!(contact.last_name.as_deref(), Some("Buyer"));
        assert_eq!(contact.lead_id, Some(lead.id));
        assert_eq!(contact.full_name(), "Jane Buyer");
    }

    #[test]
    fn test_blank_optional_fields_are_cleared() {
        let mut contact = Contact::new(NewContact {
            first_name: "Omar".to_string(),
            last_name: None,
            email: None,
            phone: Some("  ".to_string()),
            company: None,
            position: None,
            location_id: None,
            notes: None,
        })
        .unwrap();
        assert!(contact.phone.is_none());

        contact
            .apply(ContactChanges {
                company: Some("Acme".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(contact.company.as_deref(), Some("Acme"));
    }
}
