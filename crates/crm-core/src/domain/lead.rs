// ============================================================================
// CRM Core - Lead Entity
// File: crates/crm-core/src/domain/lead.rs
// Description: Sales lead with industry/service/custom-field pivots
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::CustomFieldValue;
use crate::error::DomainError;

string_enum! {
    pub enum LeadStatus {
        New => "new",
        Contacted => "contacted",
        Qualified => "qualified",
        Unqualified => "unqualified",
        Converted => "converted",
    }
    default = New
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub stage_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub notes: Option<String>,
    pub converted_contact_id: Option<Uuid>,

    // Pivots
    pub industry_ids: Vec<Uuid>,
    pub service_ids: Vec<Uuid>,
    pub custom_fields: Vec<CustomFieldValue>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewLead {
    #[validate(length(min = 2, max = 150, message = "Lead name must be between 2 and 150 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    #[validate(length(max = 30, message = "Phone too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 150, message = "Company too long"))]
    pub company: Option<String>,
    #[validate(length(max = 100, message = "Source too long"))]
    pub source: Option<String>,
    pub status: Option<LeadStatus>,
    pub stage_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    #[validate(length(max = 5000, message = "Notes too long"))]
    pub notes: Option<String>,
    #[serde(default)]
    pub industry_ids: Vec<Uuid>,
    #[serde(default)]
    pub service_ids: Vec<Uuid>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldValue>,
}

/// Partial update; pivot lists replace the current ones when present.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LeadChanges {
    #[validate(length(min = 2, max = 150, message = "Lead name must be between 2 and 150 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    #[validate(length(max = 30, message = "Phone too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 150, message = "Company too long"))]
    pub company: Option<String>,
    #[validate(length(max = 100, message = "Source too long"))]
    pub source: Option<String>,
    pub status: Option<LeadStatus>,
    pub stage_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    #[validate(length(max = 5000, message = "Notes too long"))]
    pub notes: Option<String>,
    pub industry_ids: Option<Vec<Uuid>>,
    pub service_ids: Option<Vec<Uuid>>,
    pub custom_fields: Option<Vec<CustomFieldValue>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub stage_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub industry_id: Option<Uuid>,
    pub search: Option<String>,
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Lead {
    pub fn new(input: NewLead) -> Result<Self, DomainError> {
        input.validate()?;
        if input.status == Some(LeadStatus::Converted) {
            return Err(DomainError::ValidationError(
                "leads are converted through the convert operation".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email: trimmed(input.email).map(|e| e.to_lowercase()),
            phone: trimmed(input.phone),
            company: trimmed(input.company),
            source: trimmed(input.source),
            status: input.status.unwrap_or_default(),
            stage_id: input.stage_id,
            owner_id: input.owner_id,
            location_id: input.location_id,
            notes: trimmed(input.notes),
            converted_contact_id: None,
            industry_ids: dedup(input.industry_ids),
            service_ids: dedup(input.service_ids),
            custom_fields: input.custom_fields,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, changes: LeadChanges) -> Result<(), DomainError> {
        changes.validate()?;
        if let Some(status) = changes.status {
            if status == LeadStatus::Converted || self.status == LeadStatus::Converted {
                if status != self.status {
                    return Err(DomainError::transition("lead", self.status, status));
                }
            }
            self.status = status;
        }
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if changes.email.is_some() {
            self.email = trimmed(changes.email).map(|e| e.to_lowercase());
        }
        if changes.phone.is_some() {
            self.phone = trimmed(changes.phone);
        }
        if changes.company.is_some() {
            self.company = trimmed(changes.company);
        }
        if changes.source.is_some() {
            self.source = trimmed(changes.source);
        }
        if changes.stage_id.is_some() {
            self.stage_id = changes.stage_id;
        }
        if changes.owner_id.is_some() {
            self.owner_id = changes.owner_id;
        }
        if changes.location_id.is_some() {
            self.location_id = changes.location_id;
        }
        if changes.notes.is_some() {
            self.notes = trimmed(changes.notes);
        }
        if let Some(ids) = changes.industry_ids {
            self.industry_ids = dedup(ids);
        }
        if let Some(ids) = changes.service_ids {
            self.service_ids = dedup(ids);
        }
        if let Some(values) = changes.custom_fields {
            self.custom_fields = values;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_converted(&mut self, contact_id: Uuid) -> Result<(), DomainError> {
        if self.status == LeadStatus::Converted {
            return Err(DomainError::LeadAlreadyConverted);
        }
        self.status = LeadStatus::Converted;
        self.converted_contact_id = Some(contact_id);
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_lead() -> Lead {
    Lead::new(NewLead {
        name: "Jane Buyer".to_string(),
        email: Some("Jane@Buyer.test".to_string()),
        phone: None,
        company: Some("Buyer Ltd".to_string()),
        source: Some("web".to_string()),
        status: None,
        stage_id: None,
        owner_id: None,
        location_id: None,
        notes: None,
        industry_ids: vec![],
        service_ids: vec![],
        custom_fields: vec![],
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lead() {
        let lead = sample_lead();
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.email.as_deref(), Some("jane@buyer.test"));
    }

    #[test]
    fn test_pivots_are_deduplicated() {
        let mut lead = sample_lead();
        let id = Uuid::new_v4();
        lead.apply(LeadChanges {
            industry_ids: Some(vec![id, id]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(lead.industry_ids, vec![id]);
    }

    #[test]
    fn test_status_cannot_be_set_to_converted() {
        let mut lead = sample_lead();
        let result = lead.apply(LeadChanges {
            status: Some(LeadStatus::Converted),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_convert_once() {
        let mut lead = sample_lead();
        lead.mark_converted(Uuid::new_v4()).unwrap();
        assert!(matches!(
            lead.mark_converted(Uuid::new_v4()),
            Err(DomainError::LeadAlreadyConverted)
        ));
        assert!(lead
            .apply(LeadChanges {
                status: Some(LeadStatus::New),
                ..Default::default()
            })
            .is_err());
    }
}
