//! Catalog entities: industries, services and custom field definitions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

string_enum! {
    /// Simple named lookups a lead can be tagged with.
    pub enum CatalogKind {
        Industry => "industry",
        Service => "service",
    }
    default = Industry
}

impl CatalogKind {
    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::Industry => "industry",
            CatalogKind::Service => "service",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub kind: CatalogKind,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CatalogItem {
    pub fn new(kind: CatalogKind, name: &str, description: Option<String>) -> Result<Self, DomainError> {
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            name: validate_name(name)?,
            description: description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            created_at: Utc::now(),
        })
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() || name.len() > 100 {
        return Err(DomainError::ValidationError(
            "name must be between 1 and 100 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

string_enum! {
    pub enum CustomFieldType {
        Text => "text",
        Number => "number",
        Date => "date",
        Boolean => "boolean",
        Select => "select",
    }
    default = Text
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: Uuid,
    pub name: String,
    pub field_type: CustomFieldType,
    /// Allowed values for `select` fields; empty otherwise.
    pub options: Vec<String>,
    pub is_required: bool,
    pub created_at: DateTime<Utc>,
}

/// Value of one custom field on a lead, stored as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub custom_field_id: Uuid,
    pub value: String,
}

impl CustomField {
    pub fn new(
        name: &str,
        field_type: CustomFieldType,
        options: Vec<String>,
        is_required: bool,
    ) -> Result<Self, DomainError> {
        let field = Self {
            id: Uuid::new_v4(),
            name: validate_name(name)?,
            field_type,
            options: normalize_options(options),
            is_required,
            created_at: Utc::now(),
        };
        field.check_definition()?;
        Ok(field)
    }

    pub fn update(
        &mut self,
        name: Option<&str>,
        options: Option<Vec<String>>,
        is_required: Option<bool>,
    ) -> Result<(), DomainError> {
        if let Some(name) = name {
            self.name = validate_name(name)?;
        }
        if let Some(options) = options {
            self.options = normalize_options(options);
        }
        if let Some(required) = is_required {
            self.is_required = required;
        }
        self.check_definition()
    }

    fn check_definition(&self) -> Result<(), DomainError> {
        match self.field_type {
            CustomFieldType::Select if self.options.is_empty() => Err(DomainError::ValidationError(
                "select fields need at least one option".to_string(),
            )),
            CustomFieldType::Select => Ok(()),
            _ if !self.options.is_empty() => Err(DomainError::ValidationError(
                "only select fields take options".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Type-check a value and return its canonical text form.
    pub fn coerce(&self, raw: &str) -> Result<String, DomainError> {
        let value = raw.trim();
        let invalid = || {
            DomainError::ValidationError(format!(
                "invalid value '{}' for {} field '{}'",
                value, self.field_type, self.name
            ))
        };
        match self.field_type {
            CustomFieldType::Text => Ok(value.to_string()),
            CustomFieldType::Number => value
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|_| value.to_string())
                .ok_or_else(invalid),
            CustomFieldType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.format("%Y-%m-%d").to_string())
                .map_err(|_| invalid()),
            CustomFieldType::Boolean => match value.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok("true".to_string()),
                "false" | "0" | "no" => Ok("false".to_string()),
                _ => Err(invalid()),
            },
            CustomFieldType::Select => self
                .options
                .iter()
                .find(|o| o.as_str() == value)
                .cloned()
                .ok_or_else(invalid),
        }
    }
}

fn normalize_options(options: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(options.len());
    for option in options {
        let option = option.trim().to_string();
        if !option.is_empty() && !out.contains(&option) {
            out.push(option);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_requires_options() {
        assert!(CustomField::new("Size", CustomFieldType::Select, vec![], false).is_err());
        assert!(CustomField::new("Notes", CustomFieldType::Text, vec!["a".into()], false).is_err());
    }

    #[test]
    fn test_coerce_values() {
        let number = CustomField::new("Budget", CustomFieldType::Number, vec![], false).unwrap();
        assert_eq!(number.coerce(" 12.5 ").unwrap(), "12.5");
        assert!(number.coerce("lots").is_err());

        let flag = CustomField::new("VIP", CustomFieldType::Boolean, vec![], false).unwrap();
        assert_eq!(flag.coerce("Yes").unwrap(), "true");
        assert!(flag.coerce("maybe").is_err());

        let date = CustomField::new("Renewal", CustomFieldType::Date, vec![], false).unwrap();
        assert_eq!(date.coerce("2026-02-01").unwrap(), "2026-02-01");
        assert!(date.coerce("01/02/2026").is_err());

        let select = CustomField::new(
            "Size",
            CustomFieldType::Select,
            vec!["S".into(), "M".into(), "M".into(), " ".into()],
            true,
        )
        .unwrap();
        assert_eq!(select.options, vec!["S".to_string(), "M".to_string()]);
        assert_eq!(select.coerce("M").unwrap(), "M");
        assert!(select.coerce("XL").is_err());
    }
}
