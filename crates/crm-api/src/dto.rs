//! Request payloads and query strings that have no domain counterpart.

use chrono::{DateTime, Utc};
use crm_core::services::TenantAdminInput;
use crm_shared::Pagination;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// `?page=&per_page=` on list endpoints. Values are clamped by the services.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn pagination(self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

/// Login request payload (central and tenant)
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TierListQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateCodesRequest {
    pub tier_id: Uuid,
    pub count: u32,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RedeemCodeRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
    pub client_id: Uuid,
    #[validate(nested)]
    pub admin: Option<TenantAdminInput>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub code: String,
    pub tier_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AutoRenewRequest {
    pub auto_renew: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkPaidRequest {
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DomainRequest {
    pub domain: String,
}

#[derive(Debug, Deserialize)]
pub struct StageMoveRequest {
    pub stage_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ReorderStagesRequest {
    pub stage_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    pub root: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleIdsRequest {
    pub role_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MemberIdsRequest {
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        let pagination = PageQuery::default().pagination().normalized();
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.per_page, crm_shared::constants::DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_login_request_validation() {
        let request = LoginRequest {
            email: "not-an-email".into(),
            password: String::new(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_redeem_request_rejects_non_ascii_admin_email() {
        let request: RedeemCodeRequest = serde_json::from_value(serde_json::json!({
            "code": "ABCD-EFGH-JKLM-NPQR",
            "client_id": Uuid::new_v4(),
            "admin": { "email": "日本語@acme.test", "password": "Sup3r-Secret-Pass!" }
        }))
        .unwrap();
        assert!(request.validate().is_err());

        let request: RedeemCodeRequest = serde_json::from_value(serde_json::json!({
            "code": "ABCD-EFGH-JKLM-NPQR",
            "client_id": Uuid::new_v4()
        }))
        .unwrap();
        assert!(request.validate().is_ok());
    }
}
