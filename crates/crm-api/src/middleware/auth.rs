// ============================================================================
// CRM API - Authentication Extractors
// File: crates/crm-api/src/middleware/auth.rs
// ============================================================================
//! Bearer token authentication for the central and tenant APIs.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use crm_core::error::DomainError;
use crm_security::{Claims, JwtService, TokenScope};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::tenant::TenantContext;
use crate::state::AppState;

/// Validates the `Authorization: Bearer` header and returns its claims.
pub(crate) fn bearer_claims(headers: &HeaderMap, jwt: &JwtService) -> Result<Claims, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Malformed authorization header"))?;
    jwt.validate_token(token).map_err(|e| ApiError::unauthorized(e.to_string()))
}

fn subject(claims: &Claims) -> Result<Uuid, ApiError> {
    claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Token subject is not a user id"))
}

/// Landlord administrator holding a `scope=central` token.
#[derive(Debug, Clone)]
pub struct CentralAdmin {
    pub user_id: Uuid,
    pub claims: Claims,
}

impl FromRequestParts<AppState> for CentralAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(&parts.headers, &state.jwt)?;
        if claims.scope != TokenScope::Central {
            return Err(ApiError::unauthorized("Token is not valid for the central API"));
        }
        let user_id = subject(&claims)?;
        state.central_auth().ensure_active(&user_id).await?;
        Ok(Self { user_id, claims })
    }
}

/// Tenant user holding a `scope=tenant` token issued by the resolved tenant.
/// `claims.permissions` is refreshed from the user's current roles.
#[derive(Debug, Clone)]
pub struct TenantAuth {
    pub user_id: Uuid,
    pub claims: Claims,
}

impl TenantAuth {
    /// Fails with 403 unless the token carries `permission`.
    pub fn require(&self, permission: &str) -> Result<(), ApiError> {
        if self.claims.has_permission(permission) {
            Ok(())
        } else {
            Err(DomainError::PermissionDenied(permission.to_string()).into())
        }
    }
}

impl FromRequestParts<AppState> for TenantAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = TenantContext::from_request_parts(parts, state).await?;
        let claims = bearer_claims(&parts.headers, &state.jwt)?;
        if claims.scope != TokenScope::Tenant || claims.tenant_id != Some(ctx.tenant.id) {
            warn!("Token for another tenant presented to tenant {}", ctx.tenant.id);
            return Err(ApiError::unauthorized("Token is not valid for this tenant"));
        }
        let user_id = subject(&claims)?;
        let mut claims = claims;
        claims.permissions = ctx.auth(state.jwt.clone()).current_permissions(&user_id).await?;
        Ok(Self { user_id, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn jwt() -> JwtService {
        JwtService::new("test-secret-that-is-long-enough".into(), 3600)
    }

    #[test]
    fn test_bearer_claims() {
        let jwt = jwt();
        let user = Uuid::new_v4();
        let token = jwt.generate_central_token(&user).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());

        let claims = bearer_claims(&headers, &jwt).unwrap();
        assert_eq!(claims.user_id(), Some(user));
        assert_eq!(claims.scope, TokenScope::Central);
    }

    #[test]
    fn test_missing_or_malformed_header() {
        let jwt = jwt();
        assert!(matches!(bearer_claims(&HeaderMap::new(), &jwt), Err(ApiError::Unauthorized(_))));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_claims(&headers, &jwt), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_require_permission() {
        let jwt = jwt();
        let user = Uuid::new_v4();
        let token = jwt
            .generate_tenant_token(&user, &Uuid::new_v4(), vec!["leads.view".into()])
            .unwrap();
        let auth = TenantAuth {
            user_id: user,
            claims: jwt.validate_token(&token).unwrap(),
        };
        assert!(auth.require("leads.view").is_ok());
        let err = auth.require("leads.delete").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
