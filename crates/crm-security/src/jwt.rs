//! JWT token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token creation failed: {0}")]
    CreationError(String),
    #[error("Token validation failed: {0}")]
    ValidationError(String),
    #[error("Token expired")]
    TokenExpired,
}

/// Which side of the system a token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    Central,
    Tenant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub scope: TokenScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

pub struct JwtService {
    secret: String,
    access_token_expiry: i64,
}

impl JwtService {
    pub fn new(secret: String, access_expiry: i64) -> Self {
        Self {
            secret,
            access_token_expiry: access_expiry,
        }
    }

    pub fn expiry_seconds(&self) -> i64 {
        self.access_token_expiry
    }

    pub fn generate_central_token(&self, user_id: &Uuid) -> Result<String, JwtError> {
        self.generate_token(user_id, TokenScope::Central, None, Vec::new())
    }

    pub fn generate_tenant_token(
        &self,
        user_id: &Uuid,
        tenant_id: &Uuid,
        permissions: Vec<String>,
    ) -> Result<String, JwtError> {
        self.generate_token(user_id, TokenScope::Tenant, Some(*tenant_id), permissions)
    }

    fn generate_token(
        &self,
        user_id: &Uuid,
        scope: TokenScope,
        tenant_id: Option<Uuid>,
        permissions: Vec<String>,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            scope,
            tenant_id,
            permissions,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| JwtError::CreationError(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::ValidationError(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_token_round_trip() {
        let service = JwtService::new("test-secret".to_string(), 3600);
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let token = service
            .generate_tenant_token(&user_id, &tenant_id, vec!["leads.view".to_string()])
            .unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.scope, TokenScope::Tenant);
        assert_eq!(claims.tenant_id, Some(tenant_id));
        assert_eq!(claims.user_id(), Some(user_id));
        assert!(claims.has_permission("leads.view"));
        assert!(!claims.has_permission("leads.delete"));
    }

    #[test]
    fn test_rejects_foreign_secret() {
        let issuer = JwtService::new("secret-a".to_string(), 3600);
        let verifier = JwtService::new("secret-b".to_string(), 3600);
        let token = issuer.generate_central_token(&Uuid::new_v4()).unwrap();
        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::new("test-secret".to_string(), -3600);
        let token = service.generate_central_token(&Uuid::new_v4()).unwrap();
        assert!(matches!(service.validate_token(&token), Err(JwtError::TokenExpired)));
    }
}
