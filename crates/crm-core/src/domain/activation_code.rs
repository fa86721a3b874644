//! Activation code entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

string_enum! {
    pub enum ActivationCodeStatus {
        Unused => "unused",
        Used => "used",
        Revoked => "revoked",
    }
    default = Unused
}

/// Prepaid code that grants one period of a tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationCode {
    pub id: Uuid,
    pub code: String,
    pub tier_id: Uuid,
    pub status: ActivationCodeStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub used_by_client_id: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivationCodeFilter {
    pub tier_id: Option<Uuid>,
    pub status: Option<ActivationCodeStatus>,
}

impl ActivationCode {
    pub fn generate(tier_id: Uuid, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: crm_security::codes::generate_activation_code(),
            tier_id,
            status: ActivationCodeStatus::Unused,
            expires_at,
            used_by_client_id: None,
            used_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn ensure_redeemable(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self.status {
            ActivationCodeStatus::Used => Err(DomainError::ActivationCodeAlreadyUsed),
            ActivationCodeStatus::Revoked => Err(DomainError::ActivationCodeRevoked),
            ActivationCodeStatus::Unused if self.expires_at.is_some_and(|at| at <= now) => {
                Err(DomainError::ActivationCodeExpired)
            }
            ActivationCodeStatus::Unused => Ok(()),
        }
    }

    pub fn redeem(&mut self, client_id: Uuid, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_redeemable(now)?;
        self.status = ActivationCodeStatus::Used;
        self.used_by_client_id = Some(client_id);
        self.used_at = Some(now);
        Ok(())
    }

    pub fn revoke(&mut self) -> Result<(), DomainError> {
        if self.status != ActivationCodeStatus::Unused {
            return Err(DomainError::transition(
                "activation code",
                self.status,
                ActivationCodeStatus::Revoked,
            ));
        }
        self.status = ActivationCodeStatus::Revoked;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_redeem_once() {
        let mut code = ActivationCode::generate(Uuid::new_v4(), None);
        let client = Uuid::new_v4();
        code.redeem(client, Utc::now()).unwrap();
        assert_eq!(code.used_by_client_id, Some(client));
        assert!(matches!(
            code.redeem(client, Utc::now()),
            Err(DomainError::ActivationCodeAlreadyUsed)
        ));
    }

    #[test]
    fn test_expired_code() {
        let now = Utc::now();
        let code = ActivationCode::generate(Uuid::new_v4(), Some(now - Duration::minutes(1)));
        assert!(matches!(code.ensure_redeemable(now), Err(DomainError::ActivationCodeExpired)));
    }

    #[test]
    fn test_revoke_only_unused() {
        let mut code = ActivationCode::generate(Uuid::new_v4(), None);
        code.revoke().unwrap();
        assert!(matches!(
            code.ensure_redeemable(Utc::now()),
            Err(DomainError::ActivationCodeRevoked)
        ));
        assert!(code.revoke().is_err());
    }
}
