//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use crm_shared::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Hash error: {0}")]
    HashError(String),
    #[error("Password too short")]
    TooShort,
    #[error("Password too long")]
    TooLong,
    #[error("Password too weak")]
    TooWeak,
}

pub struct PasswordService;

impl PasswordService {
    pub fn hash(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    pub fn verify(password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Minimum zxcvbn score accepted for new passwords (0..=4).
const MIN_STRENGTH_SCORE: u8 = 2;

pub struct PasswordPolicy;

impl PasswordPolicy {
    /// `user_inputs` are values the password must not lean on (email, name).
    pub fn check(password: &str, user_inputs: &[&str]) -> Result<(), PasswordError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(PasswordError::TooShort);
        }
        if password.chars().count() > MAX_PASSWORD_LENGTH {
            return Err(PasswordError::TooLong);
        }
        let entropy = zxcvbn::zxcvbn(password, user_inputs);
        if (entropy.score() as u8) < MIN_STRENGTH_SCORE {
            return Err(PasswordError::TooWeak);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = PasswordService::hash("correct horse battery staple").unwrap();
        assert!(PasswordService::verify("correct horse battery staple", &hash).unwrap());
        assert!(!PasswordService::verify("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(PasswordService::verify("secret", "not-a-hash").is_err());
    }

    #[test]
    fn test_policy() {
        assert_eq!(PasswordPolicy::check("short", &[]), Err(PasswordError::TooShort));
        assert_eq!(PasswordPolicy::check("password", &[]), Err(PasswordError::TooWeak));
        assert_eq!(
            PasswordPolicy::check(&"x".repeat(MAX_PASSWORD_LENGTH + 1), &[]),
            Err(PasswordError::TooLong)
        );
        assert!(PasswordPolicy::check("Tr0ub4dor&3-Quantum-Lynx", &[]).is_ok());
    }
}
