//! Domain errors

use thiserror::Error;
use uuid::Uuid;

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Unauthorized,
    Forbidden,
    PaymentRequired,
    Infrastructure,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Subdomain already exists: {0}")]
    SubdomainAlreadyExists(String),

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("{entity} name already exists: {name}")]
    NameAlreadyExists { entity: &'static str, name: String },

    #[error("Code already exists: {0}")]
    CodeAlreadyExists(String),

    #[error("Domain already registered: {0}")]
    DomainAlreadyExists(String),

    #[error("Client {0} already has a tenant")]
    TenantAlreadyExists(Uuid),

    #[error("Client {0} still has a tenant")]
    ClientHasTenant(Uuid),

    #[error("Activation code already used")]
    ActivationCodeAlreadyUsed,

    #[error("Activation code revoked")]
    ActivationCodeRevoked,

    #[error("Activation code expired")]
    ActivationCodeExpired,

    #[error("Discount code not applicable: {0}")]
    DiscountNotApplicable(String),

    #[error("Invalid state transition for {entity}: {from} -> {to}")]
    InvalidTransition { entity: &'static str, from: String, to: String },

    #[error("Lead already converted")]
    LeadAlreadyConverted,

    #[error("{entity} is still in use")]
    InUse { entity: &'static str },

    #[error("Tier limit reached: {0}")]
    TierLimitReached(String),

    #[error("Tenant not active")]
    TenantNotActive,

    #[error("Tenant awaiting payment")]
    TenantAwaitingPayment,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not active")]
    UserNotActive,

    #[error("Missing permission: {0}")]
    PermissionDenied(String),

    #[error("Password too short")]
    PasswordTooShort,

    #[error("Password too long")]
    PasswordTooLong,

    #[error("Password too weak")]
    PasswordTooWeak,

    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Provisioning failed: {0}")]
    ProvisioningFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound { entity, id: id.to_string() }
    }

    pub fn transition(entity: &'static str, from: impl ToString, to: impl ToString) -> Self {
        DomainError::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::SubdomainAlreadyExists(_)
            | DomainError::EmailAlreadyExists(_)
            | DomainError::NameAlreadyExists { .. }
            | DomainError::CodeAlreadyExists(_)
            | DomainError::DomainAlreadyExists(_)
            | DomainError::TenantAlreadyExists(_)
            | DomainError::ClientHasTenant(_)
            | DomainError::ActivationCodeAlreadyUsed
            | DomainError::InvalidTransition { .. }
            | DomainError::LeadAlreadyConverted
            | DomainError::InUse { .. } => ErrorKind::Conflict,
            DomainError::ActivationCodeRevoked
            | DomainError::ActivationCodeExpired
            | DomainError::DiscountNotApplicable(_)
            | DomainError::TierLimitReached(_)
            | DomainError::PasswordTooShort
            | DomainError::PasswordTooLong
            | DomainError::PasswordTooWeak
            | DomainError::ValidationError(_) => ErrorKind::Validation,
            DomainError::InvalidCredentials | DomainError::UserNotActive => ErrorKind::Unauthorized,
            DomainError::PermissionDenied(_) | DomainError::TenantNotActive => ErrorKind::Forbidden,
            DomainError::TenantAwaitingPayment => ErrorKind::PaymentRequired,
            DomainError::PasswordHashError(_)
            | DomainError::TokenGenerationError(_)
            | DomainError::ProvisioningFailed(_)
            | DomainError::DatabaseError(_)
            | DomainError::InternalError(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(errors.to_string())
    }
}

impl From<crm_security::password::PasswordError> for DomainError {
    fn from(error: crm_security::password::PasswordError) -> Self {
        use crm_security::password::PasswordError;
        match error {
            PasswordError::TooShort => DomainError::PasswordTooShort,
            PasswordError::TooLong => DomainError::PasswordTooLong,
            PasswordError::TooWeak => DomainError::PasswordTooWeak,
            PasswordError::HashError(e) => DomainError::PasswordHashError(e),
        }
    }
}

impl From<crm_shared::AppError> for DomainError {
    fn from(error: crm_shared::AppError) -> Self {
        match error {
            crm_shared::AppError::InvalidSubdomain(msg) => {
                DomainError::ValidationError(format!("subdomain {}", msg))
            }
            other => DomainError::InternalError(other.to_string()),
        }
    }
}
