//! # CRM Security
//! 
//! Security utilities: password hashing and policy, JWT, redeemable codes,
//! payment webhook signatures.

pub mod jwt;
pub mod password;
pub mod codes;
pub mod signature;

pub use jwt::{Claims, JwtService, TokenScope};
pub use password::{PasswordPolicy, PasswordService};
pub use signature::WebhookSigner;
