//! # CRM Core
//! 
//! Domain entities, services, and repository traits for the CRM backend.
//! Central (landlord) entities live next to tenant entities; the split is in
//! which database an adapter talks to, not in the domain model.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod error;

// Re-export domain entities
pub use domain::*;
pub use error::DomainError;
