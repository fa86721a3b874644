//! # CRM API
//!
//! HTTP layer: axum handlers for the central (landlord) and tenant APIs,
//! the response envelope, error mapping and the auth/tenant extractors.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
