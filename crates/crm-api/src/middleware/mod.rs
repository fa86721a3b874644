//! Request extractors: body/query/path wrappers answering with the API
//! envelope, bearer token authentication and tenant resolution.

pub mod auth;
pub mod extract;
pub mod tenant;

pub use auth::{CentralAdmin, TenantAuth};
pub use extract::{AppJson, AppPath, AppQuery};
pub use tenant::TenantContext;
