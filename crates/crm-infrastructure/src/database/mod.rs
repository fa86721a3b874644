//! Database module (PostgreSQL adapters)

pub mod connection;
pub mod migrations;
pub mod postgres;

pub use connection::create_pool;
pub use migrations::{apply_tenant_schema, run_central_migrations};
pub use postgres::*;
