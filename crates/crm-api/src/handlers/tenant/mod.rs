//! Tenant API: `/api/...`, addressed by `Host` or `X-Tenant`.

pub mod auth;
pub mod catalog;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod leads;
pub mod locations;
pub mod pipelines;
pub mod roles;
pub mod tasks;
pub mod teams;
pub mod users;
