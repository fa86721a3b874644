//! Central (landlord) API: `/api/central/...`

pub mod auth;
pub mod clients;
pub mod codes;
pub mod invoices;
pub mod payments;
pub mod provisioning;
pub mod subscriptions;
pub mod tenants;
pub mod tiers;
