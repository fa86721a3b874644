//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MIN_SUBDOMAIN_LENGTH: usize = 3;
pub const MAX_SUBDOMAIN_LENGTH: usize = 63;
/// PostgreSQL truncates identifiers longer than this.
pub const MAX_DATABASE_NAME_LENGTH: usize = 63;
pub const RESERVED_SUBDOMAINS: &[&str] = &["www", "api", "admin", "central", "app", "mail"];
pub const DEFAULT_CURRENCY: &str = "USD";
pub const MAX_ACTIVATION_CODES_PER_BATCH: u32 = 500;
pub const MAX_CALENDAR_WINDOW_DAYS: i64 = 93;
pub const TENANT_HEADER: &str = "X-Tenant";
pub const PAYMENT_TIMESTAMP_HEADER: &str = "X-Payment-Timestamp";
pub const PAYMENT_SIGNATURE_HEADER: &str = "X-Payment-Signature";
