//! Configuration management

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub tenancy: TenancySettings,
    pub payment: PaymentSettings,
    pub bootstrap: BootstrapSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Landlord database holding clients, tiers, subscriptions and invoices.
    pub central_url: String,
    /// Connection URL for tenant databases; `{database}` is replaced by the tenant database name.
    pub tenant_url_template: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub tenant_max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl DatabaseSettings {
    pub fn tenant_url(&self, database: &str) -> String {
        self.tenant_url_template.replace("{database}", database)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TenancySettings {
    /// Base host tenants hang off, e.g. `crm.example.com` gives `acme.crm.example.com`.
    pub central_domain: String,
    pub database_prefix: String,
    pub invoice_due_days: i64,
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentSettings {
    pub webhook_secret: String,
    pub timestamp_tolerance: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapSettings {
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelemetrySettings {
    pub filter: Option<String>,
    pub log_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8080)?
            .set_default("app.name", "crm-server")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.tenant_max_connections", 5)?
            .set_default("database.acquire_timeout_seconds", 3)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("tenancy.database_prefix", "tenant_")?
            .set_default("tenancy.invoice_due_days", 7)?
            .set_default("tenancy.sweep_interval_seconds", 300)?
            .set_default("payment.timestamp_tolerance", 300)?
            .set_default("bootstrap.admin_name", "Super Admin")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;
        config.try_deserialize()
    }
}
