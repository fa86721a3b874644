//! Application error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid subdomain: {0}")]
    InvalidSubdomain(String),

    #[error("Telemetry error: {0}")]
    TelemetryError(String),
}
