//! Telemetry setup

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetrySettings;
use crate::error::AppError;

const DEFAULT_FILTER: &str = "info,crm=debug";

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process, otherwise buffered file output is lost.
pub fn init_telemetry(settings: &TelemetrySettings) -> Result<Option<WorkerGuard>, AppError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(settings.filter.as_deref().unwrap_or(DEFAULT_FILTER))
    });

    match &settings.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "crm-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|e| AppError::TelemetryError(e.to_string()))?;
            tracing::debug!("File logging enabled in {}", dir);
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()
                .map_err(|e| AppError::TelemetryError(e.to_string()))?;
            Ok(None)
        }
    }
}
