use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crm_api::{build_router, AppState};
use crm_infrastructure::{create_central_pool, run_central_migrations};
use crm_shared::config::AppConfig;

/// Expires lapsed subscriptions, renews or suspends their tenants and marks
/// overdue invoices, every `tenancy.sweep_interval_seconds`.
fn spawn_subscription_sweep(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.tenancy.sweep_interval_seconds.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match state.subscriptions().sweep(Utc::now()).await {
                Ok(report) => info!(
                    expired = report.expired,
                    renewed = report.renewed,
                    suspended = report.suspended_tenants,
                    overdue = report.overdue_invoices,
                    "Subscription sweep finished"
                ),
                Err(e) => error!("Subscription sweep failed: {}", e),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    let _guard = crm_shared::telemetry::init_telemetry(&config.telemetry)?;
    info!("{} starting ({})...", config.app.name, config.app.env);

    // Central database
    let pool = create_central_pool(&config.database).await?;
    run_central_migrations(&pool).await?;
    info!("Central database ready.");

    let state = AppState::new(pool, config.clone());

    let bootstrap = &config.bootstrap;
    match state
        .central_auth()
        .bootstrap_super_admin(&bootstrap.admin_name, &bootstrap.admin_email, &bootstrap.admin_password)
        .await
    {
        Ok(Some(_)) => info!("Super admin account created"),
        Ok(None) => {}
        Err(e) => {
            error!("Failed to create super admin: {}", e);
            return Err(e.into());
        }
    }

    let sweep = spawn_subscription_sweep(state.clone());
    let app = build_router(state);

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.abort();
    Ok(())
}
