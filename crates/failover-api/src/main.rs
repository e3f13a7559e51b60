//! WAN failover controller - entry point.
//!
//! Loads configuration from the environment, reconciles the stored outlet
//! belief with the live outlet, then supervises the monitor loop and the
//! HTTP control surface until a termination signal arrives or one of them
//! dies.
//!
//! Exits 0 after a signal-driven shutdown and 1 on configuration errors or
//! when a supervised task ends on its own.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use failover_api::{
    create_router, serve, shutdown_signal, AppConfig, AppState, Outcome, Supervisor,
};
use failover_control::{run_monitor, FailoverService, ShellyOutletClient};
use failover_core::SystemClock;
use failover_probe::OmadaProbe;
use failover_store::JsonFileStore;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,failover=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(outcome) if outcome.is_clean() => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Ok(outcome) => {
            tracing::error!(?outcome, "Stopped after a component failure");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<Outcome, Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting WAN failover controller");

    let config = AppConfig::from_env()?;
    tracing::info!(
        omada_url = %config.probe.base_url,
        wan_port = config.probe.wan_port,
        shelly_url = %config.outlet.base_url,
        switch_id = config.outlet.switch_id,
        state_file = %config.state_file.display(),
        listen_addr = %config.server.listen_addr,
        check_interval_secs = config.failover.poll_interval.as_secs(),
        failure_threshold = config.failover.failure_threshold,
        recovery_delay_secs = config.failover.recovery_delay.as_secs(),
        "Configuration loaded"
    );

    let outlet = ShellyOutletClient::new(
        config.outlet.base_url.clone(),
        config.outlet.switch_id,
        config.failover.call_timeout,
    )?;

    let service = Arc::new(FailoverService::new(
        JsonFileStore::new(config.state_file.clone()),
        Arc::new(OmadaProbe::new(config.probe.clone())),
        Arc::new(outlet),
        Arc::new(SystemClock),
        config.failover.clone(),
    ));

    match service.reconcile().await {
        Some(on) => tracing::info!(outlet_on = on, "Outlet state reconciled"),
        None => tracing::warn!("Outlet unreachable at startup, keeping stored state"),
    }

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    tracing::info!(listen_addr = %config.server.listen_addr, "Control surface listening");

    let app = create_router(AppState::new(Arc::clone(&service), config.server));

    let supervisor = Supervisor::default();
    let monitor = run_monitor(service, supervisor.subscribe());
    let server = serve(listener, app, supervisor.subscribe());

    Ok(supervisor.run(monitor, server, shutdown_signal()).await)
}
