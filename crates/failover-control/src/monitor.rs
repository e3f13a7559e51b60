//! The decision loop.
//!
//! Runs one cycle, sleeps for the poll interval, repeats. A shutdown signal
//! interrupts the sleep but never a cycle in progress, so an outlet command
//! and its state write always complete together.

use std::sync::Arc;

use failover_store::StateStore;
use tokio::sync::watch;

use crate::service::FailoverService;

/// Run decision cycles until `shutdown` turns true or its sender is dropped.
pub async fn run_monitor<S: StateStore + 'static>(
    service: Arc<FailoverService<S>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = service.config().poll_interval;
    tracing::info!(
        interval_secs = interval.as_secs(),
        failure_threshold = service.config().failure_threshold,
        recovery_delay_secs = service.config().recovery_delay.as_secs(),
        "Starting WAN monitor loop"
    );

    while !*shutdown.borrow_and_update() {
        let outcome = service.run_cycle().await;
        tracing::trace!(?outcome, "Cycle complete");

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!("WAN monitor loop stopped");
}
