//! Task supervision.
//!
//! The process runs two long-lived tasks: the monitor loop and the HTTP
//! server. [`Supervisor::run`] waits for a termination signal or for either
//! task to end on its own. Whichever comes first, the shutdown channel is
//! raised and the remaining tasks get a grace period before they are aborted.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default time the remaining tasks get to stop after shutdown is raised.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// A supervised task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// The decision loop.
    Monitor,
    /// The HTTP control surface.
    Server,
}

impl Component {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Server => "server",
        }
    }
}

/// Why supervision ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A termination signal arrived; both tasks were asked to stop.
    Signalled,
    /// A task ended on its own.
    Exited(Component),
}

impl Outcome {
    /// Whether the process should exit successfully.
    #[must_use]
    pub const fn is_clean(self) -> bool {
        matches!(self, Self::Signalled)
    }
}

/// Owns the shutdown channel shared by the supervised tasks.
#[derive(Debug)]
pub struct Supervisor {
    shutdown: watch::Sender<bool>,
    grace: Duration,
}

impl Supervisor {
    /// Create a supervisor with the given grace period.
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { shutdown, grace }
    }

    /// A receiver that turns true when shutdown is raised.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Spawn both tasks and supervise them until `signal` resolves or one ends.
    pub async fn run<M, W, G>(self, monitor: M, server: W, signal: G) -> Outcome
    where
        M: Future<Output = ()> + Send + 'static,
        W: Future<Output = io::Result<()>> + Send + 'static,
        G: Future<Output = ()>,
    {
        let mut monitor = tokio::spawn(monitor);
        let mut server = tokio::spawn(server);

        let outcome = tokio::select! {
            () = signal => Outcome::Signalled,
            result = &mut monitor => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Monitor task failed");
                } else {
                    tracing::error!("Monitor task exited unexpectedly");
                }
                Outcome::Exited(Component::Monitor)
            }
            result = &mut server => {
                match result {
                    Ok(Ok(())) => tracing::error!("Server exited unexpectedly"),
                    Ok(Err(e)) => tracing::error!(error = %e, "Server failed"),
                    Err(e) => tracing::error!(error = %e, "Server task failed"),
                }
                Outcome::Exited(Component::Server)
            }
        };

        tracing::info!(?outcome, "Shutting down");
        self.shutdown.send_replace(true);

        let grace = self.grace;
        match outcome {
            Outcome::Signalled => {
                tokio::join!(
                    stop(Component::Monitor, monitor, grace),
                    stop(Component::Server, server, grace)
                );
            }
            Outcome::Exited(Component::Monitor) => stop(Component::Server, server, grace).await,
            Outcome::Exited(Component::Server) => stop(Component::Monitor, monitor, grace).await,
        }

        outcome
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}

/// Wait up to `grace` for a task to finish, then abort it.
async fn stop<T>(component: Component, mut handle: JoinHandle<T>, grace: Duration) {
    if tokio::time::timeout(grace, &mut handle).await.is_err() {
        tracing::warn!(
            component = component.as_str(),
            grace_secs = grace.as_secs(),
            "Task did not stop in time, aborting"
        );
        handle.abort();
    } else {
        tracing::debug!(component = component.as_str(), "Task stopped");
    }
}

/// Serve `app` on `listener` until `shutdown` turns true.
///
/// Connection info is attached to every request so the rate limiter can key
/// clients by address.
///
/// # Errors
///
/// Returns an error if the server fails to accept connections.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        while !*shutdown.borrow_and_update() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }
    })
    .await
}

/// Resolve on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!(signal = "SIGINT", "Received termination signal"),
        () = terminate => tracing::info!(signal = "SIGTERM", "Received termination signal"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    /// A task that runs until shutdown and records that it saw it.
    fn until_shutdown(
        mut rx: watch::Receiver<bool>,
        stopped: Arc<AtomicBool>,
    ) -> impl Future<Output = ()> + Send + 'static {
        async move {
            while !*rx.borrow_and_update() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
            stopped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn signal_stops_both_tasks() {
        let supervisor = Supervisor::new(Duration::from_secs(1));
        let monitor_stopped = Arc::new(AtomicBool::new(false));
        let server_stopped = Arc::new(AtomicBool::new(false));

        let monitor = until_shutdown(supervisor.subscribe(), Arc::clone(&monitor_stopped));
        let server = {
            let task = until_shutdown(supervisor.subscribe(), Arc::clone(&server_stopped));
            async move {
                task.await;
                Ok(())
            }
        };

        let outcome = supervisor.run(monitor, server, async {}).await;

        assert_eq!(outcome, Outcome::Signalled);
        assert!(outcome.is_clean());
        assert!(monitor_stopped.load(Ordering::SeqCst));
        assert!(server_stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn monitor_exit_stops_server() {
        let supervisor = Supervisor::new(Duration::from_secs(1));
        let server_stopped = Arc::new(AtomicBool::new(false));

        let server = {
            let task = until_shutdown(supervisor.subscribe(), Arc::clone(&server_stopped));
            async move {
                task.await;
                Ok(())
            }
        };

        let outcome = supervisor
            .run(async {}, server, std::future::pending())
            .await;

        assert_eq!(outcome, Outcome::Exited(Component::Monitor));
        assert!(!outcome.is_clean());
        assert!(server_stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn server_error_stops_monitor() {
        let supervisor = Supervisor::new(Duration::from_secs(1));
        let monitor_stopped = Arc::new(AtomicBool::new(false));
        let monitor = until_shutdown(supervisor.subscribe(), Arc::clone(&monitor_stopped));

        let outcome = supervisor
            .run(
                monitor,
                async { Err(io::Error::new(io::ErrorKind::AddrInUse, "port taken")) },
                std::future::pending(),
            )
            .await;

        assert_eq!(outcome, Outcome::Exited(Component::Server));
        assert!(monitor_stopped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn stubborn_task_is_aborted_after_grace() {
        let supervisor = Supervisor::new(Duration::from_secs(5));

        let outcome = supervisor
            .run(
                std::future::pending::<()>(),
                async { Ok(()) },
                std::future::pending(),
            )
            .await;

        assert_eq!(outcome, Outcome::Exited(Component::Server));
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(serve(listener, Router::new(), rx));
        tx.send_replace(true);

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
