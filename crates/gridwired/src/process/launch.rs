//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::info;

use gridwire_config::Config;

use crate::bootstrap::{ConfigLoader, StaticConfigLoader, bootstrap_with};
use crate::dispatch::DispatchConnectionHandler;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::SocketListener;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the daemon with an already resolved configuration and the production
/// reporter and signal handling.
///
/// # Errors
///
/// See [`run_daemon_with`].
pub fn run_daemon(config: Config) -> Result<(), LaunchError> {
    run_daemon_with(
        &StaticConfigLoader::new(config),
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal,
    )
}

/// Runs the daemon with injected collaborators.
///
/// Bootstraps, binds the listener and serves until `shutdown` returns. The
/// accept loop is then stopped and every mounted view is closed, which ends
/// all live subscriptions.
///
/// # Errors
///
/// Returns [`LaunchError`] if bootstrap, binding or the shutdown wait fails.
pub fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let daemon = bootstrap_with(loader, Arc::clone(&reporter))?;
    info!(target: PROCESS_TARGET, "starting daemon runtime");

    let listener = SocketListener::bind(daemon.config().listen())?;
    let address = listener.local_addr();
    let handler = Arc::new(DispatchConnectionHandler::new(Arc::clone(daemon.assets())));
    let listener_handle = listener.start(handler)?;
    reporter.listener_started(address);

    let waited = shutdown.wait();
    listener_handle.shutdown();
    let joined = listener_handle.join();
    daemon.assets().close();
    reporter.listener_stopped();
    info!(target: PROCESS_TARGET, "shutdown sequence completed");

    waited?;
    joined?;
    Ok(())
}
