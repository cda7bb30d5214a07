use invigilator::FatalSignal;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wait for SIGINT or SIGTERM, then raise `fatal` and cancel `cancel`.
///
/// Returns early without raising anything if `cancel` is triggered first.
pub async fn wait_for_shutdown(
    cancel: CancellationToken,
    fatal: FatalSignal,
) -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        _ = sigint.recv() => info!("SIGINT received"),
        _ = sigterm.recv() => info!("SIGTERM received"),
    }

    // A scan blocked on the region map lock gives up once this is raised.
    fatal.raise();
    cancel.cancel();
    Ok(())
}
