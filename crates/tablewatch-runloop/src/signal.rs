//! OS signals to cancellation.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::RunError;

/// Cancel `token` on SIGTERM or SIGINT.
#[cfg(unix)]
pub fn install_signal_handlers(token: CancellationToken) -> Result<(), RunError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).map_err(|e| RunError::SignalSetup(e.to_string()))?;
    let mut sigint =
        signal(SignalKind::interrupt()).map_err(|e| RunError::SignalSetup(e.to_string()))?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = token.cancelled() => return,
        }
        token.cancel();
    });

    info!("OS signal handlers installed (SIGTERM, SIGINT)");
    Ok(())
}

/// Cancel `token` on Ctrl+C.
#[cfg(not(unix))]
pub fn install_signal_handlers(token: CancellationToken) -> Result<(), RunError> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    info!("Received Ctrl+C");
                    token.cancel();
                }
            }
            _ = token.cancelled() => {}
        }
    });

    info!("OS signal handlers installed (Ctrl+C only)");
    Ok(())
}
