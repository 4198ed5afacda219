//! Operator interrupt listener.

use std::io;

use tokio_util::sync::CancellationToken;

/// Registers for interrupt and termination signals and returns a token that is
/// cancelled when the first one arrives.
///
/// Registration happens before this returns, so a signal delivered right
/// afterwards is never lost. Must be called from within the tokio runtime.
pub fn listen_for_interrupt() -> io::Result<CancellationToken> {
    let token = CancellationToken::new();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let notify = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = interrupt.recv() => tracing::debug!("received SIGINT"),
                _ = terminate.recv() => tracing::debug!("received SIGTERM"),
            }
            notify.cancel();
        });
    }

    #[cfg(not(unix))]
    {
        let notify = token.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => notify.cancel(),
                Err(err) => tracing::warn!(error = %err, "failed to listen for Ctrl+C"),
            }
        });
    }

    Ok(token)
}
