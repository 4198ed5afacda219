//! Terminal-event channel and the coordinator that acts on it.
//!
//! Two producers race to end a download: the progress monitor reports
//! completion and the interrupt listener reports an operator interrupt. Both
//! write into a single one-shot slot; the first write wins and every later
//! write is a no-op.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::cleanup::{CleanupPolicy, remove_incomplete_files};
use crate::logf;
use crate::logger::Logger;
use crate::progress::ProgressMonitor;
use crate::transfer::{TransferEngine, TransferHandle};

/// The event that ends the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalEvent {
    Completed,
    Interrupted,
}

/// Producer side of the terminal channel. Clones share one slot.
#[derive(Clone)]
pub struct ShutdownTrigger {
    slot: Arc<Mutex<Option<oneshot::Sender<TerminalEvent>>>>,
}

impl ShutdownTrigger {
    /// Delivers `event` if nothing was delivered before. Returns whether this
    /// call won.
    pub fn fire(&self, event: TerminalEvent) -> bool {
        match self.slot.lock().take() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }
}

/// Consumer side of the terminal channel, awaited exactly once.
pub struct ShutdownSignal {
    receiver: oneshot::Receiver<TerminalEvent>,
}

impl ShutdownSignal {
    /// Waits for the first event. A channel whose producers all vanished
    /// counts as an interrupt.
    pub async fn wait(self) -> TerminalEvent {
        self.receiver.await.unwrap_or(TerminalEvent::Interrupted)
    }
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = oneshot::channel();
    (
        ShutdownTrigger {
            slot: Arc::new(Mutex::new(Some(sender))),
        },
        ShutdownSignal { receiver },
    )
}

/// How a download ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome {
    Completed,
    Interrupted,
}

impl Outcome {
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::Interrupted => 1,
        }
    }
}

impl From<TerminalEvent> for Outcome {
    fn from(event: TerminalEvent) -> Self {
        match event {
            TerminalEvent::Completed => Self::Completed,
            TerminalEvent::Interrupted => Self::Interrupted,
        }
    }
}

/// Races completion against interrupt and runs the matching terminal path.
///
/// The coordinator never closes the client; that is left to the caller so it
/// happens exactly once on every path.
pub struct ShutdownCoordinator<'a, E: TransferEngine> {
    engine: &'a E,
    logger: &'a Logger,
    download_dir: PathBuf,
    policy: CleanupPolicy,
    interval: Duration,
}

impl<'a, E: TransferEngine> ShutdownCoordinator<'a, E> {
    pub fn new(
        engine: &'a E,
        logger: &'a Logger,
        download_dir: PathBuf,
        policy: CleanupPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            logger,
            download_dir,
            policy,
            interval,
        }
    }

    /// Monitors `handle` until it completes or `interrupt` is cancelled.
    pub async fn run(&self, handle: Arc<E::Handle>, interrupt: CancellationToken) -> Outcome {
        let (trigger, signal) = shutdown_channel();
        let stop = CancellationToken::new();

        let monitor = ProgressMonitor::new(self.logger.clone(), self.interval).spawn(
            Arc::clone(&handle),
            trigger.clone(),
            stop.clone(),
        );
        let forwarder = tokio::spawn(async move {
            interrupt.cancelled().await;
            trigger.fire(TerminalEvent::Interrupted);
        });

        let event = signal.wait().await;
        tracing::debug!(?event, "terminal event received");
        stop.cancel();
        forwarder.abort();
        if let Err(err) = monitor.await {
            tracing::warn!(error = %err, "progress monitor ended abnormally");
        }

        match event {
            TerminalEvent::Completed => {
                logf!(self.logger, "Torrent download finished successfully");
            }
            TerminalEvent::Interrupted => {
                logf!(self.logger, "Interrupt received, shutting down...");
                self.discard_incomplete(&*handle).await;
                drop_transfer(self.engine, self.logger, &*handle).await;
            }
        }

        event.into()
    }

    async fn discard_incomplete(&self, handle: &E::Handle) {
        let completed = handle.bytes_completed();
        if completed >= handle.total_length() {
            return;
        }

        logf!(self.logger, "Removing incompletely downloaded files...");
        let Some(files) = handle.files() else {
            logf!(self.logger, "Warning: torrent info unavailable, nothing removed");
            return;
        };
        if let Err(err) =
            remove_incomplete_files(&files, completed, &self.download_dir, self.policy, self.logger)
                .await
        {
            logf!(self.logger, "Warning: error while removing files: {err}");
        }
    }
}

/// Asks the engine to forget the transfer, logging a failure as a warning.
pub(crate) async fn drop_transfer<E: TransferEngine>(
    engine: &E,
    logger: &Logger,
    handle: &E::Handle,
) {
    if let Err(err) = engine.drop_transfer(handle).await {
        logf!(logger, "Warning: failed to drop torrent: {err}");
    }
}
