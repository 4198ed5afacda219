//! Core library for the torrent downloader.
//!
//! This library drives an external transfer engine through one download:
//! it reports progress on a fixed period, races completion against an
//! operator interrupt, removes incomplete files when interrupted, and mirrors
//! every message to a log file and the console.

pub mod cleanup;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod paths;
pub mod progress;
pub mod shutdown;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use cleanup::{CleanupPolicy, remove_incomplete_files};
pub use error::{CleanupError, EngineError, LoggerError, OrchestratorError};
pub use logger::{DEFAULT_LOG_FILE_NAME, LogWriter, Logger};
pub use orchestrator::Settings;
pub use progress::{ProgressMonitor, ProgressSample, STATS_UPDATE_INTERVAL};
pub use shutdown::{Outcome, ShutdownCoordinator, ShutdownSignal, ShutdownTrigger, TerminalEvent};
pub use transfer::{TorrentSource, TransferEngine, TransferFile, TransferHandle, TransferStats};
