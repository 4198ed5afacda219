//! Error types shared by the orchestrator components.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type returned by transfer engine implementations.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// Failures while opening the persistent log sink.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to open log file {path}: {source}")]
    OpenFile { path: PathBuf, source: io::Error },
}

/// A deletion failure that aborted incomplete-file cleanup.
#[derive(Debug, Error)]
#[error("failed to remove {path}: {source}")]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Fatal failures of the download lifecycle before the terminal wait begins.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to register signal handlers: {0}")]
    Signals(#[source] io::Error),

    #[error("failed to create torrent client: {0}")]
    Connect(#[source] EngineError),

    #[error("failed to add torrent: {0}")]
    TransferAdd(#[source] EngineError),

    #[error("failed to fetch torrent info: {0}")]
    Metadata(#[source] EngineError),

    #[error("failed to start download: {0}")]
    Start(#[source] EngineError),
}
