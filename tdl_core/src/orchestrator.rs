//! Download lifecycle: add, fetch metadata, download, terminate.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cleanup::CleanupPolicy;
use crate::error::{EngineError, OrchestratorError};
use crate::logf;
use crate::logger::Logger;
use crate::progress::STATS_UPDATE_INTERVAL;
use crate::shutdown::{Outcome, ShutdownCoordinator, drop_transfer};
use crate::transfer::{TorrentSource, TransferEngine, TransferHandle};

/// Resolved runtime settings. Directories are absolute.
#[derive(Debug, Clone)]
pub struct Settings {
    pub download_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_file: PathBuf,
    pub interval: Duration,
    pub cleanup_policy: CleanupPolicy,
}

impl Settings {
    pub fn new(download_dir: PathBuf, log_dir: PathBuf, log_file: PathBuf) -> Self {
        Self {
            download_dir,
            log_dir,
            log_file,
            interval: STATS_UPDATE_INTERVAL,
            cleanup_policy: CleanupPolicy::default(),
        }
    }
}

/// Logs where files and logs go. Called before the engine is constructed.
pub fn announce(logger: &Logger, settings: &Settings) {
    logf!(logger, "Files will be downloaded to: {}", settings.download_dir.display());
    logf!(logger, "Logs will be saved to: {}", settings.log_file.display());
    logf!(logger, "Log directory: {}", settings.log_dir.display());
}

/// Announces the configured paths, connects the engine and runs the download.
///
/// Nothing touches the network before the announcement is logged: `connect`
/// is only called afterwards, and only when `prepared` holds the source and
/// the interrupt token.
///
/// # Arguments
///
/// * `prepared` - The classified torrent source and the interrupt token, or
///   the startup failure that produced neither.
/// * `connect` - Builds the engine from the download directory.
///
/// # Errors
///
/// Returns the `prepared` failure, [`OrchestratorError::Connect`] when the
/// engine cannot be built, or any error of [`run`].
pub async fn launch<E, C, Fut>(
    logger: &Logger,
    settings: &Settings,
    prepared: Result<(TorrentSource, CancellationToken), OrchestratorError>,
    connect: C,
) -> Result<Outcome, OrchestratorError>
where
    E: TransferEngine,
    C: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<E, EngineError>>,
{
    announce(logger, settings);
    let (source, interrupt) = prepared?;

    logf!(logger, "Starting torrent client...");
    let engine = connect(settings.download_dir.clone())
        .await
        .map_err(OrchestratorError::Connect)?;
    logf!(logger, "Torrent client started");

    run(&engine, logger, settings, &source, interrupt).await
}

/// Downloads `source` to completion or until `interrupt` is cancelled.
///
/// The client is closed exactly once before returning, whatever the path.
///
/// # Returns
///
/// * `Outcome::Completed` - Every byte was verified.
/// * `Outcome::Interrupted` - The interrupt won; incomplete files were
///   removed and the transfer dropped.
///
/// # Errors
///
/// [`OrchestratorError::TransferAdd`], [`OrchestratorError::Metadata`] or
/// [`OrchestratorError::Start`] when the engine fails before the download is
/// under way.
pub async fn run<E: TransferEngine>(
    engine: &E,
    logger: &Logger,
    settings: &Settings,
    source: &TorrentSource,
    interrupt: CancellationToken,
) -> Result<Outcome, OrchestratorError> {
    let result = drive(engine, logger, settings, source, interrupt).await;

    if let Err(err) = engine.close().await {
        logf!(logger, "Warning: failed to close torrent client: {err}");
    }
    result
}

async fn drive<E: TransferEngine>(
    engine: &E,
    logger: &Logger,
    settings: &Settings,
    source: &TorrentSource,
    interrupt: CancellationToken,
) -> Result<Outcome, OrchestratorError> {
    logf!(logger, "Adding torrent: {source}");
    // Adding a magnet link may block until peers deliver the metadata.
    let handle = tokio::select! {
        biased;
        _ = interrupt.cancelled() => {
            logf!(logger, "Interrupt received while adding torrent, shutting down...");
            return Ok(Outcome::Interrupted);
        }
        result = engine.add(source) => result.map_err(OrchestratorError::TransferAdd)?,
    };

    logf!(logger, "Fetching torrent info...");
    tokio::select! {
        biased;
        _ = interrupt.cancelled() => {
            logf!(logger, "Interrupt received while fetching torrent info, shutting down...");
            drop_transfer(engine, logger, &handle).await;
            return Ok(Outcome::Interrupted);
        }
        result = engine.wait_for_metadata(&handle) => {
            result.map_err(OrchestratorError::Metadata)?;
        }
    }

    logf!(logger, "Downloading: {}", handle.name());
    engine
        .start_download_all(&handle)
        .await
        .map_err(OrchestratorError::Start)?;

    let coordinator = ShutdownCoordinator::new(
        engine,
        logger,
        settings.download_dir.clone(),
        settings.cleanup_policy,
        settings.interval,
    );
    Ok(coordinator.run(Arc::new(handle), interrupt).await)
}
