//! Startup configuration: directory resolution and source classification.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tdl_core::{DEFAULT_LOG_FILE_NAME, Settings, TorrentSource, paths};
use thiserror::Error;
use url::Url;

use crate::cli::Args;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to create download directory {path}: {source}")]
    CreateDownloadDir { path: PathBuf, source: io::Error },

    #[error("Failed to resolve absolute path for {path}: {source}")]
    ResolvePath { path: PathBuf, source: io::Error },

    #[error("{0} is neither a torrent file nor a magnet link")]
    UnsupportedSource(String),
}

/// Creates the download directory and resolves every path to absolute form.
///
/// The log directory defaults to the download directory. It is not created
/// here; the logger creates it when opening the log file.
pub fn resolve(args: &Args) -> Result<Settings, StartupError> {
    paths::create_dir_all(&args.download_dir).map_err(|source| {
        StartupError::CreateDownloadDir {
            path: args.download_dir.clone(),
            source,
        }
    })?;

    let download_dir = absolute(&args.download_dir)?;
    let log_dir = absolute(args.log_dir.as_deref().unwrap_or(args.download_dir.as_path()))?;
    let log_file = log_dir.join(DEFAULT_LOG_FILE_NAME);

    Ok(Settings {
        interval: Duration::from_secs(args.interval_secs),
        cleanup_policy: args.cleanup.into(),
        ..Settings::new(download_dir, log_dir, log_file)
    })
}

fn absolute(path: &Path) -> Result<PathBuf, StartupError> {
    std::path::absolute(path).map_err(|source| StartupError::ResolvePath {
        path: path.to_path_buf(),
        source,
    })
}

/// An existing file is a torrent file; otherwise the argument must be a
/// `magnet:` URI.
pub fn classify_source(raw: &str) -> Result<TorrentSource, StartupError> {
    let path = Path::new(raw);
    if path.is_file() {
        return Ok(TorrentSource::File(path.to_path_buf()));
    }

    match Url::parse(raw) {
        Ok(url) if url.scheme() == "magnet" => Ok(TorrentSource::Magnet(raw.to_string())),
        _ => Err(StartupError::UnsupportedSource(raw.to_string())),
    }
}
