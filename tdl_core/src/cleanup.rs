//! Removal of files that were not fully downloaded.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::CleanupError;
use crate::logf;
use crate::logger::Logger;
use crate::transfer::TransferFile;

/// How a file is judged incomplete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// A file is incomplete when its declared length exceeds the bytes
    /// completed across the whole transfer. In multi-file torrents this can
    /// spare a partial file or delete a finished one.
    Aggregate,
    /// A file is incomplete when its own completed bytes fall short of its
    /// length. Files without per-file progress fall back to `Aggregate`.
    #[default]
    PerFile,
}

impl CleanupPolicy {
    pub fn is_incomplete(self, file: &TransferFile, bytes_completed: u64) -> bool {
        match (self, file.completed) {
            (Self::PerFile, Some(done)) => done < file.length,
            _ => file.length > bytes_completed,
        }
    }
}

/// Deletes every file of `files` under `base_dir` that `policy` judges
/// incomplete and returns the paths that were removed.
///
/// Files that are already gone are skipped. Any other failure stops the run;
/// files removed before it stay removed.
///
/// # Arguments
///
/// * `files` - The transfer's file list, paths relative to `base_dir`.
/// * `bytes_completed` - Bytes verified across the whole transfer.
/// * `policy` - How a single file is judged incomplete.
///
/// # Errors
///
/// Returns [`CleanupError`] for the first deletion that fails with anything
/// but "not found".
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use tdl_core::{CleanupPolicy, Logger, TransferFile, remove_incomplete_files};
///
/// #[tokio::main]
/// async fn main() {
///     let dir = tempfile::tempdir().unwrap();
///     std::fs::write(dir.path().join("b.bin"), b"partial").unwrap();
///     let files = vec![TransferFile {
///         relative_path: PathBuf::from("b.bin"),
///         length: 200,
///         completed: None,
///     }];
///     let logger = Logger::with_sinks(std::io::sink(), std::io::sink());
///
///     let removed =
///         remove_incomplete_files(&files, 150, dir.path(), CleanupPolicy::Aggregate, &logger)
///             .await
///             .unwrap();
///     assert_eq!(removed, vec![dir.path().join("b.bin")]);
/// }
/// ```
pub async fn remove_incomplete_files(
    files: &[TransferFile],
    bytes_completed: u64,
    base_dir: &Path,
    policy: CleanupPolicy,
    logger: &Logger,
) -> Result<Vec<PathBuf>, CleanupError> {
    let mut removed = Vec::new();

    for file in files
        .iter()
        .filter(|f| policy.is_incomplete(f, bytes_completed))
    {
        let path = base_dir.join(&file.relative_path);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                logf!(logger, "Removed incomplete file: {}", path.display());
                removed.push(path);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "incomplete file already absent");
            }
            Err(source) => return Err(CleanupError { path, source }),
        }
    }

    Ok(removed)
}
