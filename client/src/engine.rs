//! Transfer engine backed by librqbit.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use librqbit::api::TorrentIdOrHash;
use librqbit::{AddTorrent, AddTorrentOptions, ManagedTorrent, Session, SessionOptions};
use tdl_core::{
    EngineError, TorrentSource, TransferEngine, TransferFile, TransferHandle, TransferStats,
};

/// A librqbit session writing into one download directory.
pub struct RqbitEngine {
    session: Arc<Session>,
    download_dir: PathBuf,
}

impl RqbitEngine {
    /// Creates the session. The session starts its listeners and DHT right
    /// away, so this is the first network activity of the process.
    pub async fn new(download_dir: &Path) -> anyhow::Result<Self> {
        let session = Session::new_with_opts(download_dir.to_path_buf(), SessionOptions::default())
            .await
            .context("error creating session")?;

        Ok(Self {
            session,
            download_dir: download_dir.to_path_buf(),
        })
    }
}

/// A torrent managed by the session.
pub struct RqbitTransfer {
    handle: Arc<ManagedTorrent>,
    /// (relative path, length) per file, filled once metadata is known.
    layout: OnceLock<Layout>,
}

type Layout = Vec<(PathBuf, u64)>;

/// Reads the file layout once. Later calls return the stored layout without
/// reading again.
fn remember_layout(
    slot: &OnceLock<Layout>,
    read: impl FnOnce() -> anyhow::Result<Layout>,
) -> anyhow::Result<&Layout> {
    if let Some(layout) = slot.get() {
        return Ok(layout);
    }
    let layout = read()?;
    // A concurrent caller may have stored the same layout first.
    Ok(slot.get_or_init(|| layout))
}

impl TransferHandle for RqbitTransfer {
    fn name(&self) -> String {
        self.handle
            .name()
            .unwrap_or_else(|| self.handle.info_hash().as_string())
    }

    fn total_length(&self) -> u64 {
        self.handle.stats().total_bytes
    }

    fn bytes_completed(&self) -> u64 {
        self.handle.stats().progress_bytes
    }

    fn files(&self) -> Option<Vec<TransferFile>> {
        let layout = self.layout.get()?;
        let progress = self.handle.stats().file_progress;
        Some(
            layout
                .iter()
                .enumerate()
                .map(|(idx, (path, length))| TransferFile {
                    relative_path: path.clone(),
                    length: *length,
                    completed: progress.get(idx).copied(),
                })
                .collect(),
        )
    }

    fn stats(&self) -> TransferStats {
        self.handle
            .stats()
            .live
            .map(|live| TransferStats {
                active_peers: live.snapshot.peer_stats.live,
                useful_bytes_read: live.snapshot.downloaded_and_checked_bytes,
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl TransferEngine for RqbitEngine {
    type Handle = RqbitTransfer;

    async fn add(&self, source: &TorrentSource) -> Result<RqbitTransfer, EngineError> {
        let add = match source {
            TorrentSource::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("error reading torrent file {}", path.display()))?;
                AddTorrent::from_bytes(bytes)
            }
            TorrentSource::Magnet(uri) => AddTorrent::from_url(uri.as_str()),
        };

        let options = AddTorrentOptions {
            // Files land directly under the download directory so their
            // relative paths match what cleanup joins against.
            output_folder: Some(self.download_dir.to_string_lossy().into_owned()),
            overwrite: true,
            ..Default::default()
        };

        let handle = self
            .session
            .add_torrent(add, Some(options))
            .await
            .context("error adding torrent")?
            .into_handle()
            .ok_or_else(|| anyhow!("session did not return a torrent handle"))?;

        Ok(RqbitTransfer {
            handle,
            layout: OnceLock::new(),
        })
    }

    async fn wait_for_metadata(&self, transfer: &RqbitTransfer) -> Result<(), EngineError> {
        transfer
            .handle
            .wait_until_initialized()
            .await
            .context("error initializing torrent")?;

        let layout = remember_layout(&transfer.layout, || {
            transfer
                .handle
                .with_metadata(|metadata| {
                    metadata
                        .file_infos
                        .iter()
                        .map(|file| (file.relative_filename.clone(), file.len))
                        .collect::<Vec<_>>()
                })
                .context("torrent metadata unavailable")
        })?;
        tracing::debug!(files = layout.len(), "torrent metadata ready");
        Ok(())
    }

    async fn start_download_all(&self, transfer: &RqbitTransfer) -> Result<(), EngineError> {
        // Torrents are added unpaused with no file filter, so every file is
        // already scheduled.
        tracing::debug!(id = transfer.handle.id(), "downloading all files");
        Ok(())
    }

    async fn drop_transfer(&self, transfer: &RqbitTransfer) -> Result<(), EngineError> {
        self.session
            .delete(TorrentIdOrHash::Id(transfer.handle.id()), false)
            .await
            .context("error removing torrent from session")?;
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.session.stop().await;
        Ok(())
    }
}
