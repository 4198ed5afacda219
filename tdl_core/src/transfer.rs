//! Contract consumed from the external transfer engine.
//!
//! The engine owns peer discovery, piece verification and storage. The
//! orchestrator only queries a [`TransferHandle`] and issues the one-shot
//! commands on [`TransferEngine`].

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::EngineError;

/// Where the torrent comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentSource {
    /// A `.torrent` metainfo file on disk.
    File(PathBuf),
    /// A `magnet:` URI; metadata has to be fetched from peers.
    Magnet(String),
}

impl fmt::Display for TorrentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Magnet(uri) => f.write_str(uri),
        }
    }
}

/// One file of a transfer, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFile {
    /// Path relative to the download directory.
    pub relative_path: PathBuf,
    /// Declared length in bytes.
    pub length: u64,
    /// Bytes of this file already verified, when the engine tracks it.
    pub completed: Option<u64>,
}

/// Peer and throughput counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub active_peers: usize,
    /// Cumulative payload bytes that contributed to completion.
    pub useful_bytes_read: u64,
}

/// Read-only view of an in-flight transfer.
pub trait TransferHandle: Send + Sync + 'static {
    fn name(&self) -> String;

    fn total_length(&self) -> u64;

    fn bytes_completed(&self) -> u64;

    /// File list, or `None` while metadata is still unknown.
    fn files(&self) -> Option<Vec<TransferFile>>;

    fn stats(&self) -> TransferStats;
}

/// Client side of the transfer engine.
#[async_trait]
pub trait TransferEngine: Send + Sync {
    type Handle: TransferHandle;

    /// Registers the torrent with the engine.
    async fn add(&self, source: &TorrentSource) -> Result<Self::Handle, EngineError>;

    /// Resolves once the file list and total length are known.
    async fn wait_for_metadata(&self, handle: &Self::Handle) -> Result<(), EngineError>;

    /// Marks every file of the transfer as wanted.
    async fn start_download_all(&self, handle: &Self::Handle) -> Result<(), EngineError>;

    /// Removes the transfer from the engine. Files on disk are kept.
    async fn drop_transfer(&self, handle: &Self::Handle) -> Result<(), EngineError>;

    /// Shuts the client down.
    async fn close(&self) -> Result<(), EngineError>;
}
