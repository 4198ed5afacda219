//! In-memory engine used by the unit tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::transfer::{TorrentSource, TransferEngine, TransferFile, TransferHandle, TransferStats};

#[derive(Default)]
struct HandleState {
    total: AtomicU64,
    completed: AtomicU64,
    useful: AtomicU64,
    peers: AtomicUsize,
    files: Mutex<Option<Vec<TransferFile>>>,
}

/// Transfer whose counters are driven by the test.
#[derive(Clone, Default)]
pub struct FakeHandle {
    state: Arc<HandleState>,
}

impl FakeHandle {
    pub fn new(total: u64) -> Self {
        let handle = Self::default();
        handle.state.total.store(total, Ordering::SeqCst);
        *handle.state.files.lock() = Some(Vec::new());
        handle
    }

    pub fn with_files(files: Vec<(&str, u64)>) -> Self {
        let handle = Self::default();
        let files: Vec<_> = files
            .into_iter()
            .map(|(name, length)| TransferFile {
                relative_path: PathBuf::from(name),
                length,
                completed: None,
            })
            .collect();
        handle
            .state
            .total
            .store(files.iter().map(|f| f.length).sum(), Ordering::SeqCst);
        *handle.state.files.lock() = Some(files);
        handle
    }

    /// Sets bytes completed and the cumulative useful-bytes counter.
    pub fn advance(&self, completed: u64, useful: u64) {
        self.state.completed.store(completed, Ordering::SeqCst);
        self.state.useful.store(useful, Ordering::SeqCst);
    }

    pub fn set_peers(&self, peers: usize) {
        self.state.peers.store(peers, Ordering::SeqCst);
    }
}

impl TransferHandle for FakeHandle {
    fn name(&self) -> String {
        "fake".to_string()
    }

    fn total_length(&self) -> u64 {
        self.state.total.load(Ordering::SeqCst)
    }

    fn bytes_completed(&self) -> u64 {
        self.state.completed.load(Ordering::SeqCst)
    }

    fn files(&self) -> Option<Vec<TransferFile>> {
        self.state.files.lock().clone()
    }

    fn stats(&self) -> TransferStats {
        TransferStats {
            active_peers: self.state.peers.load(Ordering::SeqCst),
            useful_bytes_read: self.state.useful.load(Ordering::SeqCst),
        }
    }
}

/// Engine recording every command it receives. Clones share the record.
#[derive(Clone)]
pub struct FakeEngine {
    handle: FakeHandle,
    calls: Arc<Mutex<Vec<&'static str>>>,
    reject_add: bool,
    metadata_gate: Option<CancellationToken>,
}

impl FakeEngine {
    pub fn new(handle: FakeHandle) -> Self {
        Self {
            handle,
            calls: Arc::new(Mutex::new(Vec::new())),
            reject_add: false,
            metadata_gate: None,
        }
    }

    pub fn rejecting_add(mut self) -> Self {
        self.reject_add = true;
        self
    }

    /// Metadata stays pending until `gate` is cancelled.
    pub fn holding_metadata(mut self, gate: CancellationToken) -> Self {
        self.metadata_gate = Some(gate);
        self
    }

    pub fn handle(&self) -> FakeHandle {
        self.handle.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl TransferEngine for FakeEngine {
    type Handle = FakeHandle;

    async fn add(&self, _source: &TorrentSource) -> Result<FakeHandle, EngineError> {
        self.record("add");
        if self.reject_add {
            return Err("invalid metainfo".into());
        }
        Ok(self.handle.clone())
    }

    async fn wait_for_metadata(&self, _handle: &FakeHandle) -> Result<(), EngineError> {
        self.record("wait_for_metadata");
        if let Some(gate) = &self.metadata_gate {
            gate.cancelled().await;
        }
        Ok(())
    }

    async fn start_download_all(&self, _handle: &FakeHandle) -> Result<(), EngineError> {
        self.record("start_download_all");
        Ok(())
    }

    async fn drop_transfer(&self, _handle: &FakeHandle) -> Result<(), EngineError> {
        self.record("drop_transfer");
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.record("close");
        Ok(())
    }
}
