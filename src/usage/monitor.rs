use super::analyzer::{StorageAnalyzer, StorageSnapshot};
use crate::records::DocumentRecord;
use std::sync::Arc;
use tokio::sync::watch;

/// Keeps a storage snapshot current as the collection or capacity changes.
///
/// Subscribers get the latest snapshot through a `watch` channel; it is
/// independent of any search state.
pub struct StorageMonitor {
    documents: Arc<[DocumentRecord]>,
    capacity_bytes: u64,
    tx: watch::Sender<Arc<StorageSnapshot>>,
}

impl StorageMonitor {
    pub fn new(capacity_bytes: u64) -> Self {
        let documents: Arc<[DocumentRecord]> = Arc::from(Vec::new());
        let initial = Arc::new(StorageAnalyzer::analyze(&documents, capacity_bytes));
        let (tx, _rx) = watch::channel(initial);
        Self {
            documents,
            capacity_bytes,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<StorageSnapshot>> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Arc<StorageSnapshot> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn set_documents(&mut self, documents: impl Into<Arc<[DocumentRecord]>>) {
        self.documents = documents.into();
        self.recompute();
    }

    pub fn set_capacity(&mut self, capacity_bytes: u64) {
        if capacity_bytes == self.capacity_bytes {
            return;
        }
        self.capacity_bytes = capacity_bytes;
        self.recompute();
    }

    fn recompute(&self) {
        let snapshot = StorageAnalyzer::analyze(&self.documents, self.capacity_bytes);
        tracing::debug!(
            used_bytes = snapshot.used_bytes,
            total_files = snapshot.total_files,
            tier = %snapshot.tier,
            "storage usage updated"
        );
        self.tx.send_replace(Arc::new(snapshot));
    }
}
