use super::store::KeyValueStore;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

/// Most entries the history ever holds.
pub const RECENT_QUERY_LIMIT: usize = 5;

/// Store key the history is persisted under.
pub const DEFAULT_RECENT_KEY: &str = "recent-searches";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentQueryEntry {
    pub term: String,
    /// 0 is the most recent.
    pub position: usize,
}

/// Bounded, deduplicated, most-recent-first history of search terms.
///
/// Every mutation is written through to the injected store, either directly
/// or through the [`PendingWrite`] returned by [`RecentQueryCache::record_deferred`].
/// Store failures never fail the in-memory operation; they are reported as
/// diagnostics.
pub struct RecentQueryCache {
    terms: VecDeque<String>,
    store: Arc<dyn KeyValueStore>,
    key: String,
    diagnostics: DiagnosticSink,
    version: u64,
    written: Arc<Mutex<u64>>,
}

/// One history value on its way to the store. `None` removes the key.
pub struct PendingWrite {
    store: Arc<dyn KeyValueStore>,
    key: String,
    payload: Option<String>,
    version: u64,
    written: Arc<Mutex<u64>>,
    diagnostics: DiagnosticSink,
}

impl PendingWrite {
    /// Blocking store write. Skipped when a newer value already reached the store.
    pub fn commit(self) {
        let mut written = self.written.lock();
        if *written >= self.version {
            tracing::trace!(key = %self.key, version = self.version, "skipping superseded history write");
            return;
        }
        let result = match &self.payload {
            Some(payload) => self.store.set(&self.key, payload).map_err(|e| ("write", e)),
            None => self.store.remove(&self.key).map_err(|e| ("remove", e)),
        };
        if let Err((operation, error)) = result {
            report(&self.diagnostics, &self.key, operation, &error);
        }
        *written = self.version;
    }
}

impl RecentQueryCache {
    /// Restore from `store`. Unreadable or corrupt data yields an empty history.
    pub fn open(store: Arc<dyn KeyValueStore>, key: impl Into<String>, diagnostics: DiagnosticSink) -> Self {
        let key = key.into();
        let terms = restore(store.as_ref(), &key, &diagnostics);
        tracing::debug!(key = %key, entries = terms.len(), "restored recent searches");
        Self {
            terms,
            store,
            key,
            diagnostics,
            version: 0,
            written: Arc::new(Mutex::new(0)),
        }
    }

    pub fn record(&mut self, term: &str) {
        if let Some(write) = self.record_deferred(term) {
            write.commit();
        }
    }

    /// Like [`record`](Self::record) but leaves the store write to the caller.
    /// Returns `None` when the history did not change.
    pub fn record_deferred(&mut self, term: &str) -> Option<PendingWrite> {
        let term = term.trim();
        if term.is_empty() {
            return None;
        }
        if let Some(index) = self.terms.iter().position(|t| t == term) {
            if index == 0 {
                return None;
            }
            if let Some(existing) = self.terms.remove(index) {
                self.terms.push_front(existing);
            }
        } else {
            self.terms.push_front(term.to_string());
            self.terms.truncate(RECENT_QUERY_LIMIT);
        }
        self.stage()
    }

    pub fn remove(&mut self, term: &str) {
        let term = term.trim();
        let before = self.terms.len();
        self.terms.retain(|t| t != term);
        if self.terms.len() != before {
            if let Some(write) = self.stage() {
                write.commit();
            }
        }
    }

    pub fn clear(&mut self) {
        self.terms.clear();
        self.pending_write(None).commit();
    }

    /// Most recent first.
    pub fn list(&self) -> Vec<String> {
        self.terms.iter().cloned().collect()
    }

    pub fn entries(&self) -> Vec<RecentQueryEntry> {
        self.terms
            .iter()
            .enumerate()
            .map(|(position, term)| RecentQueryEntry {
                term: term.clone(),
                position,
            })
            .collect()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn stage(&mut self) -> Option<PendingWrite> {
        match serde_json::to_string(&self.terms) {
            Ok(encoded) => Some(self.pending_write(Some(encoded))),
            Err(e) => {
                report(&self.diagnostics, &self.key, "encode", &anyhow::Error::from(e));
                None
            }
        }
    }

    fn pending_write(&mut self, payload: Option<String>) -> PendingWrite {
        self.version += 1;
        PendingWrite {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            payload,
            version: self.version,
            written: Arc::clone(&self.written),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

fn report(diagnostics: &DiagnosticSink, key: &str, operation: &'static str, error: &anyhow::Error) {
    diagnostics.emit(Diagnostic::PersistenceFailure {
        operation,
        key: key.to_string(),
        detail: format!("{error:#}"),
    });
}

fn restore(store: &dyn KeyValueStore, key: &str, diagnostics: &DiagnosticSink) -> VecDeque<String> {
    let fail = |operation: &'static str, detail: String| {
        diagnostics.emit(Diagnostic::PersistenceFailure {
            operation,
            key: key.to_string(),
            detail,
        });
        VecDeque::new()
    };

    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return VecDeque::new(),
        Err(e) => return fail("read", format!("{e:#}")),
    };
    let parsed: Vec<String> = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(e) => return fail("decode", e.to_string()),
    };

    // Re-apply the invariants in case another writer produced the value.
    let mut terms = VecDeque::with_capacity(RECENT_QUERY_LIMIT);
    for term in parsed {
        let term = term.trim();
        if !term.is_empty() && !terms.iter().any(|t: &String| t == term) {
            terms.push_back(term.to_string());
        }
        if terms.len() == RECENT_QUERY_LIMIT {
            break;
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recent::store::MemoryStore;
    use anyhow::{anyhow, Result};

    fn cache_with(store: Arc<dyn KeyValueStore>) -> RecentQueryCache {
        RecentQueryCache::open(store, DEFAULT_RECENT_KEY, DiagnosticSink::log_only())
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("disk on fire"))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("read-only"))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow!("read-only"))
        }
    }

    #[test]
    fn caps_at_five_and_evicts_oldest() {
        let mut cache = cache_with(Arc::new(MemoryStore::new()));
        for term in ["one", "two", "three", "four", "five", "six"] {
            cache.record(term);
        }
        assert_eq!(cache.list(), vec!["six", "five", "four", "three", "two"]);
        assert!(!cache.contains("one"));
    }

    #[test]
    fn re_recording_moves_to_front() {
        let mut cache = cache_with(Arc::new(MemoryStore::new()));
        for term in ["a", "b", "c"] {
            cache.record(term);
        }
        cache.record("a");
        assert_eq!(cache.list(), vec!["a", "c", "b"]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn blank_terms_are_ignored() {
        let mut cache = cache_with(Arc::new(MemoryStore::new()));
        cache.record("");
        cache.record("   ");
        assert!(cache.is_empty());
        cache.record("  padded ");
        assert_eq!(cache.list(), vec!["padded"]);
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut cache = cache_with(Arc::new(MemoryStore::new()));
        cache.record("x");
        cache.remove("y");
        cache.remove("x");
        assert!(cache.is_empty());
    }

    #[test]
    fn remove_matches_the_trimmed_term() {
        let mut cache = cache_with(Arc::new(MemoryStore::new()));
        cache.record("tax");
        cache.record("invoice");
        cache.remove("  tax ");
        assert_eq!(cache.list(), vec!["invoice"]);
    }

    #[test]
    fn deferred_record_updates_memory_before_the_store() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut cache = cache_with(store.clone());
        let write = cache.record_deferred("draft").unwrap();
        assert_eq!(cache.list(), vec!["draft"]);
        assert_eq!(store.get(DEFAULT_RECENT_KEY).unwrap(), None);

        write.commit();
        assert_eq!(store.get(DEFAULT_RECENT_KEY).unwrap().as_deref(), Some("[\"draft\"]"));
        assert!(cache.record_deferred("draft").is_none());
    }

    #[test]
    fn older_write_never_overwrites_a_newer_one() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut cache = cache_with(store.clone());
        let first = cache.record_deferred("first").unwrap();
        let second = cache.record_deferred("second").unwrap();

        second.commit();
        first.commit();
        assert_eq!(
            store.get(DEFAULT_RECENT_KEY).unwrap().as_deref(),
            Some("[\"second\",\"first\"]")
        );
    }

    #[test]
    fn survives_reopen_through_store() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        {
            let mut cache = cache_with(store.clone());
            cache.record("taxes");
            cache.record("invoice");
        }
        let cache = cache_with(store.clone());
        assert_eq!(
            cache.entries(),
            vec![
                RecentQueryEntry { term: "invoice".into(), position: 0 },
                RecentQueryEntry { term: "taxes".into(), position: 1 },
            ]
        );
        assert_eq!(
            store.get(DEFAULT_RECENT_KEY).unwrap().as_deref(),
            Some("[\"invoice\",\"taxes\"]")
        );
    }

    #[test]
    fn corrupt_data_means_empty_history() {
        let store = Arc::new(MemoryStore::new());
        store.set(DEFAULT_RECENT_KEY, "{not json").unwrap();
        let (sink, mut rx) = DiagnosticSink::channel();
        let cache = RecentQueryCache::open(store, DEFAULT_RECENT_KEY, sink);
        assert!(cache.is_empty());
        assert!(matches!(
            rx.try_recv(),
            Ok(Diagnostic::PersistenceFailure { operation: "decode", .. })
        ));
    }

    #[test]
    fn restored_values_are_normalized() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(DEFAULT_RECENT_KEY, r#"["a","a","","b","c","d","e","f"]"#)
            .unwrap();
        let cache = cache_with(store);
        assert_eq!(cache.list(), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn failing_store_keeps_memory_state() {
        let (sink, mut rx) = DiagnosticSink::channel();
        let mut cache = RecentQueryCache::open(Arc::new(BrokenStore), DEFAULT_RECENT_KEY, sink);
        assert!(matches!(
            rx.try_recv(),
            Ok(Diagnostic::PersistenceFailure { operation: "read", .. })
        ));

        cache.record("still here");
        assert_eq!(cache.list(), vec!["still here"]);
        assert!(matches!(
            rx.try_recv(),
            Ok(Diagnostic::PersistenceFailure { operation: "write", .. })
        ));
    }
}
