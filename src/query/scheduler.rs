//! Debounced query execution.
//!
//! `submit` records the newest query and arms a timer. A submission that
//! arrives while the timer is pending cancels it and re-arms with the new
//! state, so only the last query of a burst ever runs. Every submission bumps
//! a generation counter; a run whose generation is stale by the time it
//! finishes is dropped instead of delivered.

use super::filter::FilterPipeline;
use super::sort::Sorter;
use super::state::QueryState;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::recent::{PendingWrite, SharedRecent};
use crate::records::DocumentRecord;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub debounce: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// A delivered search run.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub run: u64,
    pub query: QueryState,
    pub documents: Vec<DocumentRecord>,
    /// Always `true` for delivered runs; inactive queries produce `SearchEvent::Idle`.
    pub active: bool,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.display_name.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub enum SearchEvent {
    /// A run was armed and will execute once input goes quiet.
    Searching { run: u64 },
    Results(SearchOutcome),
    /// No search: the query has no text and no facets.
    Idle { run: u64 },
}

/// Filter then sort one snapshot.
pub fn run_query(documents: &[DocumentRecord], query: &QueryState, now: DateTime<Utc>) -> Vec<DocumentRecord> {
    let filtered = FilterPipeline::apply_at(documents, query, now);
    Sorter::sorted(filtered, query.sort)
        .into_iter()
        .cloned()
        .collect()
}

type Runner = fn(&[DocumentRecord], &QueryState, DateTime<Utc>) -> Vec<DocumentRecord>;

struct Shared {
    debounce: Duration,
    runner: Runner,
    documents: RwLock<Arc<[DocumentRecord]>>,
    latest: Mutex<Option<QueryState>>,
    pending: Mutex<Option<CancellationToken>>,
    generation: AtomicU64,
    events: mpsc::UnboundedSender<SearchEvent>,
    recent: RwLock<Option<SharedRecent>>,
    diagnostics: DiagnosticSink,
}

/// Debouncing front end for filter + sort. Cheap to clone; clones share state.
///
/// `submit` spawns onto the ambient Tokio runtime and must be called from
/// within one.
#[derive(Clone)]
pub struct QueryScheduler {
    shared: Arc<Shared>,
}

impl QueryScheduler {
    pub fn new(config: SchedulerConfig, diagnostics: DiagnosticSink) -> (Self, mpsc::UnboundedReceiver<SearchEvent>) {
        Self::with_runner(config, diagnostics, run_query)
    }

    fn with_runner(
        config: SchedulerConfig,
        diagnostics: DiagnosticSink,
        runner: Runner,
    ) -> (Self, mpsc::UnboundedReceiver<SearchEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let empty: Arc<[DocumentRecord]> = Arc::from(Vec::new());
        let shared = Shared {
            debounce: config.debounce,
            runner,
            documents: RwLock::new(empty),
            latest: Mutex::new(None),
            pending: Mutex::new(None),
            generation: AtomicU64::new(0),
            events,
            recent: RwLock::new(None),
            diagnostics,
        };
        (Self { shared: Arc::new(shared) }, rx)
    }

    /// Record each delivered run's text term in `recent`.
    pub fn attach_recent(&self, recent: SharedRecent) {
        *self.shared.recent.write() = Some(recent);
    }

    /// Swap in a fresh collection snapshot. Runs that start afterwards see it.
    pub fn set_documents(&self, documents: impl Into<Arc<[DocumentRecord]>>) {
        let documents = documents.into();
        tracing::debug!(count = documents.len(), "search snapshot replaced");
        *self.shared.documents.write() = documents;
    }

    pub fn documents(&self) -> Arc<[DocumentRecord]> {
        self.shared.documents.read().clone()
    }

    /// Most recently submitted query, if any.
    pub fn latest(&self) -> Option<QueryState> {
        self.shared.latest.lock().clone()
    }

    /// Generation of the newest submission.
    pub fn current_run(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    pub fn submit(&self, query: QueryState) {
        // `pending` stays locked until the submission's event is sent.
        let mut pending = self.shared.pending.lock();
        if let Some(previous) = pending.take() {
            previous.cancel();
        }
        let run = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.shared.latest.lock() = Some(query.clone());

        if !query.is_active() {
            tracing::debug!(run, "inactive query, skipping debounce");
            self.shared.send(SearchEvent::Idle { run });
            return;
        }

        let token = CancellationToken::new();
        *pending = Some(token.clone());
        self.shared.send(SearchEvent::Searching { run });

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::trace!(run, "search run superseded before it started");
                    return;
                }
                _ = tokio::time::sleep(shared.debounce) => {}
            }
            shared.execute(run, query).await;
        });
    }

    /// Submit the last query again, e.g. after the collection changed.
    pub fn rerun(&self) {
        if let Some(query) = self.latest() {
            self.submit(query);
        }
    }

    /// Cancel anything pending and report "no search".
    pub fn clear(&self) {
        self.submit(QueryState {
            sort: self.latest().map(|q| q.sort).unwrap_or_default(),
            ..QueryState::default()
        });
    }
}

impl Shared {
    fn send(&self, event: SearchEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("search event receiver dropped");
        }
    }

    fn is_current(&self, run: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == run
    }

    async fn execute(&self, run: u64, query: QueryState) {
        if !self.is_current(run) {
            self.overrun(run);
            return;
        }
        let documents = self.documents.read().clone();
        let started = Instant::now();
        let runner = self.runner;
        let result = panic::catch_unwind(AssertUnwindSafe(|| runner(&documents, &query, Utc::now())));
        let documents = match result {
            Ok(documents) => documents,
            Err(payload) => {
                self.diagnostics.emit(Diagnostic::ExecutionFailed {
                    run,
                    detail: panic_message(payload.as_ref()),
                });
                Vec::new()
            }
        };
        tracing::debug!(
            run,
            result_count = documents.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "search run finished"
        );
        let Some(term) = self.deliver(run, query, documents) else {
            return;
        };
        let Some(write) = self.stage_recent(&term) else {
            return;
        };
        if let Err(e) = tokio::task::spawn_blocking(move || write.commit()).await {
            tracing::warn!(run, error = %e, "recent-search write did not complete");
        }
    }

    /// Sends the run's results and returns its text term, or `None` when the
    /// run was superseded.
    fn deliver(&self, run: u64, query: QueryState, documents: Vec<DocumentRecord>) -> Option<String> {
        // `pending` stays locked until the results are sent.
        let mut pending = self.pending.lock();
        if !self.is_current(run) {
            drop(pending);
            self.overrun(run);
            return None;
        }
        *pending = None;

        let term = query.term().to_string();
        self.send(SearchEvent::Results(SearchOutcome {
            run,
            query,
            documents,
            active: true,
        }));
        Some(term)
    }

    /// Updates the in-memory history; the returned write still has to reach the store.
    fn stage_recent(&self, term: &str) -> Option<PendingWrite> {
        let recent = self.recent.read().clone()?;
        let write = recent.lock().record_deferred(term);
        write
    }

    fn overrun(&self, run: u64) {
        self.diagnostics.emit(Diagnostic::SchedulerOverrun {
            run,
            latest: self.generation.load(Ordering::SeqCst),
        });
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "search run panicked".to_string()
    }
}
