//! docvault — document query & storage analytics engine.
//!
//! Works over an in-memory snapshot of document and folder records supplied
//! by an external fetch layer: incremental text search, facet filtering,
//! deterministic sorting, bounded recent-search history and storage usage
//! classification.

pub mod config;
pub mod diagnostics;
pub mod logging;
pub mod query;
pub mod recent;
pub mod records;
pub mod usage;

pub use config::EngineConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink};
pub use query::{
    DatePreset, FilterPipeline, QueryScheduler, QueryState, SearchEvent, SearchOutcome, SizeUnit,
    SortKey,
};
pub use recent::{KeyValueStore, RecentQueryCache, RecentQueryEntry};
pub use records::{DocumentRecord, FolderRecord};
pub use usage::{StorageAnalyzer, StorageMonitor, StorageSnapshot, UsageTier};
