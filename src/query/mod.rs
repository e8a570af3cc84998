//! Search over a document snapshot: facet filtering, sorting and the
//! debounced scheduler that drives both.

pub mod facets;
pub mod filter;
pub mod scheduler;
pub mod sort;
pub mod state;

pub use facets::{folder_label, FacetOptions, KNOWN_FILE_TYPES};
pub use filter::FilterPipeline;
pub use scheduler::{run_query, QueryScheduler, SchedulerConfig, SearchEvent, SearchOutcome};
pub use sort::Sorter;
pub use state::{DatePreset, QueryState, RawQuery, SizeRange, SizeUnit, SortKey};
