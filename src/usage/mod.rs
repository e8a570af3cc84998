//! Storage usage accounting over the full document collection.

pub mod analyzer;
pub mod monitor;

pub use analyzer::{
    format_bytes, gb_to_bytes, StatusTone, StorageAnalyzer, StorageSnapshot, StorageStatus,
    UsageTier, DEFAULT_CAPACITY_BYTES,
};
pub use monitor::StorageMonitor;
