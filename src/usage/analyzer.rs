use crate::records::DocumentRecord;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Capacity used when none is configured: 15 GB.
pub const DEFAULT_CAPACITY_BYTES: u64 = 15 * BYTES_PER_GB;

/// Window for `StorageSnapshot::recent_uploads`.
pub const RECENT_UPLOAD_WINDOW_DAYS: i64 = 7;

/// Four-level warning classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageTier {
    Low,
    Medium,
    High,
    Critical,
}

impl UsageTier {
    pub fn classify(usage_percentage: f64) -> Self {
        if usage_percentage >= 95.0 {
            Self::Critical
        } else if usage_percentage >= 90.0 {
            Self::High
        } else if usage_percentage >= 85.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for UsageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headline status. Uses its own thresholds, separate from `UsageTier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StorageStatus {
    AlmostFull,
    RunningLow,
    GettingFull,
    Available { remaining_percentage: f64 },
}

impl StorageStatus {
    pub fn classify(usage_percentage: f64, remaining_percentage: f64) -> Self {
        if usage_percentage >= 95.0 {
            Self::AlmostFull
        } else if usage_percentage >= 90.0 {
            Self::RunningLow
        } else if usage_percentage >= 75.0 {
            Self::GettingFull
        } else {
            Self::Available { remaining_percentage }
        }
    }
}

impl fmt::Display for StorageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlmostFull => f.write_str("Storage Almost Full!"),
            Self::RunningLow => f.write_str("Storage Running Low"),
            Self::GettingFull => f.write_str("Storage Getting Full"),
            Self::Available { remaining_percentage } => {
                write!(f, "{}% Available", format_percentage(*remaining_percentage))
            }
        }
    }
}

/// Colour band for usage bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Calm,
    Elevated,
    Warning,
    Danger,
}

impl StatusTone {
    pub fn classify(usage_percentage: f64) -> Self {
        if usage_percentage >= 90.0 {
            Self::Danger
        } else if usage_percentage >= 75.0 {
            Self::Warning
        } else if usage_percentage >= 50.0 {
            Self::Elevated
        } else {
            Self::Calm
        }
    }
}

/// Usage statistics for one collection snapshot and capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageSnapshot {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub remaining_bytes: u64,
    pub usage_percentage: f64,
    pub remaining_percentage: f64,
    pub average_file_size: f64,
    pub total_files: usize,
    pub tier: UsageTier,
    pub status: StorageStatus,
    pub status_text: String,
    pub tone: StatusTone,
    pub recent_uploads: Vec<DocumentRecord>,
    pub recent_uploads_count: usize,
    pub used_formatted: String,
    pub total_formatted: String,
    pub remaining_formatted: String,
    pub average_file_size_formatted: String,
}

pub struct StorageAnalyzer;

impl StorageAnalyzer {
    pub fn analyze(documents: &[DocumentRecord], capacity_bytes: u64) -> StorageSnapshot {
        Self::analyze_at(documents, capacity_bytes, Utc::now())
    }

    /// Accounting always covers the whole collection, never a filtered view.
    pub fn analyze_at(documents: &[DocumentRecord], capacity_bytes: u64, now: DateTime<Utc>) -> StorageSnapshot {
        let used_bytes: u64 = documents
            .iter()
            .fold(0u64, |sum, doc| sum.saturating_add(doc.size_bytes));
        let usage_percentage = if capacity_bytes == 0 {
            0.0
        } else {
            (used_bytes as f64 / capacity_bytes as f64 * 100.0).min(100.0)
        };
        let remaining_percentage = (100.0 - usage_percentage).max(0.0);
        let remaining_bytes = capacity_bytes.saturating_sub(used_bytes);
        let average_file_size = if documents.is_empty() {
            0.0
        } else {
            used_bytes as f64 / documents.len() as f64
        };

        let cutoff = now - Duration::days(RECENT_UPLOAD_WINDOW_DAYS);
        let recent_uploads: Vec<DocumentRecord> = documents
            .iter()
            .filter(|doc| doc.created_at.is_some_and(|at| at >= cutoff))
            .cloned()
            .collect();

        let status = StorageStatus::classify(usage_percentage, remaining_percentage);
        let tier = UsageTier::classify(usage_percentage);
        tracing::trace!(
            used_bytes,
            capacity_bytes,
            usage_percentage,
            tier = %tier,
            "storage snapshot computed"
        );

        StorageSnapshot {
            total_bytes: capacity_bytes,
            used_bytes,
            remaining_bytes,
            usage_percentage,
            remaining_percentage,
            average_file_size,
            total_files: documents.len(),
            tier,
            status_text: status.to_string(),
            status,
            tone: StatusTone::classify(usage_percentage),
            recent_uploads_count: recent_uploads.len(),
            recent_uploads,
            used_formatted: format_bytes(used_bytes as f64, 1),
            total_formatted: format_bytes(capacity_bytes as f64, 1),
            remaining_formatted: format_bytes(remaining_bytes as f64, 1),
            average_file_size_formatted: format_bytes(average_file_size, 1),
        }
    }
}

/// Human-readable size in base 1024, e.g. `1.5 MB`. Trailing zeros are dropped.
pub fn format_bytes(bytes: f64, decimals: usize) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if !bytes.is_finite() || bytes <= 0.0 {
        return "0 B".to_string();
    }
    let exponent = (bytes.ln() / 1024f64.ln()).floor().clamp(0.0, (UNITS.len() - 1) as f64) as usize;
    let value = bytes / 1024f64.powi(exponent as i32);
    format!("{} {}", trim_decimals(format!("{value:.decimals$}")), UNITS[exponent])
}

/// One decimal place, without a trailing `.0`.
fn format_percentage(value: f64) -> String {
    trim_decimals(format!("{value:.1}"))
}

fn trim_decimals(formatted: String) -> String {
    if !formatted.contains('.') {
        return formatted;
    }
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Convert a configured capacity in GB to bytes; negative or non-finite is 0.
pub fn gb_to_bytes(gb: f64) -> u64 {
    if !gb.is_finite() || gb <= 0.0 {
        return 0;
    }
    (gb * BYTES_PER_GB as f64).round() as u64
}
