use crate::diagnostics::{Diagnostic, DiagnosticSink, Facet};
use chrono::{DateTime, Datelike, Duration, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Fixed relative date ranges offered by the date facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatePreset {
    #[serde(rename = "last_24_hours", alias = "Last 24 hours")]
    Last24Hours,
    #[serde(rename = "last_7_days", alias = "Last 7 days")]
    Last7Days,
    #[serde(rename = "last_30_days", alias = "Last 30 days")]
    Last30Days,
    #[serde(rename = "this_year", alias = "This Year")]
    ThisYear,
}

impl DatePreset {
    pub const ALL: [DatePreset; 4] = [
        DatePreset::Last24Hours,
        DatePreset::Last7Days,
        DatePreset::Last30Days,
        DatePreset::ThisYear,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Last24Hours => "Last 24 hours",
            Self::Last7Days => "Last 7 days",
            Self::Last30Days => "Last 30 days",
            Self::ThisYear => "This Year",
        }
    }

    /// Earliest creation instant that still passes this preset.
    ///
    /// `ThisYear` starts at Jan 1 00:00 in the host's local time zone.
    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Last24Hours => now - Duration::hours(24),
            Self::Last7Days => now - Duration::days(7),
            Self::Last30Days => now - Duration::days(30),
            Self::ThisYear => {
                let year = now.with_timezone(&Local).year();
                Local
                    .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
                    .earliest()
                    .map(|local| local.with_timezone(&Utc))
                    .or_else(|| Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single())
                    .unwrap_or(now)
            }
        }
    }
}

impl fmt::Display for DatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DatePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|preset| {
                preset.label().eq_ignore_ascii_case(wanted)
                    || serde_key(preset).as_deref() == Some(wanted)
            })
            .ok_or_else(|| wanted.to_string())
    }
}

fn serde_key<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Unit the size facet bounds are expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeUnit {
    Kb,
    #[default]
    Mb,
    Gb,
}

impl SizeUnit {
    pub fn multiplier(self) -> u64 {
        match self {
            Self::Kb => 1024,
            Self::Mb => 1024 * 1024,
            Self::Gb => 1024 * 1024 * 1024,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Kb => "KB",
            Self::Mb => "MB",
            Self::Gb => "GB",
        }
    }
}

impl FromStr for SizeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KB" => Ok(Self::Kb),
            "MB" => Ok(Self::Mb),
            "GB" => Ok(Self::Gb),
            _ => Err(s.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    #[default]
    Date,
    Size,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "date" => Ok(Self::Date),
            "size" => Ok(Self::Size),
            _ => Err(s.trim().to_string()),
        }
    }
}

/// Size facet: optional inclusive bounds in `unit`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: SizeUnit,
}

impl SizeRange {
    pub fn is_active(&self) -> bool {
        self.bounds_bytes() != (None, None)
    }

    /// Bounds in whole bytes. A fractional lower bound rounds up and a
    /// fractional upper bound rounds down, so integer sizes compare exactly.
    /// Negative or non-finite bounds count as unset.
    pub fn bounds_bytes(&self) -> (Option<u64>, Option<u64>) {
        let scale = self.unit.multiplier() as f64;
        let min = self
            .min
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| (v * scale).ceil() as u64);
        let max = self
            .max
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| (v * scale).floor() as u64);
        (min, max)
    }
}

/// Caller-owned search input: text term, facet selections and sort key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    pub text: String,
    pub extensions: BTreeSet<String>,
    pub folders: BTreeSet<String>,
    pub date_preset: Option<DatePreset>,
    pub size: SizeRange,
    pub sort: SortKey,
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text term as recorded in history: surrounding whitespace removed.
    /// Matching uses `text` as typed.
    pub fn term(&self) -> &str {
        self.text.trim()
    }

    /// `false` means "no search", which is distinct from a search with no hits.
    pub fn is_active(&self) -> bool {
        !self.term().is_empty() || self.active_filter_count() > 0
    }

    /// Number of facets (types, folders, date, size) currently narrowing results.
    pub fn active_filter_count(&self) -> usize {
        [
            !self.extensions.is_empty(),
            !self.folders.is_empty(),
            self.date_preset.is_some(),
            self.size.is_active(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = text.into();
        self
    }

    /// Add the extension if absent, remove it if present.
    pub fn toggle_extension(&mut self, extension: &str) -> &mut Self {
        let ext = extension.trim().trim_start_matches('.').to_lowercase();
        if !self.extensions.remove(&ext) && !ext.is_empty() {
            self.extensions.insert(ext);
        }
        self
    }

    pub fn toggle_folder(&mut self, folder_id: &str) -> &mut Self {
        let id = folder_id.trim().to_string();
        if !self.folders.remove(&id) && !id.is_empty() {
            self.folders.insert(id);
        }
        self
    }

    pub fn set_date_preset(&mut self, preset: Option<DatePreset>) -> &mut Self {
        self.date_preset = preset;
        self
    }

    pub fn set_size_range(&mut self, min: Option<f64>, max: Option<f64>, unit: SizeUnit) -> &mut Self {
        self.size = SizeRange { min, max, unit };
        self
    }

    pub fn set_sort(&mut self, sort: SortKey) -> &mut Self {
        self.sort = sort;
        self
    }

    /// Drop every facet selection, keeping the text term and sort key.
    pub fn clear_filters(&mut self) -> &mut Self {
        self.extensions.clear();
        self.folders.clear();
        self.date_preset = None;
        self.size = SizeRange {
            unit: self.size.unit,
            ..SizeRange::default()
        };
        self
    }

    /// Resolve a loosely-typed query. Unknown labels and unusable bounds are
    /// reported and treated as "no filter" for their facet.
    pub fn resolve(raw: &RawQuery, diagnostics: &DiagnosticSink) -> Self {
        let mut state = QueryState::new();
        state.set_text(raw.text.clone());
        for ext in &raw.file_types {
            if !state.extensions.contains(&ext.trim().to_lowercase()) {
                state.toggle_extension(ext);
            }
        }
        for folder in &raw.folders {
            state.folders.insert(folder.trim().to_string());
        }
        state.folders.retain(|id| !id.is_empty());

        state.date_preset = parse_facet(&raw.date_preset, Facet::DatePreset, diagnostics);
        state.sort = parse_facet(&raw.sort_by, Facet::SortKey, diagnostics).unwrap_or_default();
        let unit = parse_facet(&raw.size_unit, Facet::SizeUnit, diagnostics).unwrap_or_default();
        let min = parse_bound(raw.min_size.as_ref(), Facet::SizeMin, diagnostics);
        let max = parse_bound(raw.max_size.as_ref(), Facet::SizeMax, diagnostics);
        state.set_size_range(min, max, unit);
        state
    }
}

fn parse_facet<T: FromStr>(raw: &Option<String>, facet: Facet, diagnostics: &DiagnosticSink) -> Option<T> {
    let value = raw.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            diagnostics.emit(Diagnostic::InvalidFacetValue {
                facet,
                value: value.to_string(),
            });
            None
        }
    }
}

fn parse_bound(raw: Option<&Value>, facet: Facet, diagnostics: &DiagnosticSink) -> Option<f64> {
    let number = match raw? {
        Value::Null => return None,
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() && n >= 0.0 => Some(n),
        _ => {
            diagnostics.emit(Diagnostic::InvalidFacetValue {
                facet,
                value: raw.map(Value::to_string).unwrap_or_default(),
            });
            None
        }
    }
}

/// Query as a UI layer hands it over: labels as strings, bounds as whatever
/// the input box produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawQuery {
    #[serde(alias = "query")]
    pub text: String,
    pub file_types: Vec<String>,
    pub folders: Vec<String>,
    pub date_preset: Option<String>,
    pub min_size: Option<Value>,
    pub max_size: Option<Value>,
    pub size_unit: Option<String>,
    pub sort_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_query_is_inactive() {
        let mut q = QueryState::new();
        assert!(!q.is_active());
        q.set_text("   ");
        assert!(!q.is_active());
        q.toggle_extension("PDF");
        assert!(q.is_active());
        assert_eq!(q.active_filter_count(), 1);
    }

    #[test]
    fn toggles_flip_membership() {
        let mut q = QueryState::new();
        q.toggle_extension(".Docx").toggle_folder("f1");
        assert!(q.extensions.contains("docx"));
        q.toggle_extension("docx").toggle_folder("f1");
        assert!(q.extensions.is_empty());
        assert!(q.folders.is_empty());
    }

    #[test]
    fn size_bounds_in_bytes() {
        let range = SizeRange {
            min: Some(1.5),
            max: Some(2.0),
            unit: SizeUnit::Kb,
        };
        assert_eq!(range.bounds_bytes(), (Some(1536), Some(2048)));

        let bad = SizeRange {
            min: Some(-1.0),
            max: Some(f64::NAN),
            unit: SizeUnit::Gb,
        };
        assert!(!bad.is_active());
    }

    #[test]
    fn preset_labels_parse() {
        assert_eq!("Last 7 days".parse::<DatePreset>(), Ok(DatePreset::Last7Days));
        assert_eq!("this year".parse::<DatePreset>(), Ok(DatePreset::ThisYear));
        assert_eq!("last_24_hours".parse::<DatePreset>(), Ok(DatePreset::Last24Hours));
        assert!("Last decade".parse::<DatePreset>().is_err());
    }

    #[test]
    fn cutoffs_relative_to_now() {
        let now = Utc::now();
        assert_eq!(DatePreset::Last24Hours.cutoff(now), now - Duration::hours(24));
        assert_eq!(DatePreset::Last30Days.cutoff(now), now - Duration::days(30));
        let year_start = DatePreset::ThisYear.cutoff(now);
        assert!(year_start <= now);
        assert!(now - year_start <= Duration::days(367));
    }

    #[test]
    fn clear_filters_keeps_text_and_sort() {
        let mut q = QueryState::new();
        q.set_text("tax")
            .toggle_extension("pdf")
            .set_date_preset(Some(DatePreset::ThisYear))
            .set_size_range(Some(1.0), None, SizeUnit::Gb)
            .set_sort(SortKey::Size)
            .clear_filters();
        assert_eq!(q.active_filter_count(), 0);
        assert_eq!(q.text, "tax");
        assert_eq!(q.sort, SortKey::Size);
        assert_eq!(q.size.unit, SizeUnit::Gb);
    }

    #[test]
    fn resolve_reports_invalid_facets() {
        let raw: RawQuery = serde_json::from_value(json!({
            "query": "report",
            "fileTypes": ["PDF", "pdf"],
            "folders": ["f1", " "],
            "datePreset": "Last decade",
            "minSize": "",
            "maxSize": -4,
            "sizeUnit": "TB",
            "sortBy": "Name"
        }))
        .unwrap();
        let (sink, mut rx) = DiagnosticSink::channel();
        let q = QueryState::resolve(&raw, &sink);

        assert_eq!(q.text, "report");
        assert_eq!(q.extensions.len(), 1);
        assert_eq!(q.folders.len(), 1);
        assert_eq!(q.date_preset, None);
        assert_eq!(q.sort, SortKey::Name);
        assert_eq!(q.size.unit, SizeUnit::Mb);
        assert!(!q.size.is_active());

        let mut facets = Vec::new();
        while let Ok(Diagnostic::InvalidFacetValue { facet, .. }) = rx.try_recv() {
            facets.push(facet);
        }
        assert_eq!(facets, vec![Facet::DatePreset, Facet::SizeUnit, Facet::SizeMax]);
    }
}
