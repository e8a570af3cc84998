use super::state::{DatePreset, QueryState, SizeRange};
use crate::records::DocumentRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Ordered predicate stages: text, type, folder, date, size.
///
/// Each stage only narrows what the previous one kept, and an empty facet
/// selection passes everything through.
pub struct FilterPipeline;

impl FilterPipeline {
    /// Filter against the current wall clock.
    pub fn apply<'a, I>(documents: I, query: &QueryState) -> Vec<&'a DocumentRecord>
    where
        I: IntoIterator<Item = &'a DocumentRecord>,
    {
        Self::apply_at(documents, query, Utc::now())
    }

    pub fn apply_at<'a, I>(documents: I, query: &QueryState, now: DateTime<Utc>) -> Vec<&'a DocumentRecord>
    where
        I: IntoIterator<Item = &'a DocumentRecord>,
    {
        let docs = text_stage(documents.into_iter().collect(), &query.text);
        let docs = type_stage(docs, &query.extensions);
        let docs = folder_stage(docs, &query.folders);
        let docs = date_stage(docs, query.date_preset, now);
        size_stage(docs, &query.size)
    }
}

/// Case-insensitive substring match on the display name. Surrounding spaces
/// are part of the needle; a blank term matches everything.
pub fn text_stage<'a>(docs: Vec<&'a DocumentRecord>, term: &str) -> Vec<&'a DocumentRecord> {
    if term.trim().is_empty() {
        return docs;
    }
    let needle = term.to_lowercase();
    docs.into_iter()
        .filter(|doc| doc.display_name.to_lowercase().contains(&needle))
        .collect()
}

pub fn type_stage<'a>(docs: Vec<&'a DocumentRecord>, extensions: &BTreeSet<String>) -> Vec<&'a DocumentRecord> {
    if extensions.is_empty() {
        return docs;
    }
    let wanted: BTreeSet<String> = extensions.iter().map(|ext| ext.to_lowercase()).collect();
    docs.into_iter()
        .filter(|doc| wanted.contains(&doc.extension))
        .collect()
}

pub fn folder_stage<'a>(docs: Vec<&'a DocumentRecord>, folders: &BTreeSet<String>) -> Vec<&'a DocumentRecord> {
    if folders.is_empty() {
        return docs;
    }
    docs.into_iter()
        .filter(|doc| folders.contains(&doc.folder_id))
        .collect()
}

/// Undated documents never survive an active date preset.
pub fn date_stage<'a>(
    docs: Vec<&'a DocumentRecord>,
    preset: Option<DatePreset>,
    now: DateTime<Utc>,
) -> Vec<&'a DocumentRecord> {
    let Some(preset) = preset else {
        return docs;
    };
    let cutoff = preset.cutoff(now);
    docs.into_iter()
        .filter(|doc| doc.created_at.is_some_and(|at| at >= cutoff))
        .collect()
}

/// Inclusive on whichever bound is set.
pub fn size_stage<'a>(docs: Vec<&'a DocumentRecord>, range: &SizeRange) -> Vec<&'a DocumentRecord> {
    let (min, max) = range.bounds_bytes();
    if min.is_none() && max.is_none() {
        return docs;
    }
    docs.into_iter()
        .filter(|doc| {
            min.map_or(true, |lo| doc.size_bytes >= lo) && max.map_or(true, |hi| doc.size_bytes <= hi)
        })
        .collect()
}
