use super::state::SortKey;
use crate::records::DocumentRecord;
use std::cmp::Ordering;

/// Stable ordering of filter output. Ties keep their input order.
pub struct Sorter;

impl Sorter {
    pub fn sort(documents: &mut [&DocumentRecord], key: SortKey) {
        match key {
            SortKey::Name => documents.sort_by(|a, b| compare_names(&a.display_name, &b.display_name)),
            SortKey::Date => documents.sort_by(|a, b| newest_first(a, b)),
            SortKey::Size => documents.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes)),
        }
    }

    pub fn sorted<'a>(mut documents: Vec<&'a DocumentRecord>, key: SortKey) -> Vec<&'a DocumentRecord> {
        Self::sort(&mut documents, key);
        documents
    }
}

/// Case-folded comparison; exact text breaks folded ties.
///
/// This is not a locale collation. Folded names compare by code point, so
/// accented letters sort after `z` ("éclair" lands after "zebra").
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

/// Undated documents sink to the end.
fn newest_first(a: &DocumentRecord, b: &DocumentRecord) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn names(docs: &[&DocumentRecord]) -> Vec<String> {
        docs.iter().map(|d| d.display_name.clone()).collect()
    }

    #[test]
    fn name_sort_ignores_case() {
        let docs = [
            DocumentRecord::new("1", "banana.txt"),
            DocumentRecord::new("2", "Apple.txt"),
            DocumentRecord::new("3", "cherry.txt"),
        ];
        let out = Sorter::sorted(docs.iter().collect(), SortKey::Name);
        assert_eq!(names(&out), vec!["Apple.txt", "banana.txt", "cherry.txt"]);
    }

    #[test]
    fn folded_ties_and_non_ascii_order() {
        assert_eq!(compare_names("Apple", "apple"), Ordering::Less);
        assert_eq!(compare_names("apple", "apple"), Ordering::Equal);
        assert_eq!(compare_names("zebra", "éclair"), Ordering::Less);
        assert_eq!(compare_names("Éclair", "éclair"), Ordering::Less);
    }

    #[test]
    fn date_sort_newest_first_unknown_last() {
        let now = Utc::now();
        let docs = [
            DocumentRecord::new("1", "undated.txt"),
            DocumentRecord::new("2", "old.txt").created(now - Duration::days(9)),
            DocumentRecord::new("3", "new.txt").created(now),
        ];
        let out = Sorter::sorted(docs.iter().collect(), SortKey::Date);
        assert_eq!(names(&out), vec!["new.txt", "old.txt", "undated.txt"]);
    }

    #[test]
    fn size_sort_is_stable() {
        let docs = [
            DocumentRecord::new("1", "a").with_size(10),
            DocumentRecord::new("2", "b").with_size(99),
            DocumentRecord::new("3", "c").with_size(10),
            DocumentRecord::new("4", "d").with_size(10),
        ];
        let out = Sorter::sorted(docs.iter().collect(), SortKey::Size);
        assert_eq!(names(&out), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn equal_dates_keep_input_order() {
        let at = Utc::now();
        let docs = [
            DocumentRecord::new("1", "first").created(at),
            DocumentRecord::new("2", "second").created(at),
            DocumentRecord::new("3", "third"),
            DocumentRecord::new("4", "fourth"),
        ];
        let out = Sorter::sorted(docs.iter().collect(), SortKey::Date);
        assert_eq!(names(&out), vec!["first", "second", "third", "fourth"]);
    }
}
