use super::extract::{self, GENERAL_FOLDER};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata for one stored document (never its bytes).
///
/// Deserializing goes through [`DocumentRecord::from_json`], so typed input
/// gets the same defaults as a fetched record. `extension` is always derived
/// from `display_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct DocumentRecord {
    pub id: String,
    pub display_name: String,
    pub extension: String,
    pub folder_id: String,
    pub size_bytes: u64,
    /// `None` when the source had no usable timestamp.
    pub created_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    /// Unfiled, empty, undated document. Use the `with_*` builders for the rest.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let id = id.into();
        let mut display_name = display_name.into().trim().to_string();
        if display_name.is_empty() {
            display_name = extract::fallback_name(&id);
        }
        Self {
            extension: extract::extension_of(&display_name),
            id,
            display_name,
            folder_id: GENERAL_FOLDER.to_string(),
            size_bytes: 0,
            created_at: None,
        }
    }

    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        let folder_id = folder_id.into();
        self.folder_id = if folder_id.trim().is_empty() {
            GENERAL_FOLDER.to_string()
        } else {
            folder_id.trim().to_string()
        };
        self
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Build from a loosely-shaped JSON record. Never fails: missing fields get
    /// their defaults, and present-but-malformed ones are reported to `diagnostics`.
    pub fn from_json(raw: &Value, diagnostics: &DiagnosticSink) -> Self {
        let id = extract::id_of(raw);
        if !raw.is_object() {
            diagnostics.emit(Diagnostic::MalformedRecord {
                id: id.clone(),
                field: "record",
                detail: format!("expected an object, got {}", kind_of(raw)),
            });
        }

        let size = first_present(raw, &["size_bytes", "sizeBytes", "file_size", "fileSize", "size"]);
        if let Some(value) = size {
            if extract::coerce_size(value).is_none() {
                diagnostics.emit(Diagnostic::MalformedRecord {
                    id: id.clone(),
                    field: "size",
                    detail: format!("unusable size {value}"),
                });
            }
        }

        let created = first_present(raw, &["created_at", "createdAt", "uploaded_at", "uploadedAt"]);
        if let Some(value) = created {
            if extract::parse_timestamp(value).is_none() {
                diagnostics.emit(Diagnostic::MalformedRecord {
                    id: id.clone(),
                    field: "created_at",
                    detail: format!("unparsable timestamp {value}"),
                });
            }
        }

        let display_name = extract::display_name_of(raw);
        Self {
            extension: extract::extension_of(&display_name),
            display_name,
            folder_id: extract::folder_key_of(raw),
            size_bytes: extract::size_of(raw),
            created_at: extract::timestamp_of(raw),
            id,
        }
    }

    /// Normalize a whole fetched collection.
    pub fn collect_json(raw: &[Value], diagnostics: &DiagnosticSink) -> Vec<Self> {
        raw.iter().map(|doc| Self::from_json(doc, diagnostics)).collect()
    }
}

impl TryFrom<Value> for DocumentRecord {
    type Error = String;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        if !raw.is_object() {
            return Err(format!("document record must be an object, got {}", kind_of(&raw)));
        }
        Ok(Self::from_json(&raw, &DiagnosticSink::log_only()))
    }
}

fn first_present<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| raw.get(*key).filter(|v| !v.is_null()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A folder as seen by the facet layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: String,
    pub display_name: String,
}

impl FolderRecord {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Returns `None` for entries without an id; they cannot be selected.
    pub fn from_json(raw: &Value, diagnostics: &DiagnosticSink) -> Option<Self> {
        let id = extract::id_of(raw);
        if id.is_empty() {
            diagnostics.emit(Diagnostic::MalformedRecord {
                id,
                field: "folder.id",
                detail: "folder without an id".to_string(),
            });
            return None;
        }
        let display_name = ["name", "display_name", "displayName"]
            .iter()
            .filter_map(|key| raw.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());
        Some(Self { id, display_name })
    }

    pub fn collect_json(raw: &[Value], diagnostics: &DiagnosticSink) -> Vec<Self> {
        raw.iter()
            .filter_map(|folder| Self::from_json(folder, diagnostics))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_normalizes_fields() {
        let sink = DiagnosticSink::log_only();
        let doc = DocumentRecord::from_json(
            &json!({
                "id": "d1",
                "original_name": "Budget.XLSX",
                "folder_id": "f9",
                "file_size": 1200,
                "created_at": "2024-01-02T00:00:00Z"
            }),
            &sink,
        );
        assert_eq!(doc.display_name, "Budget.XLSX");
        assert_eq!(doc.extension, "xlsx");
        assert_eq!(doc.folder_id, "f9");
        assert_eq!(doc.size_bytes, 1200);
        assert!(doc.created_at.is_some());
    }

    #[test]
    fn malformed_fields_degrade_and_report() {
        let (sink, mut rx) = DiagnosticSink::channel();
        let doc = DocumentRecord::from_json(
            &json!({"id": "d2", "name": "x.txt", "size": "huge", "created_at": "not a date"}),
            &sink,
        );
        assert_eq!(doc.size_bytes, 0);
        assert_eq!(doc.created_at, None);

        let mut fields = Vec::new();
        while let Ok(Diagnostic::MalformedRecord { field, .. }) = rx.try_recv() {
            fields.push(field);
        }
        assert_eq!(fields, vec!["size", "created_at"]);
    }

    #[test]
    fn non_object_record_still_yields_a_document() {
        let (sink, mut rx) = DiagnosticSink::channel();
        let doc = DocumentRecord::from_json(&json!("oops"), &sink);
        assert_eq!(doc.display_name, "untitled");
        assert_eq!(doc.folder_id, "general");
        assert!(matches!(
            rx.try_recv(),
            Ok(Diagnostic::MalformedRecord { field: "record", .. })
        ));
    }

    #[test]
    fn deserialized_records_get_extractor_defaults() {
        let doc: DocumentRecord = serde_json::from_value(json!({
            "id": "7",
            "display_name": "",
            "extension": "PDF",
            "folder_id": "",
            "size_bytes": 10
        }))
        .unwrap();
        assert_eq!(doc.display_name, "untitled-7");
        assert_eq!(doc.extension, "unknown");
        assert_eq!(doc.folder_id, "general");
        assert_eq!(doc.size_bytes, 10);

        let scan: DocumentRecord =
            serde_json::from_value(json!({"id": "8", "display_name": "Scan.PDF", "extension": "exe"})).unwrap();
        assert_eq!(scan.extension, "pdf");
        assert_eq!(scan.folder_id, "general");

        let docs = [doc, scan];
        let mut query = crate::query::QueryState::new();
        query.toggle_extension("pdf").toggle_folder("general");
        let kept = crate::query::FilterPipeline::apply(&docs, &query);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "8");
    }

    #[test]
    fn serialized_records_read_back_unchanged() {
        let doc = DocumentRecord::new("9", "Plan.docx")
            .in_folder("f2")
            .with_size(42)
            .created("2024-05-01T08:00:00Z".parse().unwrap());
        let back: DocumentRecord = serde_json::from_value(serde_json::to_value(&doc).unwrap()).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn deserializing_a_non_object_fails() {
        assert!(serde_json::from_value::<DocumentRecord>(json!([1, 2])).is_err());
    }

    #[test]
    fn builder_keeps_invariants() {
        let doc = DocumentRecord::new("7", "   ").in_folder(" ");
        assert_eq!(doc.display_name, "untitled-7");
        assert_eq!(doc.extension, "unknown");
        assert_eq!(doc.folder_id, "general");
    }

    #[test]
    fn folders_need_an_id() {
        let sink = DiagnosticSink::log_only();
        let folders = FolderRecord::collect_json(
            &[json!({"id": "f1", "name": "Taxes"}), json!({"name": "orphan"}), json!({"id": 3})],
            &sink,
        );
        assert_eq!(
            folders,
            vec![FolderRecord::new("f1", "Taxes"), FolderRecord::new("3", "3")]
        );
    }
}
