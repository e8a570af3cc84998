use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Extension reported when a name has no usable suffix.
pub const UNKNOWN_EXTENSION: &str = "unknown";

/// Folder key for documents that are not filed anywhere.
pub const GENERAL_FOLDER: &str = "general";

const NAME_KEYS: &[&str] = &["name", "original_name", "originalName", "display_name", "displayName"];
const FOLDER_KEYS: &[&str] = &["folder_id", "folderId", "folder"];
const SIZE_KEYS: &[&str] = &["size_bytes", "sizeBytes", "file_size", "fileSize", "size"];
const TIME_KEYS: &[&str] = &["created_at", "createdAt", "uploaded_at", "uploadedAt"];

/// Lower-cased suffix after the last `.`, or `"unknown"`.
pub fn extension_of(display_name: &str) -> String {
    match display_name.rfind('.') {
        Some(0) | None => UNKNOWN_EXTENSION.to_string(),
        Some(dot) => {
            let ext = &display_name[dot + 1..];
            if ext.is_empty() {
                UNKNOWN_EXTENSION.to_string()
            } else {
                ext.to_lowercase()
            }
        }
    }
}

/// Record id as a string; numeric ids are stringified, anything else is empty.
pub fn id_of(raw: &Value) -> String {
    match raw.get("id").or_else(|| raw.get("_id")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// First non-blank name field, or a system-assigned `untitled-<id>`.
pub fn display_name_of(raw: &Value) -> String {
    let named = NAME_KEYS
        .iter()
        .filter_map(|key| raw.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty());
    match named {
        Some(name) => name.to_string(),
        None => fallback_name(&id_of(raw)),
    }
}

pub(crate) fn fallback_name(id: &str) -> String {
    if id.is_empty() {
        "untitled".to_string()
    } else {
        format!("untitled-{id}")
    }
}

/// Owning folder id, or `"general"` when absent or empty.
pub fn folder_key_of(raw: &Value) -> String {
    let found = FOLDER_KEYS.iter().find_map(|key| match raw.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    });
    found.unwrap_or_else(|| GENERAL_FOLDER.to_string())
}

/// Size in bytes, `0` when missing, negative or non-numeric.
pub fn size_of(raw: &Value) -> u64 {
    SIZE_KEYS
        .iter()
        .find_map(|key| raw.get(*key).filter(|v| !v.is_null()))
        .and_then(coerce_size)
        .unwrap_or(0)
}

/// `None` means the value is present but unusable.
pub(crate) fn coerce_size(value: &Value) -> Option<u64> {
    let number = match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Some(u);
            }
            n.as_f64()?
        }
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    // Negative sizes clamp to zero; fractional bytes floor.
    Some(number.max(0.0).floor() as u64)
}

/// Creation instant, or `None` for missing/unparsable timestamps.
pub fn timestamp_of(raw: &Value) -> Option<DateTime<Utc>> {
    TIME_KEYS
        .iter()
        .find_map(|key| raw.get(*key).filter(|v| !v.is_null()))
        .and_then(parse_timestamp)
}

pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

/// RFC 3339, naive date-times (taken as UTC) and bare dates.
pub fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Coarse category for an extension, used for facet labels.
pub fn category_of(extension: &str) -> &'static str {
    match extension {
        "txt" | "md" | "markdown" | "rtf" | "doc" | "docx" | "odt" | "pdf" | "pages" => "document",
        "csv" | "xls" | "xlsx" | "ods" | "numbers" => "spreadsheet",
        "ppt" | "pptx" | "odp" | "key" => "presentation",
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" | "heic" => "image",
        "mp3" | "wav" | "ogg" | "flac" | "m4a" => "audio",
        "mp4" | "webm" | "mov" | "mkv" | "avi" => "video",
        "zip" | "tar" | "gz" | "7z" | "rar" => "archive",
        _ => "other",
    }
}
