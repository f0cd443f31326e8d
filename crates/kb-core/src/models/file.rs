use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Id reported for a queued file that has not been uploaded yet.
pub const UNSAVED_FILE_ID: i64 = -1;

/// A persisted attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    pub id: i64,
    pub filename: String,
}

impl FileRef {
    pub fn new(id: i64, filename: impl Into<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
        }
    }

    /// Filename used when the server reports none.
    pub fn fallback_filename(id: i64) -> String {
        format!("file-{}", id)
    }
}

/// File list attached to a record, as sent in the `fileID` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesPayload {
    #[serde(rename = "fileRefs", default)]
    pub file_refs: Vec<FileRef>,
}

impl FilesPayload {
    pub fn ids(&self) -> Vec<i64> {
        self.file_refs.iter().map(|f| f.id).collect()
    }
}

/// One `fileID` entry as returned by the server. Entries are loosely typed: bare
/// numbers, numeric strings, or objects naming the id under one of several keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileGroup {
    #[serde(rename = "fileRefs", default)]
    pub file_refs: Vec<Value>,
}

const ID_KEYS: [&str; 4] = ["id", "fileId", "file_id", "fileID"];

/// Numeric file id of a loosely typed reference, if any.
pub fn file_id_of(entry: &Value) -> Option<i64> {
    match entry {
        Value::Object(map) => ID_KEYS
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(scalar_id),
        other => scalar_id(other),
    }
}

fn scalar_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Display projection of a persisted attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewItem {
    pub id: i64,
    pub url: String,
    pub filename: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "sizeBytes", default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// A local file queued for upload. Identified only by its position in the queue.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl PendingFile {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl std::fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Upload acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSaved {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_ids_from_loose_entries() {
        assert_eq!(file_id_of(&json!(10)), Some(10));
        assert_eq!(file_id_of(&json!("20")), Some(20));
        assert_eq!(file_id_of(&json!({ "id": 30, "filename": "a.pdf" })), Some(30));
        assert_eq!(file_id_of(&json!({ "fileId": "40" })), Some(40));
        assert_eq!(file_id_of(&json!({ "file_id": 50 })), Some(50));
        assert_eq!(file_id_of(&json!({ "fileID": 60.0 })), Some(60));
    }

    #[test]
    fn non_numeric_entries_are_dropped() {
        assert_eq!(file_id_of(&json!("abc")), None);
        assert_eq!(file_id_of(&json!({ "name": "x" })), None);
        assert_eq!(file_id_of(&json!(1.5)), None);
        assert_eq!(file_id_of(&Value::Null), None);
    }

    #[test]
    fn pending_file_debug_hides_bytes() {
        let file = PendingFile::new("notes.txt", vec![1, 2, 3]).with_content_type("text/plain");
        let rendered = format!("{:?}", file);
        assert!(rendered.contains("notes.txt"));
        assert!(rendered.contains("len: 3"));
    }
}
