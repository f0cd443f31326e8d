use serde::{Deserialize, Serialize};
use validator::Validate;

use super::chips::{ChipList, TagGroup, UriGroup};
use super::file::{file_id_of, FileGroup, FileRef, FilesPayload};

/// Default page size of the record listing.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Morning, afternoon and night clock-in/clock-out pairs of a timesheet entry.
///
/// Values travel as ISO-8601 local date-times (`2024-05-01T08:00:00`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntries {
    #[serde(rename = "dataEntradaManha", default, skip_serializing_if = "Option::is_none")]
    pub morning_in: Option<String>,
    #[serde(rename = "dataSaidaManha", default, skip_serializing_if = "Option::is_none")]
    pub morning_out: Option<String>,
    #[serde(rename = "dataEntradaTarde", default, skip_serializing_if = "Option::is_none")]
    pub afternoon_in: Option<String>,
    #[serde(rename = "dataSaidaTarde", default, skip_serializing_if = "Option::is_none")]
    pub afternoon_out: Option<String>,
    #[serde(rename = "dataEntradaNoite", default, skip_serializing_if = "Option::is_none")]
    pub night_in: Option<String>,
    #[serde(rename = "dataSaidaNoite", default, skip_serializing_if = "Option::is_none")]
    pub night_out: Option<String>,
}

impl TimeEntries {
    /// The three (entry, exit) pairs in day order.
    pub fn pairs(&self) -> [(Option<&str>, Option<&str>); 3] {
        [
            (self.morning_in.as_deref(), self.morning_out.as_deref()),
            (self.afternoon_in.as_deref(), self.afternoon_out.as_deref()),
            (self.night_in.as_deref(), self.night_out.as_deref()),
        ]
    }
}

/// An activity ("link") as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "categoria", default)]
    pub category: Option<String>,
    #[serde(rename = "subCategoria", default)]
    pub subcategory: Option<String>,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "tag", default)]
    pub tags: ChipList<TagGroup>,
    #[serde(rename = "uri", default)]
    pub uris: ChipList<UriGroup>,
    #[serde(rename = "fileID", default)]
    pub files: Vec<FileGroup>,
    #[serde(flatten)]
    pub times: TimeEntries,
}

impl Record {
    /// Attachment ids across every `fileID` group, first occurrence wins.
    pub fn file_ids(&self) -> Vec<i64> {
        self.file_refs().into_iter().map(|f| f.id).collect()
    }

    /// Attachments with their filenames when the server reported them.
    pub fn file_refs(&self) -> Vec<FileRef> {
        let mut refs: Vec<FileRef> = Vec::new();
        for entry in self.files.iter().flat_map(|g| g.file_refs.iter()) {
            let Some(id) = file_id_of(entry) else {
                continue;
            };
            if refs.iter().any(|r| r.id == id) {
                continue;
            }
            let filename = entry
                .get("filename")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| FileRef::fallback_filename(id));
            refs.push(FileRef { id, filename });
        }
        refs
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Current values of the edit form. Dates are in display format (`dd/mm/yyyy HH:MM`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RecordForm {
    pub id: Option<i64>,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub uris: Vec<String>,
    pub times: TimeEntries,
}

/// Body of `POST /api/atividades` and `PUT /api/atividades/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "categoria")]
    pub category: Option<String>,
    #[serde(rename = "subCategoria")]
    pub subcategory: Option<String>,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "tag")]
    pub tags: TagGroup,
    #[serde(rename = "uri")]
    pub uris: UriGroup,
    #[serde(rename = "fileID")]
    pub files: Vec<FilesPayload>,
    #[serde(flatten)]
    pub times: TimeEntries,
}

/// Filters of `GET /api/atividades`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub category: String,
    pub tag: String,
    pub exclusions: Vec<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 0,
            limit: DEFAULT_PAGE_SIZE,
            category: String::new(),
            tag: String::new(),
            exclusions: Vec::new(),
        }
    }
}

impl ListQuery {
    /// Query pairs; `excessao` repeats once per excluded category.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("categoria", self.category.clone()),
            ("tag", self.tag.clone()),
        ];
        pairs.extend(self.exclusions.iter().map(|e| ("excessao", e.clone())));
        pairs
    }
}

/// One page of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkPage {
    #[serde(alias = "atividades", default)]
    pub links: Vec<Record>,
    #[serde(default)]
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_from_server_shape() {
        let record: Record = serde_json::from_value(json!({
            "id": 7,
            "name": "Deploy notes",
            "categoria": "Timesheet",
            "subCategoria": "Dev",
            "descricao": "<p>hi</p>",
            "tag": [{ "tags": ["ops"] }, { "tags": ["deploy", "ops"] }],
            "uri": { "uris": ["https://example.com"] },
            "fileID": [{ "fileRefs": [{ "id": 10, "filename": "a.pdf" }, { "id": 20 }, "x"] }],
            "dataEntradaManha": "2024-05-01T08:00:00"
        }))
        .unwrap();

        assert_eq!(record.id, Some(7));
        assert_eq!(record.category.as_deref(), Some("Timesheet"));
        assert_eq!(record.tags.normalize(), vec!["ops", "deploy"]);
        assert_eq!(record.uris.normalize(), vec!["https://example.com"]);
        assert_eq!(record.file_ids(), vec![10, 20]);
        assert_eq!(record.file_refs()[1].filename, "file-20");
        assert_eq!(record.times.morning_in.as_deref(), Some("2024-05-01T08:00:00"));
        assert!(record.is_persisted());
    }

    #[test]
    fn record_without_optional_fields() {
        let record: Record = serde_json::from_value(json!({ "name": "x", "tag": null })).unwrap();
        assert!(record.tags.is_empty());
        assert!(record.file_ids().is_empty());
        assert!(!record.is_persisted());
    }

    #[test]
    fn list_query_repeats_exclusions() {
        let query = ListQuery {
            category: "dev".into(),
            exclusions: vec!["timesheet".into(), "old".into()],
            ..Default::default()
        };
        let pairs = query.to_pairs();
        assert_eq!(pairs[0], ("page", "0".to_string()));
        assert_eq!(pairs[1], ("limit", "10".to_string()));
        assert_eq!(pairs.iter().filter(|(k, _)| *k == "excessao").count(), 2);
    }

    #[test]
    fn link_page_accepts_either_key() {
        let page: LinkPage = serde_json::from_value(json!({ "atividades": [{ "name": "a" }], "total": 1 })).unwrap();
        assert_eq!(page.links.len(), 1);
        let page: LinkPage = serde_json::from_value(json!({ "links": [], "total": 0 })).unwrap();
        assert_eq!(page.total, 0);
    }
}
