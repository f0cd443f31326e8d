//! Record mapping: incoming records to form state, form state to request bodies.
//!
//! Everything here is pure. No network, no storage.

use chrono::{DateTime, NaiveDateTime};

use crate::error::{KbError, KbResult};
use crate::models::{
    ChipList, FilesPayload, Record, RecordForm, RecordRequest, TagGroup, TimeEntries, UriGroup,
};

/// Display format of time-entry fields.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";
/// Transport format of time-entry fields.
pub const TRANSPORT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const TRANSPORT_INPUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

pub fn normalize_tags(record: &Record) -> Vec<String> {
    record.tags.normalize()
}

pub fn normalize_uris(record: &Record) -> Vec<String> {
    record.uris.normalize()
}

fn parse_transport(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    TRANSPORT_INPUTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Parse a transport date-time (ISO-8601, with or without offset).
pub fn parse_transport_date(value: &str) -> Option<NaiveDateTime> {
    parse_transport(value.trim())
}

/// Transport value to display value. Missing values render empty; values that do
/// not parse are shown as-is.
pub fn to_display_date(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return String::new();
    };
    match parse_transport(raw) {
        Some(dt) => dt.format(DISPLAY_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

/// Display value to transport value. Blank input means "no value"; ISO input is
/// accepted unchanged in normalised form.
pub fn to_transport_date(value: &str) -> KbResult<Option<String>> {
    let raw = value.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(&unmask(raw), DISPLAY_FORMAT)
        .ok()
        .or_else(|| parse_transport(raw))
        .map(|dt| Some(dt.format(TRANSPORT_FORMAT).to_string()))
        .ok_or_else(|| KbError::Validation(format!("Invalid date: {}", raw)))
}

/// Masked inputs keep only the digits (`ddmmyyyyHHMM`); restore the separators.
fn unmask(raw: &str) -> String {
    if raw.len() == 12 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!(
            "{}/{}/{} {}:{}",
            &raw[0..2],
            &raw[2..4],
            &raw[4..8],
            &raw[8..10],
            &raw[10..12]
        )
    } else {
        raw.to_string()
    }
}

fn map_times(
    times: &TimeEntries,
    f: impl Fn(Option<&str>) -> KbResult<Option<String>>,
) -> KbResult<TimeEntries> {
    Ok(TimeEntries {
        morning_in: f(times.morning_in.as_deref())?,
        morning_out: f(times.morning_out.as_deref())?,
        afternoon_in: f(times.afternoon_in.as_deref())?,
        afternoon_out: f(times.afternoon_out.as_deref())?,
        night_in: f(times.night_in.as_deref())?,
        night_out: f(times.night_out.as_deref())?,
    })
}

impl RecordForm {
    /// Form state for editing `record`.
    pub fn from_record(record: &Record) -> Self {
        let display = |v: Option<&str>| -> KbResult<Option<String>> {
            Ok(Some(to_display_date(v)).filter(|s| !s.is_empty()))
        };
        Self {
            id: record.id,
            name: record.name.clone(),
            category: record.category.clone(),
            subcategory: record.subcategory.clone(),
            description: record.description.clone().unwrap_or_default(),
            tags: normalize_tags(record),
            uris: normalize_uris(record),
            times: map_times(&record.times, display).unwrap_or_default(),
        }
    }
}

/// Assemble the create/update body from form values, chip lists and the reconciled
/// file list.
pub fn build_request(
    form: &RecordForm,
    tags: &[String],
    uris: &[String],
    files: FilesPayload,
) -> KbResult<RecordRequest> {
    let transport = |v: Option<&str>| match v {
        Some(v) => to_transport_date(v),
        None => Ok(None),
    };
    let tags = match ChipList::<TagGroup>::from(tags.to_vec()) {
        ChipList::Single(group) => group,
        _ => TagGroup::default(),
    };
    let uris = match ChipList::<UriGroup>::from(uris.to_vec()) {
        ChipList::Single(group) => group,
        _ => UriGroup::default(),
    };

    Ok(RecordRequest {
        id: form.id,
        name: form.name.trim().to_string(),
        category: form.category.clone(),
        subcategory: form.subcategory.clone(),
        description: form.description.clone(),
        tags,
        uris,
        files: vec![files],
        times: map_times(&form.times, transport)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileRef;
    use serde_json::json;

    #[test]
    fn display_date_round_trip_formats() {
        assert_eq!(to_display_date(Some("2024-05-01T08:30:00")), "01/05/2024 08:30");
        assert_eq!(to_display_date(Some("2024-05-01T08:30:00.000Z")), "01/05/2024 08:30");
        assert_eq!(to_display_date(None), "");
        assert_eq!(to_display_date(Some("  ")), "");
        assert_eq!(to_display_date(Some("yesterday")), "yesterday");
    }

    #[test]
    fn transport_date_accepts_display_mask_and_iso() {
        assert_eq!(
            to_transport_date("01/05/2024 08:30").unwrap().as_deref(),
            Some("2024-05-01T08:30:00")
        );
        assert_eq!(
            to_transport_date("010520240830").unwrap().as_deref(),
            Some("2024-05-01T08:30:00")
        );
        assert_eq!(
            to_transport_date("2024-05-01T08:30").unwrap().as_deref(),
            Some("2024-05-01T08:30:00")
        );
        assert_eq!(to_transport_date("").unwrap(), None);
    }

    #[test]
    fn transport_date_rejects_garbage() {
        let err = to_transport_date("32/13/2024 99:99").unwrap_err();
        assert!(matches!(err, KbError::Validation(_)));
    }

    #[test]
    fn form_from_record_normalizes_chips_and_dates() {
        let record: Record = serde_json::from_value(json!({
            "id": 3,
            "name": "Standup",
            "tag": [{ "tags": ["a"] }, { "tags": ["b", "a"] }],
            "uri": null,
            "dataEntradaTarde": "2024-05-01T13:00:00"
        }))
        .unwrap();

        let form = RecordForm::from_record(&record);
        assert_eq!(form.id, Some(3));
        assert_eq!(form.tags, vec!["a", "b"]);
        assert!(form.uris.is_empty());
        assert_eq!(form.description, "");
        assert_eq!(form.times.afternoon_in.as_deref(), Some("01/05/2024 13:00"));
        assert_eq!(form.times.morning_in, None);
    }

    #[test]
    fn build_request_wire_shape() {
        let form = RecordForm {
            id: Some(9),
            name: " Release ".into(),
            category: Some("dev".into()),
            description: "<p>done</p>".into(),
            times: TimeEntries {
                morning_in: Some("01/05/2024 08:00".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let files = FilesPayload {
            file_refs: vec![FileRef::new(20, "b.png")],
        };

        let request = build_request(
            &form,
            &["x".into(), "x".into(), "y".into()],
            &["https://a".into()],
            files,
        )
        .unwrap();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["id"], json!(9));
        assert_eq!(body["name"], json!("Release"));
        assert_eq!(body["categoria"], json!("dev"));
        assert_eq!(body["tag"], json!({ "tags": ["x", "y"] }));
        assert_eq!(body["uri"], json!({ "uris": ["https://a"] }));
        assert_eq!(body["fileID"], json!([{ "fileRefs": [{ "id": 20, "filename": "b.png" }] }]));
        assert_eq!(body["dataEntradaManha"], json!("2024-05-01T08:00:00"));
        assert!(body.get("dataSaidaManha").is_none());
    }

    #[test]
    fn build_request_without_chips_sends_empty_groups() {
        let form = RecordForm {
            name: "x".into(),
            ..Default::default()
        };
        let request = build_request(&form, &[], &[], FilesPayload::default()).unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["tag"], json!({ "tags": [] }));
        assert!(body.get("id").is_none());
    }
}
