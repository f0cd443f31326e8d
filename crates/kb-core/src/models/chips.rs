//! Tag and URI chip lists.
//!
//! The backend returns chips either as one group (`{"tags": [...]}`) or as an array
//! of groups (`[{"tags": [...]}, ...]`), or not at all. `ChipList` resolves the shape
//! once, on the JSON value kind, and each variant flattens on its own.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// A group of chip values under a named field.
pub trait ChipGroup {
    fn values(&self) -> &[String];
    fn from_values(values: Vec<String>) -> Self;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ChipGroup for TagGroup {
    fn values(&self) -> &[String] {
        &self.tags
    }

    fn from_values(tags: Vec<String>) -> Self {
        Self { tags }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriGroup {
    #[serde(default)]
    pub uris: Vec<String>,
}

impl ChipGroup for UriGroup {
    fn values(&self) -> &[String] {
        &self.uris
    }

    fn from_values(uris: Vec<String>) -> Self {
        Self { uris }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChipList<G> {
    Empty,
    Single(G),
    Many(Vec<G>),
}

impl<G> Default for ChipList<G> {
    fn default() -> Self {
        ChipList::Empty
    }
}

impl<G: ChipGroup> ChipList<G> {
    /// Flat list of distinct, non-blank values in first-seen order.
    pub fn normalize(&self) -> Vec<String> {
        match self {
            ChipList::Empty => Vec::new(),
            ChipList::Single(group) => dedup(group.values().iter()),
            ChipList::Many(groups) => dedup(groups.iter().flat_map(|g| g.values().iter())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalize().is_empty()
    }
}

impl<G: ChipGroup> From<Vec<String>> for ChipList<G> {
    fn from(values: Vec<String>) -> Self {
        ChipList::Single(G::from_values(dedup(values.iter())))
    }
}

impl<G: DeserializeOwned> ChipList<G> {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Null => Ok(ChipList::Empty),
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<G>, _>>()
                .map(ChipList::Many),
            Value::Object(_) => serde_json::from_value(value).map(ChipList::Single),
            other => Err(de::Error::custom(format!(
                "expected chip group, array of groups or null, found {}",
                other
            ))),
        }
    }
}

impl<'de, G: DeserializeOwned> Deserialize<'de> for ChipList<G> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ChipList::from_value(value).map_err(de::Error::custom)
    }
}

/// Distinct trimmed, non-empty values in first-seen order.
pub fn dedup<'a>(values: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(v.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(value: Value) -> Vec<String> {
        serde_json::from_value::<ChipList<TagGroup>>(value)
            .unwrap()
            .normalize()
    }

    #[test]
    fn normalizes_every_shape() {
        assert_eq!(tags(json!({ "tags": ["a", "b"] })), vec!["a", "b"]);
        assert_eq!(
            tags(json!([{ "tags": ["c"] }, { "tags": ["d", "e"] }])),
            vec!["c", "d", "e"]
        );
        assert!(tags(Value::Null).is_empty());
    }

    #[test]
    fn normalization_deduplicates() {
        assert_eq!(
            tags(json!([{ "tags": ["rust", " rust "] }, { "tags": ["", "web", "rust"] }])),
            vec!["rust", "web"]
        );
    }

    #[test]
    fn group_without_field_is_empty() {
        assert!(tags(json!({})).is_empty());
        assert!(tags(json!([])).is_empty());
    }

    #[test]
    fn scalar_is_rejected() {
        assert!(serde_json::from_value::<ChipList<UriGroup>>(json!("https://x")).is_err());
    }

    #[test]
    fn serializes_single_group() {
        let list: ChipList<UriGroup> = vec!["https://a".to_string(), "https://a".to_string()].into();
        assert_eq!(serde_json::to_value(&list).unwrap(), json!({ "uris": ["https://a"] }));
        let empty: ChipList<UriGroup> = ChipList::default();
        assert_eq!(serde_json::to_value(&empty).unwrap(), Value::Null);
    }
}
