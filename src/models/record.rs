use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of OpenStreetMap element a record was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl fmt::Display for OsmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OsmType::Node => "node",
            OsmType::Way => "way",
            OsmType::Relation => "relation",
        };
        write!(f, "{s}")
    }
}

/// Error returned when an `osm_type` cell holds an unknown value.
#[derive(Debug, Error)]
#[error("unknown osm_type: {0:?}")]
pub struct ParseOsmTypeError(String);

impl FromStr for OsmType {
    type Err = ParseOsmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "node" => Ok(OsmType::Node),
            "way" => Ok(OsmType::Way),
            "relation" => Ok(OsmType::Relation),
            other => Err(ParseOsmTypeError(other.to_string())),
        }
    }
}

/// Set of tag keys treated as record metadata and never scored as
/// predictable tags.
///
/// The exclusion set is data, not code: which keys count as metadata depends
/// on how the dataset was extracted, so callers can supply their own set.
///
/// # Examples
///
/// ```
/// use tagbench::IgnoredKeys;
///
/// let ignored = IgnoredKeys::default();
/// assert!(ignored.contains("osm_id"));
/// assert!(ignored.contains("amenity"));
/// assert!(!ignored.contains("cuisine"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredKeys(HashSet<String>);

impl IgnoredKeys {
    /// Creates an exclusion set from the given keys.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    /// Returns true if `key` is a metadata key.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    /// Adds a key to the exclusion set.
    pub fn insert(&mut self, key: impl Into<String>) {
        self.0.insert(key.into());
    }
}

impl Default for IgnoredKeys {
    /// The standard exclusion set: `name`, `amenity`, `osm_id`, `osm_type`.
    fn default() -> Self {
        Self::new(["name", "amenity", "osm_id", "osm_type"])
    }
}

/// One point-of-interest record with its ground-truth tags.
///
/// Only tags that are actually present in the source data appear in `tags`;
/// an empty cell in the input file is a missing tag, never an empty string.
/// Tag keys are unique per record by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub osm_type: OsmType,
    pub osm_id: i64,
    pub name: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl Record {
    /// Creates a record with no tags.
    pub fn new(osm_type: OsmType, osm_id: i64, name: Option<String>) -> Self {
        Self {
            osm_type,
            osm_id,
            name,
            tags: BTreeMap::new(),
        }
    }

    /// Returns the record's name with surrounding whitespace stripped,
    /// or `None` when the name is missing or blank.
    pub fn trimmed_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Returns true if the record carries a value for `key`.
    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    /// Returns the value stored for `key`, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Inserts a tag, replacing any previous value for the same key.
    pub fn insert_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Counts the present tags that are not metadata keys.
    pub fn ground_truth_count(&self, ignored: &IgnoredKeys) -> usize {
        self.tags.keys().filter(|k| !ignored.contains(k)).count()
    }

    /// Returns the present non-metadata tag keys, optionally excluding one
    /// key that was revealed as a hint.
    ///
    /// The hint exclusion exists because a revealed key must not be credited
    /// back to the engine as a prediction.
    pub fn ground_truth_keys<'a>(
        &'a self,
        ignored: &'a IgnoredKeys,
        exclude: Option<&'a str>,
    ) -> impl Iterator<Item = &'a str> {
        self.tags
            .keys()
            .map(String::as_str)
            .filter(move |k| !ignored.contains(k) && Some(*k) != exclude)
    }
}

/// A record paired with the single tag key revealed to the engine as a hint.
///
/// `hint_tag` is empty when the record has no qualifying tag to reveal; such
/// records are excluded from hint-protocol scoring downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedRecord {
    record: Record,
    hint_tag: String,
}

impl CuratedRecord {
    /// Pairs a record with a hint key. Pass an empty string when no tag
    /// qualifies.
    pub fn new(record: Record, hint_tag: impl Into<String>) -> Self {
        Self {
            record,
            hint_tag: hint_tag.into(),
        }
    }

    /// Wraps a record that has not been through hint selection yet.
    pub fn without_hint(record: Record) -> Self {
        Self::new(record, "")
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn hint_tag(&self) -> &str {
        &self.hint_tag
    }

    /// Returns the hint key, or `None` when it is empty or blank.
    pub fn hint(&self) -> Option<&str> {
        let hint = self.hint_tag.trim();
        (!hint.is_empty()).then_some(hint)
    }

    /// Replaces the hint key.
    pub fn set_hint(&mut self, hint_tag: impl Into<String>) {
        self.hint_tag = hint_tag.into();
    }
}
