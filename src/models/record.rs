//! Board member record model matching the site's `officers.json` entries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::boardd::identity::normalize;

/// Reserved picture filename meaning "no picture set". Never persisted.
pub const PLACEHOLDER_PICTURE: &str = "placeholder.webp";

/// Social handles attached to a board member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    /// Discord handle; the identity key of the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
    /// Handles this service does not manage, kept as stored.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Socials {
    fn is_empty(&self) -> bool {
        self.github.is_none()
            && self.linkedin.is_none()
            && self.discord.is_none()
            && self.extra.is_empty()
    }
}

/// One person's profile entry in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Socials::is_empty")]
    pub socials: Socials,
    /// Role to term, e.g. `"president": "F23"`.
    #[serde(default)]
    pub positions: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Picture filename from the previous asset layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_picture: Option<String>,
    /// Keys this service does not manage, kept as stored.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Normalized discord identity, if the record has one.
    pub fn identity(&self) -> Option<String> {
        self.socials.discord.as_deref().map(normalize)
    }
}

/// Failure to read the stored collection as a list of records.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    #[error("malformed record collection: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("record {index} has an empty fullName")]
    EmptyName { index: usize },

    #[error("records {first} and {second} share the discord identity {identity:?}")]
    DuplicateIdentity {
        identity: String,
        first: usize,
        second: usize,
    },
}

/// Where a record's JSON comes from when the collection is written back.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    /// Untouched since parsing; written back verbatim.
    Stored(Value),
    /// Replaced by an upsert; keeps the stored key order.
    Edited(Value),
    New,
}

/// Lay `fresh` over `stored`: stored keys keep their position, keys missing
/// from `fresh` are dropped and new keys are appended.
fn overlay(stored: &Value, fresh: Value) -> Value {
    match (stored, fresh) {
        (Value::Object(old), Value::Object(new)) => {
            let mut merged = Map::new();
            for (key, old_value) in old {
                if let Some(value) = new.get(key) {
                    merged.insert(key.clone(), overlay(old_value, value.clone()));
                }
            }
            for (key, value) in new {
                if !old.contains_key(&key) {
                    merged.insert(key, value);
                }
            }
            Value::Object(merged)
        }
        (_, fresh) => fresh,
    }
}

/// The ordered set of records persisted as one JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordCollection {
    records: Vec<Record>,
    sources: Vec<Source>,
}

impl RecordCollection {
    pub fn new(records: Vec<Record>) -> Self {
        let sources = vec![Source::New; records.len()];
        Self { records, sources }
    }

    /// Parse and validate the stored file content.
    ///
    /// Every entry must carry a non-empty `fullName`, and no two entries may
    /// normalize to the same discord identity.
    pub fn parse(content: &str) -> Result<Self, CollectionError> {
        let values: Vec<Value> = serde_json::from_str(content)?;
        let records = values
            .iter()
            .map(|value| Record::deserialize(value))
            .collect::<Result<Vec<Record>, _>>()?;

        let mut seen: Vec<(String, usize)> = Vec::new();
        for (index, record) in records.iter().enumerate() {
            if record.full_name.is_empty() {
                return Err(CollectionError::EmptyName { index });
            }
            let Some(identity) = record.identity() else {
                continue;
            };
            if let Some((_, first)) = seen.iter().find(|(id, _)| *id == identity) {
                return Err(CollectionError::DuplicateIdentity {
                    identity,
                    first: *first,
                    second: index,
                });
            }
            seen.push((identity, index));
        }

        let sources = values.into_iter().map(Source::Stored).collect();
        Ok(Self { records, sources })
    }

    /// Serialize with two-space indentation and a trailing newline.
    ///
    /// Records never upserted are written exactly as they were parsed.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let values = self
            .records
            .iter()
            .zip(&self.sources)
            .map(|(record, source)| match source {
                Source::Stored(value) => Ok(value.clone()),
                Source::Edited(value) => Ok(overlay(value, serde_json::to_value(record)?)),
                Source::New => serde_json::to_value(record),
            })
            .collect::<Result<Vec<Value>, serde_json::Error>>()?;

        let mut content = serde_json::to_string_pretty(&values)?;
        content.push('\n');
        Ok(content)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Index of the record whose normalized discord identity equals `identity`.
    pub fn position_of(&self, identity: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.identity().as_deref() == Some(identity))
    }

    pub fn find(&self, identity: &str) -> Option<&Record> {
        self.position_of(identity).map(|index| &self.records[index])
    }

    /// Replace the record sharing `record`'s identity, or append it.
    pub fn upsert(mut self, record: Record) -> Self {
        match record
            .identity()
            .and_then(|identity| self.position_of(&identity))
        {
            Some(index) => {
                self.records[index] = record;
                if let Source::Stored(value) = &self.sources[index] {
                    self.sources[index] = Source::Edited(value.clone());
                }
            }
            None => {
                self.records.push(record);
                self.sources.push(Source::New);
            }
        }
        self
    }
}
