//! Status document as returned by the store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field holding the document URL.
pub const URL_FIELD: &str = "url";

/// Field holding the instant the URL becomes due (RFC 3339).
pub const NEXT_FETCH_DATE_FIELD: &str = "nextFetchDate";

/// A raw status document: field name to one or more string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, FieldValue>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct Document {
    fields: BTreeMap<String, Vec<String>>,
}

/// A JSON field value: either a single string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    One(String),
    Many(Vec<String>),
}

impl From<FieldValue> for Vec<String> {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::One(v) => vec![v],
            FieldValue::Many(vs) => vs,
        }
    }
}

impl From<BTreeMap<String, FieldValue>> for Document {
    fn from(raw: BTreeMap<String, FieldValue>) -> Self {
        Self {
            fields: raw.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}

impl From<Document> for BTreeMap<String, Vec<String>> {
    fn from(doc: Document) -> Self {
        doc.fields
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper appending a value to a field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_value(name, value);
        self
    }

    /// Append a value to a field, keeping earlier values first.
    pub fn add_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    /// All values of a field, if present.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    /// First value of a field.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|vs| vs.first())
            .map(String::as_str)
    }

    /// The document URL, if present and non-empty.
    pub fn url(&self) -> Option<&str> {
        self.first(URL_FIELD).filter(|u| !u.trim().is_empty())
    }

    /// Parsed due instant; `None` when absent or unparsable.
    pub fn next_fetch_date(&self) -> Option<DateTime<Utc>> {
        self.first(NEXT_FETCH_DATE_FIELD)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Iterate over fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
