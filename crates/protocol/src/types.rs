//! Row and version value types.
//!
//! A [`RawRecord`] is exactly what the transport emits for one result row.
//! A [`Record`] is the same row after it has been zipped against the query's
//! return-field names.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// One unformatted result row: an ordered tuple of strings of any length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRecord(Vec<String>);

impl RawRecord {
    /// Creates a [`RawRecord`] from its field values.
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    /// Returns the field values in arrival order.
    pub fn fields(&self) -> &[String] {
        &self.0
    }

    /// Consumes the record, returning the field values.
    pub fn into_fields(self) -> Vec<String> {
        self.0
    }

    /// Number of values in the row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the row carries no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for RawRecord {
    fn from(fields: Vec<String>) -> Self {
        Self(fields)
    }
}

impl<const N: usize> From<[&str; N]> for RawRecord {
    fn from(fields: [&str; N]) -> Self {
        Self(fields.iter().map(|f| (*f).to_string()).collect())
    }
}

impl FromIterator<String> for RawRecord {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for RawRecord {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Formatted rows
// ---------------------------------------------------------------------------

/// A result row keyed by return-field name.
///
/// Keeps the server's field order, so iterating a [`Record`] yields names in
/// the same order as the query's return-field list. Serialises as a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(Vec<(String, String)>);

impl Record {
    /// Returns the value for `name`, if the row carries that field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates `(name, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Number of fields in the row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Query protocol version requested from the server.
///
/// Query argument and return-field lists may differ between versions, so any
/// change of version invalidates cached schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVersion {
    /// The newest version the server supports.
    Latest,
    /// A specific version number, sent to the server as given.
    Specific(i32),
}

impl ProtocolVersion {
    /// Returns the value sent on the wire; `-1` selects the latest version.
    pub fn as_wire(self) -> i32 {
        match self {
            Self::Latest => -1,
            Self::Specific(v) => v,
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Specific(v) => write!(f, "{v}"),
        }
    }
}
