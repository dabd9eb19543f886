//! Result shaping.
//!
//! Every executed query follows one of two strategies, picked by handle
//! prefix: internal queries hand back their raw tuples untouched, everything
//! else is zipped against the cached return-field names.

use std::sync::Arc;

use protocol::{QuerySchema, RawRecord, Record};

/// One result row as handed to the caller.
///
/// `R` is the record shape for schema-aware queries; it defaults to
/// [`Record`] but any `FromIterator<(String, String)>` container works, e.g.
/// `HashMap<String, String>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row<R = Record> {
    /// Row of an internal query, exactly as the transport produced it.
    Raw(RawRecord),
    /// Row of a schema-aware query, keyed by return-field name.
    Formatted(R),
}

impl<R> Row<R> {
    /// Returns the formatted record, or `None` for a raw row.
    pub fn into_formatted(self) -> Option<R> {
        match self {
            Self::Formatted(record) => Some(record),
            Self::Raw(_) => None,
        }
    }

    /// Returns the raw tuple, or `None` for a formatted row.
    pub fn into_raw(self) -> Option<RawRecord> {
        match self {
            Self::Raw(raw) => Some(raw),
            Self::Formatted(_) => None,
        }
    }

    /// Borrows the formatted record, if any.
    pub fn as_formatted(&self) -> Option<&R> {
        match self {
            Self::Formatted(record) => Some(record),
            Self::Raw(_) => None,
        }
    }
}

/// How rows of one query are shaped.
#[derive(Debug, Clone)]
pub(crate) enum ExecutionStrategy {
    /// Internal handle: no schema, rows pass through.
    Raw,
    /// Regular handle: rows are zipped against the schema's return fields.
    SchemaAware(Arc<QuerySchema>),
}

impl ExecutionStrategy {
    pub(crate) fn shape<R>(&self, raw: RawRecord) -> Row<R>
    where
        R: FromIterator<(String, String)>,
    {
        match self {
            Self::Raw => Row::Raw(raw),
            Self::SchemaAware(schema) => Row::Formatted(format_record(schema, raw)),
        }
    }
}

/// Zips `raw` against `schema`'s return-field names.
///
/// The shorter of the two sequences wins: trailing values without a field
/// name are dropped, and trailing field names without a value are omitted.
pub fn format_record<R>(schema: &QuerySchema, raw: RawRecord) -> R
where
    R: FromIterator<(String, String)>,
{
    schema
        .return_field_names
        .iter()
        .cloned()
        .zip(raw)
        .collect()
}
