//! Newtype identifiers.
//!
//! A query handle and a query run are both "just" a string and a UUID under
//! the hood; wrapping them keeps a handle from being passed where an argument
//! value is expected and vice versa.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Query handles
// ---------------------------------------------------------------------------

/// Name of a remote query (e.g. `"get_user_by_login"`, `"gubl"`, `"_help"`).
///
/// Handles beginning with the internal prefix (`_` by default) name bookkeeping
/// queries such as introspection; those are always executed raw.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueryHandle(String);

impl QueryHandle {
    /// Creates a new handle, returning `None` if the value is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Returns the handle as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this handle names an internal query, i.e. starts
    /// with `prefix`.
    pub fn is_internal(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl std::fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for QueryHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Query runs
// ---------------------------------------------------------------------------

/// Identifies one streaming query execution.
///
/// Generated fresh for every started stream and recorded on the worker's span
/// so all events for one run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryRunId(Uuid);

impl QueryRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for QueryRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
