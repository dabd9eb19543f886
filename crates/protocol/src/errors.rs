//! Fault type signalled by the transport.
//!
//! The transport reports every failure (server-side status codes, timeouts,
//! lost connections) as a [`TransportFault`] carrying the numeric error code.
//! The client layer never interprets the code except in the access check,
//! where the "permission denied" code is mapped to `false`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An opaque fault from the raw query primitive.
///
/// Value-level validation of query arguments is the server's job; a bad value
/// comes back through this type like any other failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Moira fault {code}: {message}")]
pub struct TransportFault {
    /// Numeric error code (from the server's error table).
    pub code: i64,
    /// Human-readable description of the fault.
    pub message: String,
}

impl TransportFault {
    /// Creates a new [`TransportFault`].
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
