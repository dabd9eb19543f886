//! Error type for client operations.
//!
//! [`ClientError`] covers every failure surfaced by the session: schema
//! discovery, argument resolution, transport faults and stream termination.
//! Nothing here is retried automatically; retries are the caller's decision.

use protocol::{QueryHandle, TransportFault};
use thiserror::Error;

/// Errors returned by [`crate::Client`] operations.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The introspection query returned no description for the handle.
    #[error("No schema available for query '{handle}'")]
    SchemaUnavailable {
        /// The handle that was introspected.
        handle: QueryHandle,
    },

    /// The introspection response did not match the expected grammar.
    ///
    /// Fatal for the call that triggered the load; never retried.
    #[error("Malformed schema for query '{handle}': {response:?}")]
    SchemaParse {
        /// The handle that was introspected.
        handle: QueryHandle,
        /// The response text that failed to parse.
        response: String,
    },

    /// A named argument is not among the query's argument names, or no
    /// schema could be found to resolve named arguments against.
    #[error("Unknown argument '{name}' for query '{handle}'")]
    UnknownArgumentName {
        /// The query being resolved.
        handle: QueryHandle,
        /// The offending argument name.
        name: String,
    },

    /// The transport reported a fault.
    #[error(transparent)]
    Transport(#[from] TransportFault),

    /// A streaming worker stopped without delivering its end-of-stream marker.
    ///
    /// Happens only if the worker task panicked or was aborted by the runtime.
    #[error("Stream for query '{handle}' ended without completing")]
    StreamInterrupted {
        /// The query whose worker stopped.
        handle: QueryHandle,
    },

    /// The client configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl ClientError {
    /// Returns the transport fault code, if this error wraps one.
    pub fn fault_code(&self) -> Option<i64> {
        match self {
            Self::Transport(fault) => Some(fault.code),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
