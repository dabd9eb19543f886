//! Schema-aware client layer for the Moira service.
//!
//! Moira's transport offers one primitive: run a named query with a flat list
//! of string arguments and receive flat tuples of strings. This crate builds
//! the caller-facing API on top of it:
//!
//! - query schemas are discovered through the reserved `_help` query, cached
//!   per session, and dropped whenever the protocol epoch changes;
//! - arguments may be given by name and are laid out in schema order;
//! - result tuples are zipped into named records;
//! - queries run either to completion on the caller's task or on a background
//!   worker that streams rows back as they arrive.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Schema handling and execution live here; the wire
//! protocol lives behind [`protocol::Transport`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`session`] | `Client`: lifecycle, queries, access checks |
//! | [`registry`] | `SchemaRegistry`: per-session schema cache |
//! | [`resolver`] | `QueryArgs` and argument resolution |
//! | [`formatter`] | `Row` and record formatting |
//! | [`stream`] | `PendingQuery`: streaming execution |
//! | [`error_codes`] | `ErrorCodeTable` read from `mr_et.h` |
//! | [`config`] | `ClientConfig` |
//! | [`errors`] | `ClientError` |

mod access;
mod batch;
pub mod config;
pub mod error_codes;
pub mod errors;
pub mod formatter;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod stream;

#[cfg(test)]
mod test_support;

pub use config::ClientConfig;
pub use error_codes::ErrorCodeTable;
pub use errors::{ClientError, ClientResult};
pub use formatter::{format_record, Row};
pub use registry::SchemaRegistry;
pub use resolver::QueryArgs;
pub use session::{Client, ClientBuilder};
pub use stream::PendingQuery;

pub use protocol::{
    ProtocolVersion, QueryHandle, QueryRunId, QuerySchema, RawRecord, Record, Transport,
    TransportFault,
};
