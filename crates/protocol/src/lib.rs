//! Core query domain for the Moira client.
//!
//! Moira is a central repository of identity and resource records (users,
//! groups, hosts, print queues and so on). Every operation against it is a
//! named query: a handle plus a flat list of string arguments, answered by
//! zero or more flat tuples of strings.
//!
//! This crate holds every value type that crosses the boundary between the
//! client layer and the transport, the introspection grammar the server uses
//! to describe a query's arguments and return fields, and the [`Transport`]
//! port trait.
//!
//! ## Architectural Layer
//!
//! **Domain types + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a transport must supply; the transport adapter defines
//! *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`QueryHandle`, `QueryRunId`) |
//! | [`types`] | Row and version types (`RawRecord`, `Record`, `ProtocolVersion`) |
//! | [`introspection`] | `QuerySchema` and the `_help` response grammar |
//! | [`errors`] | `TransportFault` |
//! | [`transport`] | The `Transport` port trait |

pub mod errors;
pub mod identifiers;
pub mod introspection;
pub mod transport;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::TransportFault;
pub use identifiers::{QueryHandle, QueryRunId};
pub use introspection::{GrammarError, QuerySchema};
pub use transport::{RowSink, Transport};
pub use types::{ProtocolVersion, RawRecord, Record};
