//! The transport port trait.
//!
//! The transport owns the connection, authentication, and the wire exchange
//! with the Moira server. The client layer only ever talks to it through
//! [`Transport`], so the wire protocol can be swapped (or faked in tests)
//! without touching schema handling or execution.

use std::ops::ControlFlow;

use async_trait::async_trait;

use crate::{ProtocolVersion, QueryHandle, RawRecord, TransportFault};

/// Receives result rows from [`Transport::raw_query`], one call per row, in
/// arrival order.
///
/// Returning [`ControlFlow::Break`] asks the transport to stop delivering rows
/// for this query. The transport must not call the sink again afterwards and
/// should complete the call as soon as the wire protocol allows.
pub type RowSink<'a> = dyn FnMut(RawRecord) -> ControlFlow<()> + Send + 'a;

/// The raw query primitive and session lifecycle of a Moira connection.
///
/// Implementations must be shareable across tasks; one transport may serve a
/// blocking query and several streaming workers at the same time.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a session with `server`. An empty string selects the default
    /// server from the environment.
    async fn connect(&self, server: &str) -> Result<(), TransportFault>;

    /// Closes the active session.
    async fn disconnect(&self) -> Result<(), TransportFault>;

    /// Selects the query protocol version for the active session.
    async fn set_version(&self, version: ProtocolVersion) -> Result<(), TransportFault>;

    /// Executes `handle` with `args`, passing every result row to `sink`.
    ///
    /// Returns once the server reports completion or a fault. Rows delivered
    /// before a fault stay delivered.
    async fn raw_query(
        &self,
        handle: &QueryHandle,
        args: &[String],
        sink: &mut RowSink<'_>,
    ) -> Result<(), TransportFault>;

    /// Asks the server whether the current principal may run `handle` with
    /// `args`, without running it. Denial is reported as a fault.
    async fn raw_access_check(
        &self,
        handle: &QueryHandle,
        args: &[String],
    ) -> Result<(), TransportFault>;

    /// Round-trips an empty request.
    async fn noop(&self) -> Result<(), TransportFault>;

    /// Returns the canonical host name of the connected server.
    async fn host(&self) -> Result<String, TransportFault>;

    /// Returns the server's message of the day, if one is set.
    async fn motd(&self) -> Result<Option<String>, TransportFault>;
}
