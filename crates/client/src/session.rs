//! The client session.
//!
//! [`Client`] ties one [`Transport`] to one [`SchemaRegistry`] and exposes the
//! caller-facing operations: blocking and streaming queries, access checks,
//! and the session lifecycle. Cloning a `Client` is cheap and shares the
//! session; separate `Client`s never share cached schemas.

use std::sync::Arc;

use protocol::{ProtocolVersion, QueryHandle, QuerySchema, RawRecord, Transport};
use tokio::sync::OnceCell;
use tracing::instrument;

use crate::config::ClientConfig;
use crate::error_codes::ErrorCodeTable;
use crate::formatter::{format_record, Row};
use crate::registry::SchemaRegistry;
use crate::resolver::{ArgumentResolver, QueryArgs, Resolved};
use crate::stream::PendingQuery;
use crate::{access, batch, stream, ClientError, ClientResult};

struct ClientInner {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    introspection: QueryHandle,
    registry: SchemaRegistry,
    error_codes: OnceCell<Arc<ErrorCodeTable>>,
}

/// A Moira client session.
///
/// # Examples
///
/// ```rust,ignore
/// use client::{Client, QueryArgs};
///
/// let client = Client::new(transport)?;
/// client.connect("").await?;
///
/// let users = client
///     .query(&handle, QueryArgs::named([("login", "broder")]))
///     .await?;
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("epoch", &self.inner.registry.epoch())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    error_codes: Option<ErrorCodeTable>,
}

impl ClientBuilder {
    /// Replaces the default configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Supplies the error table up front instead of reading it from the
    /// configured header paths on first use.
    pub fn error_codes(mut self, table: ErrorCodeTable) -> Self {
        self.error_codes = Some(table);
        self
    }

    /// Validates the configuration and builds the client.
    pub fn build(self) -> ClientResult<Client> {
        self.config.validate()?;
        let introspection = QueryHandle::new(self.config.introspection_handle.clone())
            .ok_or_else(|| ClientError::Configuration {
                message: "'introspection_handle' must not be empty".to_string(),
            })?;

        let error_codes = match self.error_codes {
            Some(table) => OnceCell::new_with(Some(Arc::new(table))),
            None => OnceCell::new(),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                config: self.config,
                introspection,
                registry: SchemaRegistry::new(),
                error_codes,
            }),
        })
    }
}

impl Client {
    /// Starts building a client over `transport`.
    pub fn builder(transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder {
            transport,
            config: ClientConfig::default(),
            error_codes: None,
        }
    }

    /// Builds a client over `transport` with the default configuration.
    pub fn new(transport: Arc<dyn Transport>) -> ClientResult<Self> {
        Self::builder(transport).build()
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The session's schema cache.
    pub fn schemas(&self) -> &SchemaRegistry {
        &self.inner.registry
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Connects to `server` and selects the latest protocol version.
    ///
    /// An empty `server` lets the transport pick its default.
    #[instrument(skip(self))]
    pub async fn connect(&self, server: &str) -> ClientResult<()> {
        self.inner.transport.connect(server).await?;
        self.set_version(ProtocolVersion::Latest).await
    }

    /// Disconnects from the server. Cached schemas are dropped even if the
    /// transport reports a fault.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> ClientResult<()> {
        let result = self.inner.transport.disconnect().await;
        self.inner.registry.invalidate_all();
        result.map_err(ClientError::from)
    }

    /// Switches the protocol version. Argument and return-field lists may
    /// differ between versions, so cached schemas are dropped first.
    #[instrument(skip(self))]
    pub async fn set_version(&self, version: ProtocolVersion) -> ClientResult<()> {
        self.inner.registry.invalidate_all();
        Ok(self.inner.transport.set_version(version).await?)
    }

    /// Round-trips an empty request to the server.
    #[instrument(skip(self))]
    pub async fn noop(&self) -> ClientResult<()> {
        Ok(self.inner.transport.noop().await?)
    }

    /// Canonical host name of the connected server.
    #[instrument(skip(self))]
    pub async fn host(&self) -> ClientResult<String> {
        Ok(self.inner.transport.host().await?)
    }

    /// The server's message of the day, if any.
    #[instrument(skip(self))]
    pub async fn motd(&self) -> ClientResult<Option<String>> {
        Ok(self.inner.transport.motd().await?)
    }

    // -----------------------------------------------------------------------
    // Schemas and arguments
    // -----------------------------------------------------------------------

    /// Returns the schema of `handle`, introspecting it if not cached.
    #[instrument(skip_all, fields(handle = %handle))]
    pub async fn schema(&self, handle: &QueryHandle) -> ClientResult<Arc<QuerySchema>> {
        match self.inner.registry.get(handle) {
            Some(schema) => Ok(schema),
            None => {
                self.inner
                    .registry
                    .load(
                        self.inner.transport.as_ref(),
                        &self.inner.introspection,
                        handle,
                    )
                    .await
            }
        }
    }

    fn resolver(&self) -> ArgumentResolver<'_> {
        ArgumentResolver {
            registry: &self.inner.registry,
            transport: self.inner.transport.as_ref(),
            config: &self.inner.config,
            introspection: &self.inner.introspection,
        }
    }

    async fn prepare(&self, handle: &QueryHandle, args: &QueryArgs) -> ClientResult<Resolved> {
        self.resolver().resolve(handle, args).await
    }

    /// Resolves `args` into the flat argument list the server expects for
    /// `handle`, loading the schema if needed.
    #[instrument(skip_all, fields(handle = %handle))]
    pub async fn resolve_args(
        &self,
        handle: &QueryHandle,
        args: impl Into<QueryArgs>,
    ) -> ClientResult<Vec<String>> {
        Ok(self.prepare(handle, &args.into()).await?.args)
    }

    /// Formats `raw` with the cached schema of `handle`.
    ///
    /// Returns `None` if the schema has not been loaded this epoch.
    #[instrument(skip_all, fields(handle = %handle))]
    pub fn format_record<R>(&self, handle: &QueryHandle, raw: RawRecord) -> Option<R>
    where
        R: FromIterator<(String, String)>,
    {
        self.inner
            .registry
            .get(handle)
            .map(|schema| format_record(&schema, raw))
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Runs `handle` to completion and returns every row.
    ///
    /// Internal handles yield [`Row::Raw`]; all others yield
    /// [`Row::Formatted`] records. A fault returns no rows at all.
    pub async fn query(
        &self,
        handle: &QueryHandle,
        args: impl Into<QueryArgs>,
    ) -> ClientResult<Vec<Row>> {
        self.query_as(handle, args).await
    }

    /// Like [`query`](Self::query), with records shaped as `R`.
    #[instrument(skip_all, fields(handle = %handle))]
    pub async fn query_as<R>(
        &self,
        handle: &QueryHandle,
        args: impl Into<QueryArgs>,
    ) -> ClientResult<Vec<Row<R>>>
    where
        R: FromIterator<(String, String)>,
    {
        let resolved = self.prepare(handle, &args.into()).await?;
        batch::run(
            self.inner.transport.as_ref(),
            handle,
            &resolved.strategy,
            &resolved.args,
        )
        .await
    }

    /// Runs `handle` with positional `args` and returns the raw tuples,
    /// bypassing argument resolution and formatting.
    #[instrument(skip_all, fields(handle = %handle))]
    pub async fn list_query(
        &self,
        handle: &QueryHandle,
        args: &[String],
    ) -> ClientResult<Vec<RawRecord>> {
        Ok(batch::collect_raw(self.inner.transport.as_ref(), handle, args).await?)
    }

    /// Starts `handle` on a background task and returns a stream of its rows.
    ///
    /// Argument resolution (and schema loading) happens before this returns,
    /// so resolution errors surface here rather than from the stream.
    pub async fn query_stream(
        &self,
        handle: &QueryHandle,
        args: impl Into<QueryArgs>,
    ) -> ClientResult<PendingQuery> {
        self.query_stream_as(handle, args).await
    }

    /// Like [`query_stream`](Self::query_stream), with records shaped as `R`.
    #[instrument(skip_all, fields(handle = %handle))]
    pub async fn query_stream_as<R>(
        &self,
        handle: &QueryHandle,
        args: impl Into<QueryArgs>,
    ) -> ClientResult<PendingQuery<R>>
    where
        R: FromIterator<(String, String)> + Send + 'static,
    {
        let resolved = self.prepare(handle, &args.into()).await?;
        Ok(stream::start(
            Arc::clone(&self.inner.transport),
            handle.clone(),
            resolved,
        ))
    }

    /// Returns whether the current principal may run `handle` with `args`.
    ///
    /// A "permission denied" fault becomes `false`; any other fault is
    /// returned as an error.
    #[instrument(skip_all, fields(handle = %handle))]
    pub async fn can_access(
        &self,
        handle: &QueryHandle,
        args: impl Into<QueryArgs>,
    ) -> ClientResult<bool> {
        let resolved = self.prepare(handle, &args.into()).await?;
        access::can_perform(
            self.inner.transport.as_ref(),
            handle,
            &resolved.args,
            || async {
                self.error_codes()
                    .await
                    .get(&self.inner.config.permission_denied_code)
            },
        )
        .await
    }

    /// The server's error-code table, read from the configured headers on
    /// first use.
    pub async fn error_codes(&self) -> Arc<ErrorCodeTable> {
        let table = self
            .inner
            .error_codes
            .get_or_init(|| async {
                Arc::new(ErrorCodeTable::load(&self.inner.config.error_table_paths).await)
            })
            .await;
        Arc::clone(table)
    }
}
