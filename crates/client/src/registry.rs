//! Session-scoped schema registry.
//!
//! Caches the [`QuerySchema`] of every handle this session has introspected.
//! Each handle owns a `OnceCell` holding the outcome of its introspection, so
//! concurrent callers needing the same schema wait on one in-flight
//! introspection and all receive its result, success or failure. A failed
//! cell is evicted once its outcome is known; later calls introspect afresh.
//!
//! Schemas are only valid for one protocol epoch. [`SchemaRegistry::invalidate_all`]
//! drops every entry and starts a new epoch; a load that was in flight across
//! the change still answers its own callers but does not register aliases in
//! the new epoch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use protocol::{QueryHandle, QuerySchema, Transport};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::batch::collect_raw;
use crate::{ClientError, ClientResult};

type LoadOutcome = ClientResult<Arc<QuerySchema>>;
type SchemaCell = Arc<OnceCell<LoadOutcome>>;

fn loaded(cell: &SchemaCell) -> Option<Arc<QuerySchema>> {
    cell.get().and_then(|outcome| outcome.as_ref().ok().cloned())
}

#[derive(Debug, Default)]
struct RegistryState {
    epoch: u64,
    entries: HashMap<QueryHandle, SchemaCell>,
}

/// Per-session cache of query schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    state: Mutex<RegistryState>,
}

impl SchemaRegistry {
    /// Creates an empty registry at epoch 0.
    pub fn new() -> Self {
        Self::default()
    }

    // The map holds no invariants a panicking holder could break halfway.
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached schema for `handle`, if it was loaded this epoch.
    pub fn get(&self, handle: &QueryHandle) -> Option<Arc<QuerySchema>> {
        self.lock()
            .entries
            .get(handle)
            .and_then(loaded)
    }

    /// Returns `true` if a schema for `handle` is cached this epoch.
    pub fn is_loaded(&self, handle: &QueryHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of handles with a cached schema (aliases count separately).
    pub fn len(&self) -> usize {
        self.lock()
            .entries
            .values()
            .filter(|cell| loaded(cell).is_some())
            .count()
    }

    /// Returns `true` if no schema is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current protocol epoch; bumped by every invalidation.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Drops every cached schema and starts a new epoch.
    pub fn invalidate_all(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.epoch += 1;
        debug!(epoch = state.epoch, "schema cache invalidated");
    }

    /// Returns the schema for `handle`, introspecting it through `transport`
    /// if it is not cached yet.
    ///
    /// The introspection query `introspection` is run with `handle` as its
    /// only argument. On success the schema is registered under every alias
    /// the server lists, so sibling handles never need their own round trip.
    ///
    /// # Errors
    ///
    /// - [`ClientError::SchemaUnavailable`] if the server returned no rows.
    /// - [`ClientError::SchemaParse`] if the first row does not match the
    ///   introspection grammar.
    /// - [`ClientError::Transport`] if the introspection query itself faulted.
    ///
    /// Callers that were waiting on the same in-flight introspection receive
    /// its error too. A failed load leaves nothing cached; the next call
    /// introspects again.
    pub async fn load(
        &self,
        transport: &dyn Transport,
        introspection: &QueryHandle,
        handle: &QueryHandle,
    ) -> ClientResult<Arc<QuerySchema>> {
        let (cell, epoch) = {
            let mut state = self.lock();
            let cell = Arc::clone(state.entries.entry(handle.clone()).or_default());
            (cell, state.epoch)
        };

        let outcome = cell
            .get_or_init(|| self.introspect(transport, introspection, handle, epoch))
            .await
            .clone();
        if outcome.is_err() {
            self.evict_failed(handle, &cell);
        }
        outcome
    }

    /// Removes `cell` from the map if it is still the entry for `handle`.
    fn evict_failed(&self, handle: &QueryHandle, cell: &SchemaCell) {
        let mut state = self.lock();
        if state
            .entries
            .get(handle)
            .is_some_and(|current| Arc::ptr_eq(current, cell))
        {
            state.entries.remove(handle);
        }
    }

    async fn introspect(
        &self,
        transport: &dyn Transport,
        introspection: &QueryHandle,
        handle: &QueryHandle,
        epoch: u64,
    ) -> LoadOutcome {
        debug!(handle = %handle, "introspecting query schema");

        let rows = collect_raw(transport, introspection, &[handle.to_string()]).await?;
        let first = rows.first().ok_or_else(|| ClientError::SchemaUnavailable {
            handle: handle.clone(),
        })?;
        let schema = QuerySchema::parse_row(first).map_err(|e| ClientError::SchemaParse {
            handle: handle.clone(),
            response: e.response,
        })?;

        let schema = Arc::new(schema);
        self.register_aliases(handle, &schema, epoch);
        Ok(schema)
    }

    fn register_aliases(&self, requested: &QueryHandle, schema: &Arc<QuerySchema>, epoch: u64) {
        let mut state = self.lock();
        if state.epoch != epoch {
            debug!(
                handle = %requested,
                "epoch changed during introspection, aliases not registered"
            );
            return;
        }

        for alias in schema.aliases.iter().filter(|alias| *alias != requested) {
            // An alias that is already set or mid-load keeps its own result.
            let _ = state
                .entries
                .entry(alias.clone())
                .or_default()
                .set(Ok(Arc::clone(schema)));
        }
        debug!(
            handle = %requested,
            aliases = schema.aliases.len(),
            arguments = schema.argument_names.len(),
            returns = schema.return_field_names.len(),
            "schema registered"
        );
    }
}
