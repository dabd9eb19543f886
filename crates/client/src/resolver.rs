//! Argument resolution.
//!
//! The raw primitive only understands a flat, positional argument list. Callers
//! may instead name arguments; those are laid out in the query's schema order,
//! with the wildcard filling every argument the caller left out.

use std::collections::BTreeMap;
use std::sync::Arc;

use protocol::{QueryHandle, QuerySchema, Transport};

use crate::config::ClientConfig;
use crate::formatter::ExecutionStrategy;
use crate::registry::SchemaRegistry;
use crate::{ClientError, ClientResult};

/// Arguments for one query call, given either positionally or by name.
///
/// When any named argument is present the positional ones are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryArgs {
    positional: Vec<String>,
    named: BTreeMap<String, String>,
}

impl QueryArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional arguments, passed to the server verbatim.
    pub fn positional<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            named: BTreeMap::new(),
        }
    }

    /// Named arguments, cross-referenced against the query's argument names.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            positional: Vec::new(),
            named: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named argument.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Returns `true` if any argument was given by name.
    pub fn is_named(&self) -> bool {
        !self.named.is_empty()
    }

    /// Positional arguments in order.
    pub fn positional_args(&self) -> &[String] {
        &self.positional
    }

    /// Named arguments, sorted by name.
    pub fn named_args(&self) -> &BTreeMap<String, String> {
        &self.named
    }
}

impl From<Vec<String>> for QueryArgs {
    fn from(values: Vec<String>) -> Self {
        Self::positional(values)
    }
}

impl From<&[&str]> for QueryArgs {
    fn from(values: &[&str]) -> Self {
        Self::positional(values.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for QueryArgs {
    fn from(values: [&str; N]) -> Self {
        Self::positional(values)
    }
}

impl From<()> for QueryArgs {
    fn from(_: ()) -> Self {
        Self::new()
    }
}

/// Lays `args` out as the canonical argument list for `schema`.
///
/// Positional arguments pass through unchanged. Named arguments are placed in
/// schema order; names the caller omitted get `wildcard`.
///
/// # Errors
///
/// [`ClientError::UnknownArgumentName`] if a named argument is not one of the
/// schema's argument names. The first offending name (alphabetically) is
/// reported.
pub fn resolve(
    schema: &QuerySchema,
    handle: &QueryHandle,
    args: &QueryArgs,
    wildcard: &str,
) -> ClientResult<Vec<String>> {
    if !args.is_named() {
        return Ok(args.positional.clone());
    }

    if let Some(name) = args
        .named
        .keys()
        .find(|name| !schema.argument_names.contains(*name))
    {
        return Err(ClientError::UnknownArgumentName {
            handle: handle.clone(),
            name: name.clone(),
        });
    }

    Ok(schema
        .argument_names
        .iter()
        .map(|name| {
            args.named
                .get(name)
                .cloned()
                .unwrap_or_else(|| wildcard.to_string())
        })
        .collect())
}

/// A query ready for the raw primitive: how to shape its rows, and the
/// canonical argument list.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub strategy: ExecutionStrategy,
    pub args: Vec<String>,
}

/// Resolves arguments against the session's schema cache, loading the schema
/// on first use.
pub(crate) struct ArgumentResolver<'a> {
    pub registry: &'a SchemaRegistry,
    pub transport: &'a dyn Transport,
    pub config: &'a ClientConfig,
    pub introspection: &'a QueryHandle,
}

impl ArgumentResolver<'_> {
    /// Picks the execution strategy for `handle` and resolves `args`.
    ///
    /// Internal handles never touch the schema cache and accept positional
    /// arguments only. Every other handle has its schema loaded, even for a
    /// positional call, so rows can be formatted afterwards. When the server
    /// has no description for `handle`, a positional call fails with
    /// [`ClientError::SchemaUnavailable`] and a named call with
    /// [`ClientError::UnknownArgumentName`].
    pub(crate) async fn resolve(
        &self,
        handle: &QueryHandle,
        args: &QueryArgs,
    ) -> ClientResult<Resolved> {
        if handle.is_internal(&self.config.internal_prefix) {
            if let Some(name) = args.named.keys().next() {
                return Err(ClientError::UnknownArgumentName {
                    handle: handle.clone(),
                    name: name.clone(),
                });
            }
            return Ok(Resolved {
                strategy: ExecutionStrategy::Raw,
                args: args.positional.clone(),
            });
        }

        let schema = match self.registry.get(handle) {
            Some(schema) => schema,
            None => self
                .registry
                .load(self.transport, self.introspection, handle)
                .await
                .map_err(|e| match (e, args.named.keys().next()) {
                    // Named arguments cannot be laid out without argument names.
                    (ClientError::SchemaUnavailable { handle }, Some(name)) => {
                        ClientError::UnknownArgumentName {
                            handle,
                            name: name.clone(),
                        }
                    }
                    (e, _) => e,
                })?,
        };

        let resolved = resolve(&schema, handle, args, &self.config.wildcard)?;
        Ok(Resolved {
            strategy: ExecutionStrategy::SchemaAware(Arc::clone(&schema)),
            args: resolved,
        })
    }
}
