//! Client configuration.
//!
//! Every field has a default matching a stock Moira installation, so
//! `ClientConfig::default()` is the normal starting point. Configuration can
//! also be read from JSON; missing fields fall back to their defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ClientError, ClientResult};

/// Tunables for a [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Handle of the reserved query that describes other queries.
    pub introspection_handle: String,

    /// Handles starting with this prefix are executed raw, bypassing schema
    /// lookup and record formatting.
    pub internal_prefix: String,

    /// Value sent for a named argument the caller left out.
    pub wildcard: String,

    /// Error-table name of the code that means "permission denied".
    pub permission_denied_code: String,

    /// C headers the error table is read from, in order.
    pub error_table_paths: Vec<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            introspection_handle: "_help".to_string(),
            internal_prefix: "_".to_string(),
            wildcard: "*".to_string(),
            permission_denied_code: "MR_PERM".to_string(),
            error_table_paths: vec![
                PathBuf::from("/usr/include/moira/mr_et.h"),
                PathBuf::from("/sw/include/moira/mr_et.h"),
            ],
        }
    }
}

impl ClientConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> ClientResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ClientError::Configuration {
            message: format!("invalid client configuration: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the client relies on.
    ///
    /// The introspection handle must itself be internal, otherwise loading a
    /// schema would require loading the introspection query's schema first.
    pub fn validate(&self) -> ClientResult<()> {
        for (field, value) in [
            ("introspection_handle", &self.introspection_handle),
            ("internal_prefix", &self.internal_prefix),
            ("wildcard", &self.wildcard),
            ("permission_denied_code", &self.permission_denied_code),
        ] {
            if value.is_empty() {
                return Err(ClientError::Configuration {
                    message: format!("'{field}' must not be empty"),
                });
            }
        }

        if !self.introspection_handle.starts_with(&self.internal_prefix) {
            return Err(ClientError::Configuration {
                message: format!(
                    "introspection handle '{}' must start with the internal prefix '{}'",
                    self.introspection_handle, self.internal_prefix
                ),
            });
        }

        Ok(())
    }
}
