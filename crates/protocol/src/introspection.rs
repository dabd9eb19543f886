//! Query schemas and the introspection grammar.
//!
//! The server describes a query through the reserved `_help` query. Its single
//! result row, joined with `", "`, reads:
//!
//! ```text
//! <handles> (<arguments>)[ => <return fields>]
//! ```
//!
//! where each group is a `", "`-separated list of names made of ASCII letters,
//! digits, underscores and spaces, for example
//! `get_user_by_login, gubl (login) => login, uid, shell`.
//!
//! Every handle in the first group is an alias for the same query and shares
//! the parsed [`QuerySchema`].

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{QueryHandle, RawRecord};

static HELP_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z0-9_, ]*) \(([a-z0-9_, ]*)\)(?: => ([a-z0-9_, ]*))?")
        .expect("introspection grammar pattern compiles")
});

/// The introspection response did not match the `_help` grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed introspection response: {response:?}")]
pub struct GrammarError {
    /// The full response text that failed to parse.
    pub response: String,
}

/// Argument and return-field names of one query.
///
/// A schema with an empty argument or return-field list is a real schema (a
/// query taking no arguments or producing no fields). Whether a schema has been
/// loaded is tracked by the registry holding it, never by list emptiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySchema {
    /// Every handle the server listed for this query.
    pub aliases: Vec<QueryHandle>,
    /// Argument names, in the order the raw primitive expects them.
    pub argument_names: Vec<String>,
    /// Return-field names, in the order values appear in each raw row.
    pub return_field_names: Vec<String>,
}

impl QuerySchema {
    /// Parses the textual description returned by the introspection query.
    ///
    /// Leading and trailing whitespace is ignored. Text following the last
    /// group is ignored, matching how the server's own tools read it.
    pub fn parse(description: &str) -> Result<Self, GrammarError> {
        let description = description.trim();
        let captures = HELP_GRAMMAR
            .captures(description)
            .ok_or_else(|| GrammarError {
                response: description.to_string(),
            })?;

        let group = |i: usize| captures.get(i).map_or("", |m| m.as_str());

        Ok(Self {
            aliases: split_names(group(1))
                .into_iter()
                .filter_map(QueryHandle::new)
                .collect(),
            argument_names: split_names(group(2)),
            return_field_names: split_names(group(3)),
        })
    }

    /// Parses an introspection result row.
    ///
    /// The server may split the description over several fields; they are
    /// re-joined with `", "` before parsing.
    pub fn parse_row(row: &RawRecord) -> Result<Self, GrammarError> {
        Self::parse(&row.fields().join(", "))
    }
}

fn split_names(group: &str) -> Vec<String> {
    group
        .split(", ")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_arguments_and_returns() {
        let schema = QuerySchema::parse("get_user, gu (login) => login, uid, gid").unwrap();

        let aliases: Vec<&str> = schema.aliases.iter().map(QueryHandle::as_str).collect();
        assert_eq!(aliases, ["get_user", "gu"]);
        assert_eq!(schema.argument_names, ["login"]);
        assert_eq!(schema.return_field_names, ["login", "uid", "gid"]);
    }

    #[test]
    fn return_group_is_optional() {
        let schema = QuerySchema::parse("add_user_to_list, autl (list, member)").unwrap();

        assert_eq!(schema.argument_names, ["list", "member"]);
        assert!(schema.return_field_names.is_empty());
    }

    #[test]
    fn empty_argument_group_yields_no_arguments() {
        let schema = QuerySchema::parse("get_all_hosts, gah () => name, vendor").unwrap();

        assert!(schema.argument_names.is_empty());
        assert_eq!(schema.return_field_names, ["name", "vendor"]);
    }

    #[test]
    fn letters_match_case_insensitively() {
        let schema = QuerySchema::parse("Get_Server, GS (Name) => Name, Type").unwrap();
        assert_eq!(schema.return_field_names, ["Name", "Type"]);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let schema = QuerySchema::parse("  gu (login) => login \n").unwrap();
        assert_eq!(schema.return_field_names, ["login"]);
    }

    #[test]
    fn missing_parentheses_is_a_grammar_error() {
        let err = QuerySchema::parse("get_user login => uid").unwrap_err();
        assert_eq!(err.response, "get_user login => uid");
    }

    #[test]
    fn punctuation_outside_the_alphabet_is_a_grammar_error() {
        assert!(QuerySchema::parse("get-user (login)").is_err());
    }

    #[test]
    fn split_row_is_rejoined_before_parsing() {
        let row = RawRecord::from(["get_user", "gu (login) => login", "uid"]);
        let schema = QuerySchema::parse_row(&row).unwrap();

        assert_eq!(schema.aliases.len(), 2);
        assert_eq!(schema.return_field_names, ["login", "uid"]);
    }
}
