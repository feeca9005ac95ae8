//! Search configuration module.
//!
//! This module provides configuration loading for the `xdbm-search` binary
//! from environment variables.
//!
//! # Environment Variables
//!
//! - `XDBM_DATA_FILE`: JSON directory dump to search (required)
//! - `XDBM_SEARCH_BASE`: Base entry of the search (default: the dump's suffix)
//! - `XDBM_SEARCH_SCOPE`: `base`, `one` or `sub` (default: `sub`)
//! - `XDBM_DEREF_ALIASES`: `never`, `searching`, `finding` or `always`
//!   (default: `always`)
//! - `XDBM_FILTER`: JSON filter (default: presence of `objectClass`)
//!
//! # Invariants
//!
//! - `search_base`, when set, is a well-formed distinguished name
//! - `filter` carries no scan counts; the engine annotates it per search

use std::path::PathBuf;

use crate::filter::{AliasDerefMode, FilterNode, SearchScope};
use crate::types::Dn;

/// Search configuration.
///
/// # Pre-conditions
///
/// When constructed via `from_env()`:
/// - `XDBM_DATA_FILE` must be set
/// - All values that are set must be valid for their respective types
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Directory dump to load.
    pub data_file: PathBuf,
    /// Base entry. `None` means the dump's suffix.
    pub search_base: Option<Dn>,
    pub scope: SearchScope,
    pub deref_aliases: AliasDerefMode,
    pub filter: FilterNode,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl SearchConfig {
    /// Default search scope.
    pub const DEFAULT_SCOPE: SearchScope = SearchScope::Subtree;
    /// Default alias dereferencing mode.
    pub const DEFAULT_DEREF_ALIASES: AliasDerefMode = AliasDerefMode::DerefAlways;
    /// Attribute whose presence the default filter asserts.
    pub const DEFAULT_FILTER_ATTRIBUTE: &'static str = "objectClass";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `XDBM_DATA_FILE` is not set or is empty
    /// - Any other variable is set but cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            data_file: load_data_file(lookup("XDBM_DATA_FILE"))?,
            search_base: load_search_base(lookup("XDBM_SEARCH_BASE"))?,
            scope: load_scope(lookup("XDBM_SEARCH_SCOPE"))?,
            deref_aliases: load_deref_aliases(lookup("XDBM_DEREF_ALIASES"))?,
            filter: load_filter(lookup("XDBM_FILTER"))?,
        })
    }
}

fn invalid(name: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_owned(),
        message,
    }
}

/// Load the dump path.
///
/// # Errors
///
/// Returns an error if the variable is not set or is empty.
fn load_data_file(value: Option<String>) -> Result<PathBuf, ConfigError> {
    let path = value.ok_or_else(|| ConfigError::MissingEnvVar("XDBM_DATA_FILE".to_owned()))?;
    if path.is_empty() {
        return Err(invalid("XDBM_DATA_FILE", "must not be empty".to_owned()));
    }
    Ok(PathBuf::from(path))
}

fn load_search_base(value: Option<String>) -> Result<Option<Dn>, ConfigError> {
    value
        .map(|raw| {
            Dn::parse(&raw).ok_or_else(|| {
                invalid("XDBM_SEARCH_BASE", format!("'{raw}' is not a distinguished name"))
            })
        })
        .transpose()
}

/// Load the scope. Returns the default if not set.
fn load_scope(value: Option<String>) -> Result<SearchScope, ConfigError> {
    let Some(raw) = value else {
        return Ok(SearchConfig::DEFAULT_SCOPE);
    };
    match raw.to_ascii_lowercase().as_str() {
        "base" => Ok(SearchScope::Object),
        "one" => Ok(SearchScope::OneLevel),
        "sub" => Ok(SearchScope::Subtree),
        _ => Err(invalid(
            "XDBM_SEARCH_SCOPE",
            format!("'{raw}' is not one of base, one, sub"),
        )),
    }
}

/// Load the dereferencing mode. Returns the default if not set.
fn load_deref_aliases(value: Option<String>) -> Result<AliasDerefMode, ConfigError> {
    let Some(raw) = value else {
        return Ok(SearchConfig::DEFAULT_DEREF_ALIASES);
    };
    match raw.to_ascii_lowercase().as_str() {
        "never" => Ok(AliasDerefMode::NeverDerefAliases),
        "searching" => Ok(AliasDerefMode::DerefInSearching),
        "finding" => Ok(AliasDerefMode::DerefFindingBase),
        "always" => Ok(AliasDerefMode::DerefAlways),
        _ => Err(invalid(
            "XDBM_DEREF_ALIASES",
            format!("'{raw}' is not one of never, searching, finding, always"),
        )),
    }
}

/// Load the filter. Returns presence of `objectClass` if not set.
fn load_filter(value: Option<String>) -> Result<FilterNode, ConfigError> {
    match value {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| invalid("XDBM_FILTER", format!("not a filter: {e}"))),
        None => Ok(FilterNode::presence(SearchConfig::DEFAULT_FILTER_ATTRIBUTE)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SearchConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        SearchConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("XDBM_DATA_FILE", "dump.json")]).expect("config");
        assert_eq!(config.data_file, PathBuf::from("dump.json"));
        assert_eq!(config.search_base, None);
        assert_eq!(config.scope, SearchScope::Subtree);
        assert_eq!(config.deref_aliases, AliasDerefMode::DerefAlways);
        assert_eq!(config.filter, FilterNode::presence("objectClass"));
    }

    #[test]
    fn test_all_values() {
        let config = load(&[
            ("XDBM_DATA_FILE", "dump.json"),
            ("XDBM_SEARCH_BASE", "OU=Users, ou=System"),
            ("XDBM_SEARCH_SCOPE", "one"),
            ("XDBM_DEREF_ALIASES", "Finding"),
            ("XDBM_FILTER", r#"{"equality": {"attribute": "cn", "value": "foo"}}"#),
        ])
        .expect("config");
        assert_eq!(config.search_base, Dn::parse("ou=users,ou=system"));
        assert_eq!(config.scope, SearchScope::OneLevel);
        assert_eq!(config.deref_aliases, AliasDerefMode::DerefFindingBase);
        assert_eq!(config.filter, FilterNode::equality("cn", "foo"));
    }

    #[test]
    fn test_missing_data_file() {
        assert_eq!(
            load(&[]).map(|_| ()),
            Err(ConfigError::MissingEnvVar("XDBM_DATA_FILE".to_owned()))
        );
        assert!(matches!(
            load(&[("XDBM_DATA_FILE", "")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [
            ("XDBM_SEARCH_SCOPE", "children"),
            ("XDBM_DEREF_ALIASES", "sometimes"),
            ("XDBM_FILTER", "(cn=foo)"),
            ("XDBM_SEARCH_BASE", "not a dn"),
        ] {
            let result = load(&[("XDBM_DATA_FILE", "dump.json"), (name, value)]);
            match result {
                Err(ConfigError::InvalidValue { name: reported, .. }) => assert_eq!(reported, name),
                other => panic!("expected invalid {name}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::MissingEnvVar("TEST_VAR".to_owned());
        assert_eq!(
            error.to_string(),
            "missing required environment variable: TEST_VAR"
        );
        let error = ConfigError::InvalidValue {
            name: "TEST_VAR".to_owned(),
            message: "bad value".to_owned(),
        };
        assert_eq!(error.to_string(), "invalid value for TEST_VAR: bad value");
    }
}
