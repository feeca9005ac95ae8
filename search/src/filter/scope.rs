//! Search scope and alias dereferencing modes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::EntryId;

/// How far below the base a search reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// The base entry only.
    Object,
    /// Direct children of the base.
    OneLevel,
    /// The base and all its descendants.
    Subtree,
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "base"),
            Self::OneLevel => write!(f, "one"),
            Self::Subtree => write!(f, "sub"),
        }
    }
}

/// When aliases are dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasDerefMode {
    /// Aliases are returned as ordinary entries.
    NeverDerefAliases,
    /// Aliases below the base are replaced by their targets.
    DerefInSearching,
    /// Only an alias at the base is replaced by its target.
    DerefFindingBase,
    /// Both of the above.
    #[default]
    DerefAlways,
}

impl AliasDerefMode {
    /// Whether an alias at the base is followed.
    #[must_use]
    pub const fn is_deref_finding_base(self) -> bool {
        matches!(self, Self::DerefFindingBase | Self::DerefAlways)
    }

    /// Whether aliases inside the scope are followed.
    #[must_use]
    pub const fn is_deref_in_searching(self) -> bool {
        matches!(self, Self::DerefInSearching | Self::DerefAlways)
    }
}

impl fmt::Display for AliasDerefMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeverDerefAliases => write!(f, "never"),
            Self::DerefInSearching => write!(f, "searching"),
            Self::DerefFindingBase => write!(f, "finding"),
            Self::DerefAlways => write!(f, "always"),
        }
    }
}

/// The scope node synthesized by the search engine: restricts candidates to
/// the scope of an already resolved base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeAssertion {
    /// Id of the effective base entry.
    pub base: EntryId,
    /// Requested scope.
    pub scope: SearchScope,
    /// Alias dereferencing mode of the request.
    pub deref: AliasDerefMode,
}

impl ScopeAssertion {
    /// Create a scope assertion.
    #[must_use]
    pub const fn new(base: EntryId, scope: SearchScope, deref: AliasDerefMode) -> Self {
        Self { base, scope, deref }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deref_flags() {
        assert!(!AliasDerefMode::NeverDerefAliases.is_deref_finding_base());
        assert!(!AliasDerefMode::NeverDerefAliases.is_deref_in_searching());
        assert!(AliasDerefMode::DerefFindingBase.is_deref_finding_base());
        assert!(!AliasDerefMode::DerefFindingBase.is_deref_in_searching());
        assert!(!AliasDerefMode::DerefInSearching.is_deref_finding_base());
        assert!(AliasDerefMode::DerefInSearching.is_deref_in_searching());
        assert!(AliasDerefMode::DerefAlways.is_deref_finding_base());
        assert!(AliasDerefMode::DerefAlways.is_deref_in_searching());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SearchScope::OneLevel).expect("serialize");
        assert_eq!(json, "\"one_level\"");
        let mode: AliasDerefMode =
            serde_json::from_str("\"deref_in_searching\"").expect("deserialize");
        assert_eq!(mode, AliasDerefMode::DerefInSearching);
    }
}
