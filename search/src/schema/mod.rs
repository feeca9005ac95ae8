//! Schema interface consumed by the search subsystem.
//!
//! The evaluators only need three things from the schema:
//! - attribute-type lookup by name or OID
//! - the matching rules (and so the normalizers) of an attribute type
//! - the attribute-type hierarchy, to test substring assertions against
//!   subtypes of the asserted attribute
//!
//! `Schema` is an in-memory registry with a small bootstrap set of standard
//! attribute types; a full schema manager plugs in through `SchemaManager`.

mod matching;
mod registry;

use std::sync::Arc;

pub use matching::MatchingRule;
pub use registry::Schema;

use crate::types::Value;

/// Well-known attribute-type OIDs the store and engine refer to directly.
pub mod oids {
    /// `objectClass`.
    pub const OBJECT_CLASS: &str = "2.5.4.0";
    /// `aliasedObjectName`.
    pub const ALIASED_OBJECT_NAME: &str = "2.5.4.1";
    /// `name`, the superior of most naming attributes.
    pub const NAME: &str = "2.5.4.41";
    /// `cn`.
    pub const CN: &str = "2.5.4.3";
    /// `sn`.
    pub const SN: &str = "2.5.4.4";
    /// `ou`.
    pub const OU: &str = "2.5.4.11";
    /// `o`.
    pub const O: &str = "2.5.4.10";
    /// `dc`.
    pub const DC: &str = "0.9.2342.19200300.100.1.25";
    /// `uid`.
    pub const UID: &str = "0.9.2342.19200300.100.1.1";
    /// `mail`.
    pub const MAIL: &str = "0.9.2342.19200300.100.1.3";
    /// `description`.
    pub const DESCRIPTION: &str = "2.5.4.13";
    /// `uidNumber`.
    pub const UID_NUMBER: &str = "1.3.6.1.1.1.1.0";
    /// `gidNumber`.
    pub const GID_NUMBER: &str = "1.3.6.1.1.1.1.1";
}

/// An attribute type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    /// Numeric OID, the canonical identifier.
    pub oid: String,
    /// Names, first one is the primary name.
    pub names: Vec<String>,
    /// OID of the superior attribute type.
    pub superior: Option<String>,
    /// Equality matching rule.
    pub equality: Option<MatchingRule>,
    /// Ordering matching rule.
    pub ordering: Option<MatchingRule>,
    /// Substring matching rule.
    pub substring: Option<MatchingRule>,
}

impl AttributeType {
    /// Create an attribute type with no matching rules.
    #[must_use]
    pub fn new(oid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            names: vec![name.into()],
            superior: None,
            equality: None,
            ordering: None,
            substring: None,
        }
    }

    /// Set the superior attribute type.
    #[must_use]
    pub fn with_superior(mut self, oid: impl Into<String>) -> Self {
        self.superior = Some(oid.into());
        self
    }

    /// Set the equality matching rule.
    #[must_use]
    pub const fn with_equality(mut self, rule: MatchingRule) -> Self {
        self.equality = Some(rule);
        self
    }

    /// Set the ordering matching rule.
    #[must_use]
    pub const fn with_ordering(mut self, rule: MatchingRule) -> Self {
        self.ordering = Some(rule);
        self
    }

    /// Set the substring matching rule.
    #[must_use]
    pub const fn with_substring(mut self, rule: MatchingRule) -> Self {
        self.substring = Some(rule);
        self
    }

    /// The primary name, or the OID when the type is unnamed.
    #[must_use]
    pub fn name(&self) -> &str {
        self.names.first().map_or(self.oid.as_str(), String::as_str)
    }

    /// Normalize a raw value the way the attribute's indices store it.
    ///
    /// Uses the equality rule; an attribute without one keeps values verbatim.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> Option<Value> {
        self.equality
            .map_or_else(|| Some(Value::text(raw)), |rule| rule.normalize(raw))
    }

    /// Normalize a raw value for ordering comparisons.
    ///
    /// Falls back to the equality rule when no ordering rule is defined.
    #[must_use]
    pub fn normalize_ordering(&self, raw: &str) -> Option<Value> {
        match self.ordering {
            Some(rule) => rule.normalize(raw),
            None => self.normalize(raw),
        }
    }

    /// Normalize a raw value for substring matching.
    ///
    /// Tries the substring rule, then the equality rule, then leaves the value
    /// untouched.
    #[must_use]
    pub fn normalize_substring(&self, raw: &str) -> String {
        self.substring
            .or(self.equality)
            .and_then(|rule| rule.normalize(raw))
            .map_or_else(|| raw.to_owned(), |value| value.to_match_string())
    }
}

/// Schema lookups needed by the optimizer, evaluators and cursors.
pub trait SchemaManager: Send + Sync {
    /// Resolve an attribute type by name (case-insensitive) or OID.
    fn lookup(&self, name_or_oid: &str) -> Result<Arc<AttributeType>, SchemaError>;

    /// All transitive subtypes of an attribute type, excluding itself.
    fn descendants(&self, attribute_type: &AttributeType) -> Vec<Arc<AttributeType>>;
}

/// Errors returned by schema lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No attribute type with this name or OID.
    UnknownAttributeType(String),
    /// An attribute type was registered twice.
    DuplicateAttributeType(String),
    /// A registered attribute type names a superior that does not exist.
    UnknownSuperior { attribute: String, superior: String },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttributeType(name) => write!(f, "unknown attribute type: {name}"),
            Self::DuplicateAttributeType(name) => {
                write!(f, "attribute type already registered: {name}")
            }
            Self::UnknownSuperior {
                attribute,
                superior,
            } => write!(f, "attribute type {attribute} has unknown superior {superior}"),
        }
    }
}

impl std::error::Error for SchemaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_without_equality_keeps_value() {
        let at = AttributeType::new("1.2.3", "raw");
        assert_eq!(at.normalize("  MiXed "), Some(Value::text("  MiXed ")));
        assert_eq!(at.normalize_substring("  MiXed "), "  MiXed ");
    }

    #[test]
    fn test_normalize_substring_falls_back_to_equality() {
        let at = AttributeType::new("1.2.3", "x").with_equality(MatchingRule::CaseIgnoreMatch);
        assert_eq!(at.normalize_substring("Foo  Bar"), "foo bar");
    }

    #[test]
    fn test_normalize_ordering_falls_back_to_equality() {
        let at = AttributeType::new("1.2.3", "n").with_equality(MatchingRule::IntegerMatch);
        assert_eq!(at.normalize_ordering(" 42 "), Some(Value::Integer(42)));
        assert_eq!(at.normalize_ordering("x"), None);
    }

    #[test]
    fn test_name_defaults_to_oid() {
        let mut at = AttributeType::new("1.2.3", "x");
        at.names.clear();
        assert_eq!(at.name(), "1.2.3");
    }

    #[test]
    fn test_schema_error_display() {
        let error = SchemaError::UnknownAttributeType("foo".to_owned());
        assert_eq!(error.to_string(), "unknown attribute type: foo");
    }
}
