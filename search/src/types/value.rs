//! Normalized index values.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Dn, EntryId};

/// A normalized value as stored in an index.
///
/// Values produced by one matching rule always share a variant, so the derived
/// ordering is the rule's ordering. Comparisons across variants are consistent
/// but carry no meaning.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Normalized string (case folded or exact, per the matching rule).
    Text(String),
    /// Integer syntax value.
    Integer(i64),
    /// Entry id, used as the key of the hierarchy and alias indices.
    Id(EntryId),
}

impl Value {
    /// Create a text value.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Get the text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as the string a substring pattern matches against.
    #[must_use]
    pub fn to_match_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Id(id) => id.as_u64().to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<EntryId> for Value {
    fn from(id: EntryId) -> Self {
        Self::Id(id)
    }
}

impl From<Dn> for Value {
    fn from(dn: Dn) -> Self {
        Self::Text(dn.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_ordering() {
        assert!(Value::Integer(9) < Value::Integer(10));
        assert!(Value::text("10") < Value::text("9"));
    }

    #[test]
    fn test_match_string() {
        assert_eq!(Value::Integer(-3).to_match_string(), "-3");
        assert_eq!(Value::text("abc").to_match_string(), "abc");
        assert_eq!(Value::Id(EntryId(5)).to_match_string(), "5");
    }

    #[test]
    fn test_from_dn() {
        let dn = Dn::parse("cn=Foo").expect("parse");
        assert_eq!(Value::from(dn), Value::text("cn=foo"));
    }
}
