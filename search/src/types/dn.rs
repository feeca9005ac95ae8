//! Normalized distinguished names.
//!
//! A `Dn` is stored in its normalized form: every RDN is `attr=value` with the
//! attribute name and value lowercased and surrounding whitespace trimmed, and
//! RDNs are joined by `,` (most specific first). This is the key of the ndn
//! index and the form the alias index stores alias targets in.
//!
//! Escaped separators inside values are not supported; full RFC 4514 parsing
//! belongs to the entry model.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A normalized distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Dn {
    /// RDNs, most specific first.
    rdns: Vec<String>,
}

impl Dn {
    /// The empty (root DSE) name.
    #[must_use]
    pub const fn root() -> Self {
        Self { rdns: Vec::new() }
    }

    /// Parse and normalize a DN string.
    ///
    /// Returns `None` if any RDN is not of the form `attr=value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use xdbm_search::types::Dn;
    /// let dn = Dn::parse("CN=Foo , ou=System").expect("valid dn");
    /// assert_eq!(dn.to_string(), "cn=foo,ou=system");
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().is_empty() {
            return Some(Self::root());
        }

        let mut rdns = Vec::new();
        for raw in s.split(',') {
            let (attr, value) = raw.split_once('=')?;
            let attr = attr.trim().to_lowercase();
            let value = normalize_rdn_value(value);
            if attr.is_empty() || value.is_empty() {
                return None;
            }
            rdns.push(format!("{attr}={value}"));
        }

        Some(Self { rdns })
    }

    /// Check if this is the root DSE name.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Number of RDNs in the name.
    #[must_use]
    pub fn rdn_count(&self) -> usize {
        self.rdns.len()
    }

    /// The most specific RDN, if any.
    #[must_use]
    pub fn rdn(&self) -> Option<&str> {
        self.rdns.first().map(String::as_str)
    }

    /// The parent name. The root DSE has no parent.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Self {
            rdns: self.rdns[1..].to_vec(),
        })
    }

    /// Check whether `self` lies strictly below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.rdns.len() > ancestor.rdns.len() && self.rdns.ends_with(&ancestor.rdns)
    }

    /// Create a child name by prepending an RDN.
    ///
    /// Returns `None` if the RDN is malformed.
    #[must_use]
    pub fn child(&self, rdn: &str) -> Option<Self> {
        let rdn = Self::parse(rdn)?;
        if rdn.rdns.len() != 1 {
            return None;
        }
        let mut rdns = rdn.rdns;
        rdns.extend(self.rdns.iter().cloned());
        Some(Self { rdns })
    }
}

/// Lowercase a value and collapse inner whitespace runs to one space.
fn normalize_rdn_value(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rdns.join(","))
    }
}

impl Serialize for Dn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid dn: '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let dn = Dn::parse(" CN = John   Smith ,OU=People, dc=Example").expect("parse");
        assert_eq!(dn.to_string(), "cn=john smith,ou=people,dc=example");
        assert_eq!(dn.rdn_count(), 3);
        assert_eq!(dn.rdn(), Some("cn=john smith"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Dn::parse("cn").is_none());
        assert!(Dn::parse("cn=foo,=bar").is_none());
        assert!(Dn::parse("cn=,ou=system").is_none());
    }

    #[test]
    fn test_empty_is_root() {
        let dn = Dn::parse("").expect("parse");
        assert!(dn.is_root());
        assert!(dn.parent().is_none());
    }

    #[test]
    fn test_parent_and_descendant() {
        let base = Dn::parse("ou=system").expect("parse");
        let child = Dn::parse("ou=users,ou=system").expect("parse");
        let grandchild = Dn::parse("cn=a,ou=users,ou=system").expect("parse");

        assert_eq!(child.parent(), Some(base.clone()));
        assert!(grandchild.is_descendant_of(&base));
        assert!(grandchild.is_descendant_of(&child));
        assert!(!base.is_descendant_of(&base));
        assert!(!base.is_descendant_of(&child));
    }

    #[test]
    fn test_child() {
        let base = Dn::parse("ou=system").expect("parse");
        let child = base.child("CN=Admin").expect("child");
        assert_eq!(child.to_string(), "cn=admin,ou=system");
        assert!(base.child("cn=a,cn=b").is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let dn = Dn::parse("cn=Foo,ou=system").expect("parse");
        let json = serde_json::to_string(&dn).expect("serialize");
        assert_eq!(json, "\"cn=foo,ou=system\"");
        let back: Dn = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, dn);
    }
}
