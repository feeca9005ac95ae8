//! Directory entries.

use std::collections::BTreeMap;

use super::Dn;

/// A materialized directory entry.
///
/// Attribute values are kept as the raw strings the entry was created with and
/// are keyed by attribute-type OID, so lookups never depend on which alias of
/// an attribute name a filter used. Normalization happens at match time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The entry's normalized name.
    pub dn: Dn,
    /// Attribute OID -> raw values.
    attributes: BTreeMap<String, Vec<String>>,
}

impl Entry {
    /// Create an entry with no attributes.
    #[must_use]
    pub const fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: BTreeMap::new(),
        }
    }

    /// Add a value for an attribute OID.
    pub fn add(&mut self, oid: impl Into<String>, value: impl Into<String>) {
        self.attributes.entry(oid.into()).or_default().push(value.into());
    }

    /// Builder-style `add`.
    #[must_use]
    pub fn with(mut self, oid: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(oid, value);
        self
    }

    /// Get the values of an attribute OID, if present.
    #[must_use]
    pub fn get(&self, oid: &str) -> Option<&[String]> {
        self.attributes
            .get(oid)
            .filter(|values| !values.is_empty())
            .map(Vec::as_slice)
    }

    /// Check if the entry carries at least one value of the attribute.
    #[must_use]
    pub fn contains(&self, oid: &str) -> bool {
        self.get(oid).is_some()
    }

    /// Iterate over `(oid, values)` pairs.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.attributes
            .iter()
            .map(|(oid, values)| (oid.as_str(), values.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_values() {
        let dn = Dn::parse("cn=foo,ou=system").expect("parse");
        let entry = Entry::new(dn).with("2.5.4.3", "foo").with("2.5.4.3", "Foo Bar");

        assert_eq!(
            entry.get("2.5.4.3"),
            Some(&["foo".to_owned(), "Foo Bar".to_owned()][..])
        );
        assert!(entry.contains("2.5.4.3"));
        assert!(!entry.contains("2.5.4.4"));
        assert_eq!(entry.attributes().count(), 1);
    }
}
