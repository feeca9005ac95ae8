//! In-memory attribute-type registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::{AttributeType, MatchingRule, SchemaError, SchemaManager, oids};

/// An in-memory schema holding attribute types.
///
/// # Invariants
///
/// - Every registered type's superior is registered before it.
/// - Matching rules a subtype leaves unset are inherited from its superior at
///   registration time.
#[derive(Debug, Default)]
pub struct Schema {
    /// OID -> attribute type.
    by_oid: HashMap<String, Arc<AttributeType>>,
    /// Lowercased name -> OID.
    by_name: HashMap<String, String>,
}

impl Schema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema holding the standard attribute types used by
    /// directory entries: naming attributes, `objectClass`,
    /// `aliasedObjectName` and a few integer-syntax types.
    #[must_use]
    pub fn bootstrap() -> Self {
        let mut schema = Self::new();
        for attribute_type in bootstrap_types() {
            if let Err(e) = schema.register(attribute_type) {
                tracing::warn!("skipping bootstrap attribute type: {e}");
            }
        }
        schema
    }

    /// Register an attribute type.
    ///
    /// # Errors
    ///
    /// Returns an error if the OID or a name is already registered, or if
    /// the superior is unknown.
    pub fn register(&mut self, mut attribute_type: AttributeType) -> Result<(), SchemaError> {
        if self.by_oid.contains_key(&attribute_type.oid) {
            return Err(SchemaError::DuplicateAttributeType(attribute_type.oid));
        }
        for name in &attribute_type.names {
            if self.by_name.contains_key(&name.to_lowercase()) {
                return Err(SchemaError::DuplicateAttributeType(name.clone()));
            }
        }

        if let Some(superior_oid) = &attribute_type.superior {
            let Some(superior) = self.by_oid.get(superior_oid) else {
                return Err(SchemaError::UnknownSuperior {
                    attribute: attribute_type.oid,
                    superior: superior_oid.clone(),
                });
            };
            attribute_type.equality = attribute_type.equality.or(superior.equality);
            attribute_type.ordering = attribute_type.ordering.or(superior.ordering);
            attribute_type.substring = attribute_type.substring.or(superior.substring);
        }

        for name in &attribute_type.names {
            self.by_name
                .insert(name.to_lowercase(), attribute_type.oid.clone());
        }
        self.by_oid
            .insert(attribute_type.oid.clone(), Arc::new(attribute_type));
        Ok(())
    }

    /// Number of registered attribute types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_oid.len()
    }

    /// Check if no attribute types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_oid.is_empty()
    }
}

impl SchemaManager for Schema {
    fn lookup(&self, name_or_oid: &str) -> Result<Arc<AttributeType>, SchemaError> {
        let key = name_or_oid.trim();
        let oid = self
            .by_name
            .get(&key.to_lowercase())
            .map_or(key, String::as_str);
        self.by_oid
            .get(oid)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownAttributeType(name_or_oid.to_owned()))
    }

    fn descendants(&self, attribute_type: &AttributeType) -> Vec<Arc<AttributeType>> {
        let mut result = Vec::new();
        let mut frontier = vec![attribute_type.oid.clone()];

        while let Some(parent) = frontier.pop() {
            for candidate in self.by_oid.values() {
                if candidate.superior.as_deref() == Some(parent.as_str()) {
                    frontier.push(candidate.oid.clone());
                    result.push(Arc::clone(candidate));
                }
            }
        }

        result.sort_by(|a, b| a.oid.cmp(&b.oid));
        result.dedup_by(|a, b| a.oid == b.oid);
        result
    }
}

fn bootstrap_types() -> Vec<AttributeType> {
    use MatchingRule::{
        CaseIgnoreMatch, CaseIgnoreOrderingMatch, CaseIgnoreSubstringsMatch,
        DistinguishedNameMatch, IntegerMatch, IntegerOrderingMatch, ObjectIdentifierMatch,
    };

    let naming = |oid: &str, name: &str| {
        AttributeType::new(oid, name).with_superior(oids::NAME)
    };

    vec![
        AttributeType::new(oids::OBJECT_CLASS, "objectClass").with_equality(ObjectIdentifierMatch),
        AttributeType::new(oids::ALIASED_OBJECT_NAME, "aliasedObjectName")
            .with_equality(DistinguishedNameMatch),
        AttributeType::new(oids::NAME, "name")
            .with_equality(CaseIgnoreMatch)
            .with_ordering(CaseIgnoreOrderingMatch)
            .with_substring(CaseIgnoreSubstringsMatch),
        {
            let mut cn = naming(oids::CN, "cn");
            cn.names.push("commonName".to_owned());
            cn
        },
        {
            let mut sn = naming(oids::SN, "sn");
            sn.names.push("surname".to_owned());
            sn
        },
        {
            let mut ou = naming(oids::OU, "ou");
            ou.names.push("organizationalUnitName".to_owned());
            ou
        },
        {
            let mut o = naming(oids::O, "o");
            o.names.push("organizationName".to_owned());
            o
        },
        AttributeType::new(oids::DC, "dc")
            .with_equality(CaseIgnoreMatch)
            .with_substring(CaseIgnoreSubstringsMatch),
        {
            let mut uid = AttributeType::new(oids::UID, "uid")
                .with_equality(CaseIgnoreMatch)
                .with_substring(CaseIgnoreSubstringsMatch);
            uid.names.push("userid".to_owned());
            uid
        },
        AttributeType::new(oids::MAIL, "mail")
            .with_equality(CaseIgnoreMatch)
            .with_substring(CaseIgnoreSubstringsMatch),
        AttributeType::new(oids::DESCRIPTION, "description")
            .with_equality(CaseIgnoreMatch)
            .with_substring(CaseIgnoreSubstringsMatch),
        AttributeType::new(oids::UID_NUMBER, "uidNumber")
            .with_equality(IntegerMatch)
            .with_ordering(IntegerOrderingMatch),
        AttributeType::new(oids::GID_NUMBER, "gidNumber")
            .with_equality(IntegerMatch)
            .with_ordering(IntegerOrderingMatch),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name_and_oid() {
        let schema = Schema::bootstrap();
        let by_name = schema.lookup("CommonName").expect("lookup by alias");
        let by_oid = schema.lookup(oids::CN).expect("lookup by oid");
        assert_eq!(by_name.oid, by_oid.oid);
        assert_eq!(by_name.name(), "cn");
    }

    #[test]
    fn test_lookup_unknown() {
        let schema = Schema::bootstrap();
        assert_eq!(
            schema.lookup("nonexistent"),
            Err(SchemaError::UnknownAttributeType("nonexistent".to_owned()))
        );
    }

    #[test]
    fn test_subtype_inherits_rules() {
        let schema = Schema::bootstrap();
        let cn = schema.lookup("cn").expect("cn");
        assert_eq!(cn.equality, Some(MatchingRule::CaseIgnoreMatch));
        assert_eq!(cn.substring, Some(MatchingRule::CaseIgnoreSubstringsMatch));
    }

    #[test]
    fn test_descendants_of_name() {
        let schema = Schema::bootstrap();
        let name = schema.lookup("name").expect("name");
        let found: Vec<String> = schema
            .descendants(&name)
            .iter()
            .map(|t| t.oid.clone())
            .collect();
        assert!(found.contains(&oids::CN.to_owned()));
        assert!(found.contains(&oids::SN.to_owned()));
        assert!(!found.contains(&oids::NAME.to_owned()));
        assert!(!found.contains(&oids::MAIL.to_owned()));
    }

    #[test]
    fn test_descendants_are_transitive() {
        let mut schema = Schema::bootstrap();
        schema
            .register(AttributeType::new("1.1.1", "nickName").with_superior(oids::CN))
            .expect("register");
        let name = schema.lookup("name").expect("name");
        let descendants = schema.descendants(&name);
        assert!(descendants.iter().any(|t| t.oid == "1.1.1"));
    }

    #[test]
    fn test_register_rejects_duplicates_and_unknown_superior() {
        let mut schema = Schema::bootstrap();
        assert!(matches!(
            schema.register(AttributeType::new(oids::CN, "other")),
            Err(SchemaError::DuplicateAttributeType(_))
        ));
        assert!(matches!(
            schema.register(AttributeType::new("9.9", "x").with_superior("8.8")),
            Err(SchemaError::UnknownSuperior { .. })
        ));
    }
}
