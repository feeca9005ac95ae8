//! In-memory `Store` implementation.
//!
//! Entries are collected through `MemoryStoreBuilder` and every index is
//! computed once in `build`. The resulting store is read-only, which is all
//! the search subsystem needs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::{DirectoryDump, Index, MemoryIndex, Store, StoreError};
use crate::schema::{AttributeType, SchemaManager, oids};
use crate::types::{Dn, Entry, EntryId, Value};

/// Object class value marking an entry as an alias.
const ALIAS_OBJECT_CLASS: &str = "alias";

/// A read-only directory held in memory.
///
/// # Invariants
///
/// - Every entry except the context entry has its parent in the store.
/// - `objectClass` is always maintained as a system index.
/// - The presence index holds `(oid, id)` for every user-indexed attribute an
///   entry carries.
#[derive(Debug)]
pub struct MemoryStore {
    suffix: Dn,
    ids: HashMap<Dn, EntryId>,
    entries: BTreeMap<EntryId, Arc<Entry>>,
    user_indices: HashMap<String, MemoryIndex<Value>>,
    system_indices: HashMap<String, MemoryIndex<Value>>,
    presence: MemoryIndex<String>,
    ndn: MemoryIndex<Dn>,
    alias: MemoryIndex<Dn>,
    one_level: MemoryIndex<EntryId>,
    sub_level: MemoryIndex<EntryId>,
    one_alias: MemoryIndex<EntryId>,
    sub_alias: MemoryIndex<EntryId>,
}

impl MemoryStore {
    /// Start building a store whose context entry is `suffix`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidDn` if `suffix` is not a valid name.
    pub fn builder<'s>(
        schema: &'s dyn SchemaManager,
        suffix: &str,
    ) -> Result<MemoryStoreBuilder<'s>, StoreError> {
        let suffix = Dn::parse(suffix).ok_or_else(|| StoreError::InvalidDn(suffix.to_owned()))?;
        Ok(MemoryStoreBuilder {
            schema,
            suffix,
            indexed: BTreeSet::new(),
            ids: HashMap::new(),
            entries: Vec::new(),
            next_id: 1,
        })
    }

    /// Load a store from a directory dump.
    ///
    /// Entries are added parents first, whatever order the dump lists them in.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is malformed or duplicated, a parent is
    /// missing, or an attribute is unknown to the schema.
    pub fn from_dump(schema: &dyn SchemaManager, dump: &DirectoryDump) -> Result<Self, StoreError> {
        let mut builder = Self::builder(schema, &dump.suffix)?;
        for attribute in &dump.indexed_attributes {
            builder.index(attribute)?;
        }

        let mut ordered = Vec::with_capacity(dump.entries.len());
        for entry in &dump.entries {
            let dn = Dn::parse(&entry.dn).ok_or_else(|| StoreError::InvalidDn(entry.dn.clone()))?;
            ordered.push((dn.rdn_count(), entry));
        }
        ordered.sort_by_key(|(depth, _)| *depth);

        for (_, entry) in ordered {
            let attributes = entry.attributes.iter().flat_map(|(name, values)| {
                values.iter().map(move |value| (name.as_str(), value.as_str()))
            });
            builder.add(&entry.dn, attributes)?;
        }

        Ok(builder.build())
    }

    /// Iterate over all entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &Arc<Entry>)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }
}

impl Store for MemoryStore {
    fn entry_id(&self, dn: &Dn) -> Result<Option<EntryId>, StoreError> {
        Ok(self.ids.get(dn).copied())
    }

    fn lookup(&self, id: EntryId) -> Result<Option<Arc<Entry>>, StoreError> {
        Ok(self.entries.get(&id).cloned())
    }

    fn has_user_index_on(&self, attribute_type: &AttributeType) -> bool {
        self.user_indices.contains_key(&attribute_type.oid)
    }

    fn has_system_index_on(&self, attribute_type: &AttributeType) -> bool {
        self.system_indices.contains_key(&attribute_type.oid)
    }

    fn index(&self, attribute_type: &AttributeType) -> Result<&dyn Index<Value>, StoreError> {
        self.user_indices
            .get(&attribute_type.oid)
            .or_else(|| self.system_indices.get(&attribute_type.oid))
            .map(|index| index as &dyn Index<Value>)
            .ok_or_else(|| StoreError::IndexNotFound(attribute_type.name().to_owned()))
    }

    fn presence_index(&self) -> &dyn Index<String> {
        &self.presence
    }

    fn ndn_index(&self) -> &dyn Index<Dn> {
        &self.ndn
    }

    fn alias_index(&self) -> &dyn Index<Dn> {
        &self.alias
    }

    fn one_level_index(&self) -> &dyn Index<EntryId> {
        &self.one_level
    }

    fn sub_level_index(&self) -> &dyn Index<EntryId> {
        &self.sub_level
    }

    fn one_alias_index(&self) -> &dyn Index<EntryId> {
        &self.one_alias
    }

    fn sub_alias_index(&self) -> &dyn Index<EntryId> {
        &self.sub_alias
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(u64::try_from(self.entries.len()).unwrap_or(u64::MAX))
    }

    fn suffix(&self) -> &Dn {
        &self.suffix
    }
}

/// Collects entries for a `MemoryStore`.
///
/// Ids are assigned sequentially from 1 in insertion order; 0 is the store's
/// default id (the parent key of the context entry).
pub struct MemoryStoreBuilder<'s> {
    schema: &'s dyn SchemaManager,
    suffix: Dn,
    /// OIDs of user-indexed attributes.
    indexed: BTreeSet<String>,
    ids: HashMap<Dn, EntryId>,
    /// `(id, parent id, entry)` in insertion order.
    entries: Vec<(EntryId, EntryId, Entry)>,
    next_id: u64,
}

impl MemoryStoreBuilder<'_> {
    /// Maintain a user index on an attribute.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownAttribute` if the schema does not know it.
    pub fn index(&mut self, name: &str) -> Result<(), StoreError> {
        let attribute_type = self.resolve(name)?;
        self.indexed.insert(attribute_type.oid.clone());
        Ok(())
    }

    /// Add an entry. The context entry must be added first, and every other
    /// entry after its parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is malformed, already present, outside the
    /// suffix or missing its parent, or if an attribute is unknown.
    pub fn add<'v>(
        &mut self,
        dn: &str,
        attributes: impl IntoIterator<Item = (&'v str, &'v str)>,
    ) -> Result<EntryId, StoreError> {
        let parsed = Dn::parse(dn).ok_or_else(|| StoreError::InvalidDn(dn.to_owned()))?;
        if self.ids.contains_key(&parsed) {
            return Err(StoreError::DuplicateEntry(parsed));
        }

        let parent_id = if parsed == self.suffix {
            EntryId::ROOT
        } else {
            parsed
                .parent()
                .filter(|_| parsed.is_descendant_of(&self.suffix))
                .and_then(|parent| self.ids.get(&parent).copied())
                .ok_or_else(|| StoreError::MissingParent(parsed.clone()))?
        };

        let mut entry = Entry::new(parsed.clone());
        for (name, value) in attributes {
            let attribute_type = self.resolve(name)?;
            entry.add(attribute_type.oid.clone(), value);
        }

        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.ids.insert(parsed, id);
        self.entries.push((id, parent_id, entry));
        Ok(id)
    }

    fn resolve(&self, name: &str) -> Result<Arc<AttributeType>, StoreError> {
        self.schema
            .lookup(name)
            .map_err(|_| StoreError::UnknownAttribute(name.to_owned()))
    }

    /// Compute every index and produce the store.
    #[must_use]
    pub fn build(self) -> MemoryStore {
        let parent_map: HashMap<EntryId, EntryId> = self
            .entries
            .iter()
            .map(|(id, parent, _)| (*id, *parent))
            .collect();
        let parents = &parent_map;
        let ancestors = move |id: EntryId| {
            std::iter::successors(parents.get(&id).copied(), move |p| parents.get(p).copied())
                .take_while(|p| *p != EntryId::ROOT)
        };

        let mut user_tuples: HashMap<String, Vec<(Value, EntryId)>> = HashMap::new();
        let mut system_tuples: Vec<(Value, EntryId)> = Vec::new();
        let mut presence = Vec::new();
        let mut ndn = Vec::new();
        let mut one_level = Vec::new();
        let mut sub_level = Vec::new();
        let mut aliases = Vec::new();

        for (id, parent, entry) in &self.entries {
            ndn.push((entry.dn.clone(), *id));
            one_level.push((*parent, *id));
            sub_level.push((*id, *id));
            sub_level.extend(ancestors(*id).map(|ancestor| (ancestor, *id)));

            for (oid, values) in entry.attributes() {
                let Ok(attribute_type) = self.schema.lookup(oid) else {
                    continue;
                };
                let normalized = values.iter().filter_map(|raw| {
                    let value = attribute_type.normalize(raw);
                    if value.is_none() {
                        tracing::trace!(
                            "value '{raw}' of {} on {} not indexed: invalid syntax",
                            attribute_type.name(),
                            entry.dn
                        );
                    }
                    value.map(|v| (v, *id))
                });

                if oid == oids::OBJECT_CLASS {
                    system_tuples.extend(normalized);
                } else if self.indexed.contains(oid) {
                    presence.push((oid.to_owned(), *id));
                    user_tuples
                        .entry(oid.to_owned())
                        .or_default()
                        .extend(normalized);
                }
            }

            if let Some(target) = alias_target(entry) {
                aliases.push((target, *id));
            }
        }

        let mut one_alias = Vec::new();
        let mut sub_alias = Vec::new();
        for (target, alias_id) in &aliases {
            let Some(target_id) = self.ids.get(target).copied() else {
                tracing::warn!("alias {alias_id} points at missing entry {target}");
                continue;
            };
            let alias_parent = parents.get(alias_id).copied().unwrap_or(EntryId::ROOT);
            if parents.get(&target_id).copied() != Some(alias_parent) {
                one_alias.push((alias_parent, target_id));
            }
            for ancestor in ancestors(*alias_id) {
                let inside = ancestor == target_id || ancestors(target_id).any(|a| a == ancestor);
                if !inside {
                    sub_alias.push((ancestor, target_id));
                }
            }
        }

        let mut user_indices: HashMap<String, MemoryIndex<Value>> = self
            .indexed
            .iter()
            .filter(|oid| oid.as_str() != oids::OBJECT_CLASS)
            .map(|oid| (oid.clone(), MemoryIndex::empty(oid.clone())))
            .collect();
        for (oid, tuples) in user_tuples {
            user_indices.insert(oid.clone(), MemoryIndex::from_tuples(oid, tuples));
        }

        let mut system_indices = HashMap::new();
        system_indices.insert(
            oids::OBJECT_CLASS.to_owned(),
            MemoryIndex::from_tuples(oids::OBJECT_CLASS, system_tuples),
        );

        tracing::debug!(
            "built memory store under '{}': {} entries, {} user indices, {} aliases",
            self.suffix,
            self.entries.len(),
            user_indices.len(),
            aliases.len()
        );

        MemoryStore {
            suffix: self.suffix,
            ids: self.ids,
            entries: self
                .entries
                .into_iter()
                .map(|(id, _, entry)| (id, Arc::new(entry)))
                .collect(),
            user_indices,
            system_indices,
            presence: MemoryIndex::from_tuples("presence", presence),
            ndn: MemoryIndex::from_tuples("ndn", ndn),
            alias: MemoryIndex::from_tuples(oids::ALIASED_OBJECT_NAME, aliases),
            one_level: MemoryIndex::from_tuples("oneLevel", one_level),
            sub_level: MemoryIndex::from_tuples("subLevel", sub_level),
            one_alias: MemoryIndex::from_tuples("oneAlias", one_alias),
            sub_alias: MemoryIndex::from_tuples("subAlias", sub_alias),
        }
    }
}

/// The normalized target of an alias entry, or `None` for ordinary entries.
fn alias_target(entry: &Entry) -> Option<Dn> {
    let is_alias = entry
        .get(oids::OBJECT_CLASS)?
        .iter()
        .any(|class| class.trim().eq_ignore_ascii_case(ALIAS_OBJECT_CLASS));
    if !is_alias {
        return None;
    }
    entry
        .get(oids::ALIASED_OBJECT_NAME)?
        .first()
        .and_then(|raw| Dn::parse(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn ids(index: &dyn Index<EntryId>, key: EntryId) -> Vec<u64> {
        let mut cursor = index.forward_cursor_for(&key).expect("cursor");
        let mut out = Vec::new();
        while cursor.next().expect("next") {
            out.push(cursor.get().expect("get").id.0);
        }
        out
    }

    fn sample(schema: &Schema) -> MemoryStore {
        let mut builder = MemoryStore::builder(schema, "ou=system").expect("builder");
        builder.index("cn").expect("index");
        builder
            .add("ou=system", [("objectClass", "organizationalUnit"), ("ou", "system")])
            .expect("add");
        builder
            .add("ou=users,ou=system", [("objectClass", "organizationalUnit")])
            .expect("add");
        builder
            .add("cn=Foo,ou=users,ou=system", [("objectClass", "person"), ("cn", "Foo")])
            .expect("add");
        builder
            .add("ou=groups,ou=system", [("objectClass", "organizationalUnit")])
            .expect("add");
        builder
            .add(
                "cn=link,ou=groups,ou=system",
                [
                    ("objectClass", "alias"),
                    ("aliasedObjectName", "cn=foo,ou=users,ou=system"),
                ],
            )
            .expect("add");
        builder.build()
    }

    #[test]
    fn test_ids_and_lookup() {
        let schema = Schema::bootstrap();
        let store = sample(&schema);
        let foo = Dn::parse("cn=foo,ou=users,ou=system").expect("parse");
        assert_eq!(store.entry_id(&foo).expect("id"), Some(EntryId(3)));
        assert_eq!(store.count().expect("count"), 5);
        assert_eq!(store.context_entry_id().expect("id"), Some(EntryId(1)));

        let entry = store.lookup(EntryId(3)).expect("lookup").expect("present");
        assert_eq!(entry.get(oids::CN), Some(&["Foo".to_owned()][..]));
        assert!(store.lookup(EntryId(42)).expect("lookup").is_none());
    }

    #[test]
    fn test_hierarchy_indices() {
        let schema = Schema::bootstrap();
        let store = sample(&schema);
        assert_eq!(ids(store.one_level_index(), EntryId::ROOT), vec![1]);
        assert_eq!(ids(store.one_level_index(), EntryId(1)), vec![2, 4]);
        assert_eq!(ids(store.sub_level_index(), EntryId(1)), vec![1, 2, 3, 4, 5]);
        assert_eq!(ids(store.sub_level_index(), EntryId(2)), vec![2, 3]);
        assert_eq!(store.child_count(EntryId(1)).expect("count"), 2);
    }

    #[test]
    fn test_alias_indices() {
        let schema = Schema::bootstrap();
        let store = sample(&schema);
        let target = Dn::parse("cn=foo,ou=users,ou=system").expect("parse");
        assert_eq!(
            store.alias_index().reverse_lookup(EntryId(5)).expect("lookup"),
            Some(target)
        );
        assert_eq!(ids(store.one_alias_index(), EntryId(4)), vec![3]);
        assert_eq!(ids(store.sub_alias_index(), EntryId(4)), vec![3]);
        // The suffix already contains the target.
        assert!(ids(store.sub_alias_index(), EntryId(1)).is_empty());
    }

    #[test]
    fn test_attribute_indices() {
        let schema = Schema::bootstrap();
        let store = sample(&schema);
        let cn = schema.lookup("cn").expect("cn");
        let object_class = schema.lookup("objectClass").expect("objectClass");
        let sn = schema.lookup("sn").expect("sn");

        assert!(store.has_user_index_on(&cn));
        assert!(store.has_system_index_on(&object_class));
        assert!(!store.has_index_on(&sn));
        assert!(matches!(store.index(&sn), Err(StoreError::IndexNotFound(_))));

        let index = store.index(&cn).expect("index");
        assert!(index.has(&Value::text("foo"), EntryId(3)).expect("has"));
        assert_eq!(store.presence_index().count_of(&cn.oid).expect("count"), 1);
        let classes = store.index(&object_class).expect("index");
        assert_eq!(
            classes
                .count_of(&Value::text("organizationalunit"))
                .expect("count"),
            3
        );
    }

    #[test]
    fn test_builder_rejects_bad_entries() {
        let schema = Schema::bootstrap();
        let mut builder = MemoryStore::builder(&schema, "ou=system").expect("builder");
        builder.add("ou=system", []).expect("add");
        assert!(matches!(
            builder.add("ou=system", []),
            Err(StoreError::DuplicateEntry(_))
        ));
        assert!(matches!(
            builder.add("cn=x,ou=missing,ou=system", []),
            Err(StoreError::MissingParent(_))
        ));
        assert!(matches!(
            builder.add("cn=x,ou=elsewhere", []),
            Err(StoreError::MissingParent(_))
        ));
        assert!(matches!(
            builder.add("cn=x,ou=system", [("bogus", "1")]),
            Err(StoreError::UnknownAttribute(_))
        ));
        assert!(matches!(builder.add("garbage", []), Err(StoreError::InvalidDn(_))));
    }

    #[test]
    fn test_from_dump_orders_parents_first() {
        let schema = Schema::bootstrap();
        let dump = DirectoryDump::from_json(
            r#"{
                "suffix": "dc=example",
                "indexed_attributes": ["uid"],
                "entries": [
                    { "dn": "uid=a,ou=people,dc=example", "attributes": { "uid": ["a"] } },
                    { "dn": "ou=people,dc=example", "attributes": {} },
                    { "dn": "dc=example", "attributes": { "dc": ["example"] } }
                ]
            }"#,
        )
        .expect("decode");
        let store = MemoryStore::from_dump(&schema, &dump).expect("load");
        assert_eq!(store.count().expect("count"), 3);
        let uid = schema.lookup("uid").expect("uid");
        assert_eq!(store.index(&uid).expect("index").count().expect("count"), 1);
    }
}
