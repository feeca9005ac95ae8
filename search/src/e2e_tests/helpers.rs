//! Common helpers for end-to-end tests.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cursor::{Cursor, CursorBuilder};
use crate::engine::{SearchControls, SearchEngine};
use crate::evaluator::EvaluatorBuilder;
use crate::filter::{AliasDerefMode, FilterNode, SearchScope};
use crate::optimizer::Optimizer;
use crate::schema::Schema;
use crate::store::{DirectoryDump, DumpEntry, MemoryStore};
use crate::types::{Dn, EntryId};

/// Suffix of every generated directory.
pub const SUFFIX: &str = "ou=system";

/// Attributes the indexed variant of a generated directory indexes.
pub const INDEXED: &[&str] = &["cn", "sn", "uidNumber", "mail"];

const SURNAMES: &[&str] = &["smith", "Smith", "jones", "brown", "lee", "van  der berg"];
const GIVEN: &[&str] = &["alice", "bob", "carol", "dave", "erin", "frank", "al"];

fn entry(dn: impl Into<String>, attributes: &[(&str, String)]) -> DumpEntry {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in attributes {
        map.entry((*name).to_owned()).or_default().push(value.clone());
    }
    DumpEntry {
        dn: dn.into(),
        attributes: map,
    }
}

fn ou(name: &str, parent: &str) -> DumpEntry {
    let dn = if parent.is_empty() {
        format!("ou={name}")
    } else {
        format!("ou={name},{parent}")
    };
    entry(
        dn,
        &[
            ("objectClass", "top".to_owned()),
            ("objectClass", "organizationalUnit".to_owned()),
            ("ou", name.to_owned()),
        ],
    )
}

/// A reproducible random directory: a few departments of people with
/// overlapping names, some invalid integers, and aliases across departments.
pub fn random_dump(seed: u64, people: usize) -> DirectoryDump {
    let mut rng = StdRng::seed_from_u64(seed);
    let departments = rng.random_range(2..=4);

    let mut entries = vec![ou("system", "")];
    for d in 0..departments {
        entries.push(ou(&format!("dept{d}"), SUFFIX));
    }

    let mut names = Vec::with_capacity(people);
    for i in 0..people {
        let dept = rng.random_range(0..departments);
        let dn = format!("cn=user{i},ou=dept{dept},{SUFFIX}");
        let mut attributes = vec![
            ("objectClass", "person".to_owned()),
            ("cn", format!("user{i}")),
            ("sn", SURNAMES[rng.random_range(0..SURNAMES.len())].to_owned()),
        ];
        if rng.random_bool(0.4) {
            attributes.push(("cn", GIVEN[rng.random_range(0..GIVEN.len())].to_owned()));
        }
        if rng.random_bool(0.9) {
            attributes.push(("uidNumber", rng.random_range(0..100).to_string()));
        } else {
            attributes.push(("uidNumber", "n/a".to_owned()));
        }
        if rng.random_bool(0.5) {
            attributes.push(("mail", format!("user{i}@example.com")));
        }
        entries.push(entry(dn.clone(), &attributes));
        names.push(dn);
    }

    if !names.is_empty() {
        for a in 0..rng.random_range(1..=3) {
            let dept = rng.random_range(0..departments);
            let target = &names[rng.random_range(0..names.len())];
            entries.push(entry(
                format!("cn=link{a},ou=dept{dept},{SUFFIX}"),
                &[
                    ("objectClass", "alias".to_owned()),
                    ("objectClass", "extensibleObject".to_owned()),
                    ("cn", format!("link{a}")),
                    ("aliasedObjectName", target.clone()),
                ],
            ));
        }
    }

    DirectoryDump {
        suffix: SUFFIX.to_owned(),
        indexed_attributes: Vec::new(),
        entries,
    }
}

/// Load a dump with user indices on the given attributes.
#[allow(clippy::expect_used)]
pub fn load(schema: &Schema, dump: &DirectoryDump, indexed: &[&str]) -> MemoryStore {
    let dump = DirectoryDump {
        indexed_attributes: indexed.iter().map(|name| (*name).to_owned()).collect(),
        ..dump.clone()
    };
    MemoryStore::from_dump(schema, &dump).expect("load dump")
}

/// A flat directory: the context entry and one person per `(cn, sn)` pair,
/// with ids 2, 3, ... in order.
#[allow(clippy::expect_used)]
pub fn people_store(schema: &Schema, indexed: &[&str], people: &[(&str, &str)]) -> MemoryStore {
    let mut builder = MemoryStore::builder(schema, SUFFIX).expect("builder");
    for name in indexed {
        builder.index(name).expect("index");
    }
    builder
        .add(SUFFIX, [("objectClass", "organizationalUnit"), ("ou", "system")])
        .expect("add");
    for &(cn, sn) in people {
        builder
            .add(
                &format!("cn={cn},{SUFFIX}"),
                [("objectClass", "person"), ("cn", cn), ("sn", sn)],
            )
            .expect("add");
    }
    builder.build()
}

#[allow(clippy::expect_used)]
pub fn annotate(store: &MemoryStore, schema: &Schema, filter: &FilterNode) -> u64 {
    Optimizer::new(store, schema).annotate(filter).expect("annotate")
}

/// Build the filter's cursor tree directly, without a scope node.
#[allow(clippy::expect_used)]
pub fn filter_cursor<'a>(
    store: &'a MemoryStore,
    schema: &'a Schema,
    filter: &FilterNode,
) -> Box<dyn Cursor + 'a> {
    annotate(store, schema, filter);
    CursorBuilder::new(store, schema).build(filter).expect("build cursor")
}

/// Walk from `first` forward, then close.
#[allow(clippy::expect_used)]
pub fn forward(mut cursor: Box<dyn Cursor + '_>) -> Vec<EntryId> {
    let mut ids = Vec::new();
    let mut available = cursor.first().expect("first");
    while available {
        ids.push(cursor.get().expect("get").id);
        available = cursor.next().expect("next");
    }
    cursor.close().expect("close");
    ids
}

/// Walk forward then backward over the same cursor, then close.
#[allow(clippy::expect_used)]
pub fn both_ways(mut cursor: Box<dyn Cursor + '_>) -> (Vec<EntryId>, Vec<EntryId>) {
    let mut forward = Vec::new();
    let mut available = cursor.first().expect("first");
    while available {
        forward.push(cursor.get().expect("get").id);
        available = cursor.next().expect("next");
    }
    let mut backward = Vec::new();
    let mut available = cursor.last().expect("last");
    while available {
        backward.push(cursor.get().expect("get").id);
        available = cursor.previous().expect("previous");
    }
    cursor.close().expect("close");
    (forward, backward)
}

/// The ids the filter's evaluator accepts, testing every entry.
#[allow(clippy::expect_used)]
pub fn brute_force(store: &MemoryStore, schema: &Schema, filter: &FilterNode) -> Vec<EntryId> {
    annotate(store, schema, filter);
    let evaluator = EvaluatorBuilder::new(store, schema)
        .build(filter)
        .expect("build evaluator");
    store
        .entries()
        .filter(|(_, entry)| evaluator.evaluate_entry(entry).expect("evaluate"))
        .map(|(id, _)| id)
        .collect()
}

/// Run a search through the engine and collect the ids it yields.
#[allow(clippy::expect_used)]
pub fn search(
    store: &MemoryStore,
    schema: &Schema,
    base: &str,
    scope: SearchScope,
    deref: AliasDerefMode,
    filter: &FilterNode,
) -> Vec<EntryId> {
    let engine = SearchEngine::new(store, schema);
    let base = Dn::parse(base).expect("base dn");
    let cursor = engine
        .cursor(&base, deref, filter, &SearchControls::new(scope))
        .expect("search");
    forward(cursor)
}

pub fn sorted(mut ids: Vec<EntryId>) -> Vec<EntryId> {
    ids.sort();
    ids
}
