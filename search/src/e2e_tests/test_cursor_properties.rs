//! Randomized checks that hold for every filter over every directory.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::e2e_tests::helpers::*;
use crate::error::SearchError;
use crate::filter::{AliasDerefMode, FilterNode, SearchScope};
use crate::schema::Schema;
use crate::store::{MemoryStore, Store};
use crate::types::{Dn, EntryId};

const SEEDS: u64 = 24;
const PEOPLE: usize = 40;
const FILTERS_PER_SEED: u64 = 12;

const ATTRIBUTES: &[&str] = &["cn", "sn", "uidNumber", "mail", "objectClass"];
const TEXT_VALUES: &[&str] = &[
    "smith", "SMITH", "jones", "al", "alice", "user1", "user12", "person", "alias", "7",
    "user3@example.com", "van der berg", "n/a",
];
const INTEGER_VALUES: &[&str] = &["0", "7", "42", "99", " 50 "];
const FRAGMENTS: &[&str] = &["s", "user", "1", "al", "th", "@example", "ER", "e"];

fn pick<'a>(rng: &mut StdRng, choices: &[&'a str]) -> &'a str {
    choices[rng.random_range(0..choices.len())]
}

fn fragment(rng: &mut StdRng) -> Option<&'static str> {
    rng.random_bool(0.5).then(|| pick(rng, FRAGMENTS))
}

/// A random filter tree without opaque or extensible assertions.
fn random_filter(rng: &mut StdRng, depth: u32) -> FilterNode {
    let branch = depth > 0 && rng.random_bool(0.4);
    if branch {
        return match rng.random_range(0..3) {
            0 => FilterNode::and(
                (0..rng.random_range(1..=3))
                    .map(|_| random_filter(rng, depth - 1))
                    .collect(),
            ),
            1 => FilterNode::or(
                (0..rng.random_range(1..=3))
                    .map(|_| random_filter(rng, depth - 1))
                    .collect(),
            ),
            _ => FilterNode::not(random_filter(rng, depth - 1)),
        };
    }

    let attribute = pick(rng, ATTRIBUTES);
    let values = if attribute == "uidNumber" { INTEGER_VALUES } else { TEXT_VALUES };
    match rng.random_range(0..6) {
        0 => FilterNode::presence(attribute),
        1 => FilterNode::equality(attribute, pick(rng, values)),
        2 => FilterNode::approximate(attribute, pick(rng, values)),
        3 => FilterNode::greater_or_equal(attribute, pick(rng, values)),
        4 => FilterNode::less_or_equal(attribute, pick(rng, values)),
        _ => {
            let any: Vec<&str> = (0..rng.random_range(0..=2))
                .map(|_| pick(rng, FRAGMENTS))
                .collect();
            FilterNode::substring(attribute, fragment(rng), &any, fragment(rng))
        }
    }
}

/// The filter for `(seed, n)`. Counts are written once per node, so every
/// store gets a fresh tree.
fn nth_filter(seed: u64, n: u64) -> FilterNode {
    random_filter(&mut StdRng::seed_from_u64(seed * 1_000 + n), 3)
}

fn stores(schema: &Schema, seed: u64) -> (MemoryStore, MemoryStore) {
    let dump = random_dump(seed, PEOPLE);
    (load(schema, &dump, INDEXED), load(schema, &dump, &[]))
}

fn assert_distinct(ids: &[EntryId], context: &str) {
    let distinct: BTreeSet<_> = ids.iter().collect();
    assert_eq!(distinct.len(), ids.len(), "duplicates for {context}: {ids:?}");
}

#[test]
fn test_cursor_agrees_with_brute_force() {
    let schema = Schema::bootstrap();
    for seed in 0..SEEDS {
        let (indexed, scanned) = stores(&schema, seed);
        for n in 0..FILTERS_PER_SEED {
            let expected = brute_force(&scanned, &schema, &nth_filter(seed, n));
            for store in [&indexed, &scanned] {
                let filter = nth_filter(seed, n);
                let ids = forward(filter_cursor(store, &schema, &filter));
                assert_distinct(&ids, &filter.to_string());
                assert_eq!(sorted(ids), expected, "seed {seed} filter {filter}");
            }
        }
    }
}

#[test]
fn test_traversal_is_symmetric() {
    let schema = Schema::bootstrap();
    for seed in 0..SEEDS {
        let (indexed, scanned) = stores(&schema, seed);
        for n in 0..FILTERS_PER_SEED {
            for store in [&indexed, &scanned] {
                let filter = nth_filter(seed, n);
                let (forward, mut backward) = both_ways(filter_cursor(store, &schema, &filter));
                backward.reverse();
                assert_eq!(forward, backward, "seed {seed} filter {filter}");
            }
        }
    }
}

#[test]
fn test_get_is_idempotent() {
    let schema = Schema::bootstrap();
    for seed in 0..SEEDS / 4 {
        let (indexed, _) = stores(&schema, seed);
        for n in 0..FILTERS_PER_SEED {
            let filter = nth_filter(seed, n);
            let mut cursor = filter_cursor(&indexed, &schema, &filter);
            assert_eq!(cursor.get(), Err(SearchError::InvalidCursorPosition));
            while cursor.next().expect("next") {
                assert!(cursor.available());
                assert_eq!(cursor.get(), cursor.get());
            }
            assert!(!cursor.available());
            cursor.close().expect("close");
        }
    }
}

#[test]
fn test_conjunction_within_each_child() {
    let schema = Schema::bootstrap();
    for seed in 0..SEEDS {
        let (indexed, _) = stores(&schema, seed);
        for n in 0..FILTERS_PER_SEED {
            let left = || nth_filter(seed, n);
            let right = || nth_filter(seed + SEEDS, n);
            let both = FilterNode::and(vec![left(), right()]);
            let conjunction: BTreeSet<_> =
                forward(filter_cursor(&indexed, &schema, &both)).into_iter().collect();
            let left: BTreeSet<_> =
                forward(filter_cursor(&indexed, &schema, &left())).into_iter().collect();
            let right: BTreeSet<_> =
                forward(filter_cursor(&indexed, &schema, &right())).into_iter().collect();
            assert_eq!(conjunction, &left & &right, "seed {seed} filter {both}");
        }
    }
}

fn is_alias(store: &MemoryStore, id: EntryId) -> bool {
    store
        .alias_index()
        .reverse_lookup(id)
        .expect("alias lookup")
        .is_some()
}

fn in_scope(entry_dn: &Dn, base: &Dn, scope: SearchScope) -> bool {
    match scope {
        SearchScope::OneLevel => entry_dn.parent().as_ref() == Some(base),
        _ => entry_dn == base || entry_dn.is_descendant_of(base),
    }
}

/// Every entry in scope, aliases included.
fn expected_plain(store: &MemoryStore, base: &Dn, scope: SearchScope) -> Vec<EntryId> {
    sorted(
        store
            .entries()
            .filter(|(_, entry)| in_scope(&entry.dn, base, scope))
            .map(|(id, _)| id)
            .collect(),
    )
}

/// What a search dereferencing aliases should see below `base`: the
/// non-alias entries in scope plus the targets of the aliases in scope.
fn expected_deref(store: &MemoryStore, base: &Dn, scope: SearchScope) -> Vec<EntryId> {
    let mut ids = BTreeSet::new();
    for (id, entry) in store.entries() {
        if !in_scope(&entry.dn, base, scope) {
            continue;
        }
        match store.alias_index().reverse_lookup(id).expect("alias lookup") {
            Some(target) => {
                if let Some(target_id) = store.entry_id(&target).expect("entry id") {
                    ids.insert(target_id);
                }
            }
            None => {
                ids.insert(id);
            }
        }
    }
    ids.into_iter().collect()
}

#[test]
fn test_alias_dereferencing_scopes() {
    let schema = Schema::bootstrap();
    let filter = || FilterNode::presence("objectClass");
    for seed in 0..SEEDS {
        let (store, _) = stores(&schema, seed);
        let suffix = Dn::parse(SUFFIX).expect("suffix");
        let departments: Vec<Dn> = store
            .entries()
            .filter(|(_, entry)| entry.dn.parent().as_ref() == Some(&suffix))
            .map(|(_, entry)| entry.dn.clone())
            .collect();

        for base in std::iter::once(&suffix).chain(&departments) {
            for scope in [SearchScope::OneLevel, SearchScope::Subtree] {
                let found = search(
                    &store,
                    &schema,
                    &base.to_string(),
                    scope,
                    AliasDerefMode::DerefInSearching,
                    &filter(),
                );
                assert_distinct(&found, &format!("{scope} {base}"));
                assert!(found.iter().all(|id| !is_alias(&store, *id)));
                assert_eq!(
                    sorted(found),
                    expected_deref(&store, base, scope),
                    "seed {seed} {scope} {base}"
                );

                let plain = search(
                    &store,
                    &schema,
                    &base.to_string(),
                    scope,
                    AliasDerefMode::NeverDerefAliases,
                    &filter(),
                );
                assert_eq!(
                    sorted(plain),
                    expected_plain(&store, base, scope),
                    "seed {seed} {scope} {base}"
                );
            }
        }
    }
}

#[test]
fn test_close_is_final() {
    let schema = Schema::bootstrap();
    for seed in 0..SEEDS / 4 {
        let (indexed, scanned) = stores(&schema, seed);
        for n in 0..FILTERS_PER_SEED {
            for store in [&indexed, &scanned] {
                let filter = nth_filter(seed, n);
                let mut cursor = filter_cursor(store, &schema, &filter);
                cursor.next().expect("next");
                cursor.close().expect("close");
                cursor.close().expect("second close");
                assert_eq!(cursor.next(), Err(SearchError::CursorClosed));
                assert_eq!(cursor.previous(), Err(SearchError::CursorClosed));
                assert_eq!(cursor.before_first(), Err(SearchError::CursorClosed));
                assert_eq!(cursor.get(), Err(SearchError::CursorClosed));
            }
        }
    }
}
