//! A conjunction is driven by its most selective child.

use crate::cursor::select_driver;
use crate::e2e_tests::helpers::*;
use crate::filter::{AliasDerefMode, FilterNode, NodeKind, SearchScope};
use crate::schema::Schema;
use crate::store::MemoryStore;
use crate::types::EntryId;

const PEOPLE: usize = 10_000;

/// `PEOPLE` persons, two of them named smith.
fn directory(schema: &Schema) -> (MemoryStore, Vec<EntryId>) {
    let people: Vec<(String, &str)> = (0..PEOPLE)
        .map(|i| {
            let sn = if i == 17 || i == 9_001 { "Smith" } else { "jones" };
            (format!("p{i}"), sn)
        })
        .collect();
    let people: Vec<(&str, &str)> = people.iter().map(|(cn, sn)| (cn.as_str(), *sn)).collect();
    let store = people_store(schema, &["objectClass", "sn"], &people);
    // people_store hands out ids from 2 in insertion order.
    (store, vec![EntryId(2 + 17), EntryId(2 + 9_001)])
}

#[test]
fn test_selective_child_drives() {
    let schema = Schema::bootstrap();
    let (store, smiths) = directory(&schema);
    let filter = FilterNode::and(vec![
        FilterNode::equality("objectClass", "person"),
        FilterNode::equality("sn", "smith"),
    ]);
    assert_eq!(annotate(&store, &schema, &filter), 2);

    let NodeKind::And(children) = filter.kind() else {
        panic!("expected a conjunction");
    };
    assert_eq!(children[0].count(), Some(PEOPLE as u64));
    assert_eq!(children[1].count(), Some(2));
    assert_eq!(select_driver(children).expect("driver"), 1);

    assert_eq!(forward(filter_cursor(&store, &schema, &filter)), smiths);
}

#[test]
fn test_first_minimum_wins_ties() {
    let schema = Schema::bootstrap();
    let (store, _) = directory(&schema);
    let filter = FilterNode::and(vec![
        FilterNode::equality("objectClass", "person"),
        FilterNode::equality("sn", "smith"),
        FilterNode::equality("sn", "SMITH"),
    ]);
    annotate(&store, &schema, &filter);
    let NodeKind::And(children) = filter.kind() else {
        panic!("expected a conjunction");
    };
    assert_eq!(select_driver(children).expect("driver"), 1);
}

#[test]
fn test_search_with_scope_node() {
    let schema = Schema::bootstrap();
    let (store, smiths) = directory(&schema);
    let filter = FilterNode::equality("sn", "smith");
    assert_eq!(
        search(
            &store,
            &schema,
            SUFFIX,
            SearchScope::OneLevel,
            AliasDerefMode::NeverDerefAliases,
            &filter,
        ),
        smiths
    );
}
