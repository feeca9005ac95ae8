//! A negation always scans, even when its child is indexed.

use crate::e2e_tests::helpers::*;
use crate::filter::{AliasDerefMode, FilterNode, SearchScope};
use crate::schema::Schema;
use crate::types::EntryId;

const PEOPLE: &[(&str, &str)] = &[
    ("ann", "smith"),
    ("ben", "jones"),
    ("cat", "SMITH"),
    ("dan", "lee"),
    ("eve", "brown"),
];

#[test]
fn test_not_yields_complement_in_id_order() {
    let schema = Schema::bootstrap();
    for indexed in [&[][..], &["sn"][..]] {
        let store = people_store(&schema, indexed, PEOPLE);
        let filter = FilterNode::not(FilterNode::equality("sn", "smith"));
        assert_eq!(annotate(&store, &schema, &filter), u64::MAX);

        // The context entry has no sn, so it is part of the complement.
        let expected = vec![EntryId(1), EntryId(3), EntryId(5), EntryId(6)];
        let (forward, backward) = both_ways(filter_cursor(&store, &schema, &filter));
        assert_eq!(forward, expected);
        assert_eq!(backward, expected.into_iter().rev().collect::<Vec<_>>());
    }
}

#[test]
fn test_double_negation() {
    let schema = Schema::bootstrap();
    let store = people_store(&schema, &["sn"], PEOPLE);
    let filter = FilterNode::not(FilterNode::not(FilterNode::equality("sn", "smith")));
    assert_eq!(
        forward(filter_cursor(&store, &schema, &filter)),
        vec![EntryId(2), EntryId(4)]
    );
}

#[test]
fn test_not_under_and() {
    let schema = Schema::bootstrap();
    let store = people_store(&schema, &["sn"], PEOPLE);
    let filter = FilterNode::and(vec![
        FilterNode::equality("objectClass", "person"),
        FilterNode::not(FilterNode::equality("sn", "smith")),
    ]);
    assert_eq!(
        search(
            &store,
            &schema,
            SUFFIX,
            SearchScope::Subtree,
            AliasDerefMode::NeverDerefAliases,
            &filter,
        ),
        vec![EntryId(3), EntryId(5), EntryId(6)]
    );
}
