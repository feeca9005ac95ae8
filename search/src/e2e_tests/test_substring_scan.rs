//! A substring filter on an unindexed attribute scans every entry.

use crate::e2e_tests::helpers::*;
use crate::error::SearchError;
use crate::filter::FilterNode;
use crate::schema::Schema;
use crate::types::{EntryId, Value};

#[test]
fn test_unindexed_substring_scans() {
    let schema = Schema::bootstrap();
    let store = people_store(&schema, &[], &[("foo", "a"), ("bar", "b"), ("fizz", "c")]);
    let filter = FilterNode::substring("cn", Some("f"), &[], None);
    assert_eq!(annotate(&store, &schema, &filter), u64::MAX);

    let mut cursor = filter_cursor(&store, &schema, &filter);
    // Only an index-backed cursor can seek.
    assert_eq!(
        cursor.before_value(EntryId(0), &Value::text("f")),
        Err(SearchError::UnsupportedOperation("before_value"))
    );
    assert_eq!(forward(cursor), vec![EntryId(2), EntryId(4)]);
}

#[test]
fn test_indexed_substring_walks_index_order() {
    let schema = Schema::bootstrap();
    let store = people_store(&schema, &["cn"], &[("foo", "a"), ("bar", "b"), ("fizz", "c")]);
    let filter = FilterNode::substring("cn", Some("f"), &[], None);
    assert_eq!(annotate(&store, &schema, &filter), 3);

    // Index order is value order: fizz before foo.
    assert_eq!(
        forward(filter_cursor(&store, &schema, &filter)),
        vec![EntryId(4), EntryId(2)]
    );
}

#[test]
fn test_substring_components() {
    let schema = Schema::bootstrap();
    let people = [("alpha", "x"), ("alphabet", "y"), ("beta", "z"), ("alphabeta", "w")];
    for indexed in [&[][..], &["cn"][..]] {
        let store = people_store(&schema, indexed, &people);
        let filter = FilterNode::substring("cn", Some("alpha"), &["bet"], Some("a"));
        assert_eq!(sorted(forward(filter_cursor(&store, &schema, &filter))), vec![EntryId(5)]);

        let filter = FilterNode::substring("cn", None, &[], Some("ET"));
        assert_eq!(sorted(forward(filter_cursor(&store, &schema, &filter))), vec![EntryId(3)]);
    }
}
