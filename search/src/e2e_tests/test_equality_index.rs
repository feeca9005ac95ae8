//! An equality filter on an indexed attribute reads the index directly.

use crate::cursor::{Cursor, IndexedCursor, collect_ids};
use crate::e2e_tests::helpers::*;
use crate::filter::{AliasDerefMode, FilterNode, SearchScope};
use crate::schema::Schema;
use crate::store::{MemoryIndex, MemoryStore};
use crate::types::{EntryId, Value};

#[test]
fn test_equality_over_index() {
    let index = MemoryIndex::from_tuples(
        "cn",
        vec![
            (Value::text("foo"), EntryId(1)),
            (Value::text("bar"), EntryId(2)),
            (Value::text("foo"), EntryId(3)),
        ],
    );
    let mut cursor = IndexedCursor::for_key(&index, &Value::text("foo")).expect("cursor");
    assert_eq!(
        collect_ids(&mut cursor).expect("collect"),
        vec![EntryId(1), EntryId(3)]
    );
    cursor.close().expect("close");
}

#[test]
fn test_equality_through_engine() {
    let schema = Schema::bootstrap();
    let mut builder = MemoryStore::builder(&schema, SUFFIX).expect("builder");
    builder.index("cn").expect("index");
    builder.add(SUFFIX, [("ou", "system")]).expect("add");
    let mut ids = Vec::new();
    for (uid, cn) in [("u1", "foo"), ("u2", "bar"), ("u3", "FOO")] {
        let dn = format!("uid={uid},{SUFFIX}");
        ids.push(builder.add(&dn, [("uid", uid), ("cn", cn)]).expect("add"));
    }
    let store = builder.build();

    let filter = FilterNode::equality("cn", "Foo");
    assert_eq!(annotate(&store, &schema, &filter), 2);

    let mut cursor = filter_cursor(&store, &schema, &filter);
    assert!(cursor.first().expect("first"));
    let found = cursor.get().expect("get");
    assert_eq!(found.id, ids[0]);
    assert_eq!(found.value, Some(Value::text("foo")));
    assert!(cursor.next().expect("next"));
    assert_eq!(cursor.get().expect("get").id, ids[2]);
    assert!(!cursor.next().expect("next"));
    cursor.close().expect("close");

    assert_eq!(
        search(
            &store,
            &schema,
            SUFFIX,
            SearchScope::Subtree,
            AliasDerefMode::NeverDerefAliases,
            &filter,
        ),
        vec![ids[0], ids[2]]
    );
}
