//! A one-level search sees the base's children and nothing deeper.

use crate::e2e_tests::helpers::*;
use crate::filter::{AliasDerefMode, FilterNode, SearchScope};
use crate::schema::Schema;
use crate::store::MemoryStore;
use crate::types::EntryId;

struct Directory {
    store: MemoryStore,
    children: Vec<EntryId>,
    grandchild: EntryId,
}

#[allow(clippy::expect_used)]
fn directory(schema: &Schema) -> Directory {
    let mut builder = MemoryStore::builder(schema, SUFFIX).expect("builder");
    builder.add(SUFFIX, [("ou", "system")]).expect("add");
    let mut children = Vec::new();
    for (cn, sn) in [("a", "smith"), ("b", "jones"), ("c", "smith"), ("d", "lee"), ("e", "brown")] {
        let dn = format!("cn={cn},{SUFFIX}");
        children.push(builder.add(&dn, [("cn", cn), ("sn", sn)]).expect("add"));
    }
    let grandchild = builder
        .add(&format!("cn=g,cn=a,{SUFFIX}"), [("cn", "g"), ("sn", "smith")])
        .expect("add");
    Directory {
        store: builder.build(),
        children,
        grandchild,
    }
}

#[test]
fn test_one_level_matches_children_only() {
    let schema = Schema::bootstrap();
    let directory = directory(&schema);
    let filter = FilterNode::equality("sn", "smith");
    let never = AliasDerefMode::NeverDerefAliases;

    assert_eq!(
        search(&directory.store, &schema, SUFFIX, SearchScope::OneLevel, never, &filter),
        vec![directory.children[0], directory.children[2]]
    );
    assert_eq!(
        search(&directory.store, &schema, SUFFIX, SearchScope::Subtree, never, &filter),
        vec![directory.children[0], directory.children[2], directory.grandchild]
    );
}

#[test]
fn test_one_level_below_a_leaf_is_empty() {
    let schema = Schema::bootstrap();
    let directory = directory(&schema);
    let filter = FilterNode::presence("cn");
    assert_eq!(
        search(
            &directory.store,
            &schema,
            &format!("cn=b,{SUFFIX}"),
            SearchScope::OneLevel,
            AliasDerefMode::DerefAlways,
            &filter,
        ),
        vec![]
    );
    assert_eq!(
        search(
            &directory.store,
            &schema,
            &format!("cn=a,{SUFFIX}"),
            SearchScope::OneLevel,
            AliasDerefMode::DerefAlways,
            &filter,
        ),
        vec![directory.grandchild]
    );
}
