//! Relations between a branch's count and its children's counts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::e2e_tests::helpers::*;
use crate::filter::{FilterNode, NodeKind};
use crate::schema::{Schema, SchemaManager};
use crate::store::Store;
use crate::types::Value;

const SEEDS: u64 = 16;

fn leaf(rng: &mut StdRng) -> FilterNode {
    let sn = ["smith", "jones", "brown", "lee", "nobody"][rng.random_range(0..5)];
    match rng.random_range(0..3) {
        0 => FilterNode::equality("sn", sn),
        1 => FilterNode::equality("uidNumber", rng.random_range(0..100).to_string()),
        _ => FilterNode::presence("mail"),
    }
}

fn child_counts(filter: &FilterNode) -> Vec<u64> {
    let (NodeKind::And(children) | NodeKind::Or(children)) = filter.kind() else {
        panic!("expected a branch");
    };
    children
        .iter()
        .map(|child| child.count().expect("annotated child"))
        .collect()
}

#[test]
fn test_and_count_is_smallest_child() {
    let schema = Schema::bootstrap();
    for seed in 0..SEEDS {
        let store = load(&schema, &random_dump(seed, 60), INDEXED);
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..10 {
            let children = (0..rng.random_range(1..=4)).map(|_| leaf(&mut rng)).collect();
            let filter = FilterNode::and(children);
            let count = annotate(&store, &schema, &filter);
            let smallest = child_counts(&filter).into_iter().min().expect("children");
            assert_eq!(count, smallest);
            assert!(forward(filter_cursor(&store, &schema, &filter)).len() as u64 <= count);
        }
    }
}

#[test]
fn test_or_count_is_sum_of_indexed_children() {
    let schema = Schema::bootstrap();
    for seed in 0..SEEDS {
        let store = load(&schema, &random_dump(seed, 60), INDEXED);
        let mut rng = StdRng::seed_from_u64(seed + 1_000);
        for _ in 0..10 {
            let children: Vec<_> = (0..rng.random_range(1..=4)).map(|_| leaf(&mut rng)).collect();
            let filter = FilterNode::or(children);
            let count = annotate(&store, &schema, &filter);
            assert_eq!(count, child_counts(&filter).into_iter().sum::<u64>());
            assert!(forward(filter_cursor(&store, &schema, &filter)).len() as u64 <= count);
        }
    }
}

#[test]
fn test_equality_count_is_exact() {
    let schema = Schema::bootstrap();
    for seed in 0..SEEDS {
        let store = load(&schema, &random_dump(seed, 60), INDEXED);
        let at = schema.lookup("sn").expect("sn");
        let expected = store
            .index(&at)
            .expect("sn index")
            .count_of(&Value::text("smith"))
            .expect("count");
        let filter = FilterNode::equality("sn", "Smith");
        assert_eq!(annotate(&store, &schema, &filter), expected);
        assert_eq!(brute_force(&store, &schema, &filter).len() as u64, expected);
    }
}

#[test]
fn test_unindexed_leaf_is_unbounded() {
    let schema = Schema::bootstrap();
    let store = load(&schema, &random_dump(3, 20), &[]);
    for filter in [
        FilterNode::equality("sn", "smith"),
        FilterNode::greater_or_equal("cn", "user1"),
        FilterNode::substring("mail", None, &["example"], None),
        FilterNode::not(FilterNode::presence("mail")),
    ] {
        assert_eq!(annotate(&store, &schema, &filter), u64::MAX, "{filter}");
    }
}
