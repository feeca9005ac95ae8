//! Scan-count annotation.
//!
//! The optimizer walks a filter tree post-order and writes onto every node an
//! upper bound on the number of candidates it can match. Counts come from
//! index statistics only; nothing is evaluated.
//!
//! # Rules
//!
//! | Node | Count |
//! |---|---|
//! | Scope | OBJECT 1, ONELEVEL child count, SUBTREE sub-level count (all at the context entry) |
//! | Presence | presence-index count, system-index total, else MAX |
//! | Equality, Approximate | `count_of(value)` if indexed, else MAX |
//! | GreaterOrEqual, LessOrEqual | `greater_than_count` / `less_than_count` if indexed, else MAX |
//! | Substring | index total if indexed and without subtypes, else MAX |
//! | Extensible | index total if indexed, else MAX |
//! | Assertion | the assertion's own cost, else MAX |
//! | And | minimum over children |
//! | Or | sum over children, clamped to MAX |
//! | Not | MAX |

use std::sync::Arc;

use crate::error::SearchError;
use crate::filter::{
    Comparison, ComparisonOp, ExtensibleMatch, FilterNode, FilterVisitor, OpaqueAssertion,
    ScopeAssertion, SearchScope, SubstringAssertion,
};
use crate::schema::{AttributeType, SchemaManager};
use crate::store::Store;

/// Count meaning "unknown, assume everything".
pub const MAX_COUNT: u64 = u64::MAX;

/// Annotates filter trees with scan counts.
pub struct Optimizer<'a> {
    store: &'a dyn Store,
    schema: &'a dyn SchemaManager,
}

impl<'a> Optimizer<'a> {
    #[must_use]
    pub fn new(store: &'a dyn Store, schema: &'a dyn SchemaManager) -> Self {
        Self { store, schema }
    }

    /// Annotate `node` and all its descendants, returning the node's count.
    ///
    /// A node that already carries a count keeps it; the stored count is
    /// returned.
    pub fn annotate(&mut self, node: &FilterNode) -> Result<u64, SearchError> {
        let count = node.accept(self)?;
        let stored = node.set_count(count);
        tracing::trace!("annotated {node} with count {stored}");
        Ok(stored)
    }

    /// Resolve an attribute, treating unknown names as unindexed.
    fn indexed_attribute(&self, attribute: &str) -> Option<Arc<AttributeType>> {
        match self.schema.lookup(attribute) {
            Ok(attribute_type) if self.store.has_index_on(&attribute_type) => Some(attribute_type),
            Ok(_) => None,
            Err(e) => {
                tracing::trace!("counting {attribute} as unindexed: {e}");
                None
            }
        }
    }

    fn index_total(&self, attribute: &str) -> Result<u64, SearchError> {
        match self.indexed_attribute(attribute) {
            Some(attribute_type) => Ok(self.store.index(&attribute_type)?.count()?),
            None => Ok(MAX_COUNT),
        }
    }

    fn sum(&mut self, children: &[FilterNode]) -> Result<u64, SearchError> {
        let mut total: u64 = 0;
        for child in children {
            let count = self.annotate(child)?;
            total = total.checked_add(count).unwrap_or(MAX_COUNT);
        }
        Ok(total)
    }
}

impl FilterVisitor for Optimizer<'_> {
    type Output = Result<u64, SearchError>;

    fn visit_presence(&mut self, _node: &FilterNode, attribute: &str) -> Self::Output {
        let Ok(attribute_type) = self.schema.lookup(attribute) else {
            return Ok(MAX_COUNT);
        };
        if self.store.has_user_index_on(&attribute_type) {
            Ok(self.store.presence_index().count_of(&attribute_type.oid)?)
        } else if self.store.has_system_index_on(&attribute_type) {
            Ok(self.store.index(&attribute_type)?.count()?)
        } else {
            Ok(MAX_COUNT)
        }
    }

    fn visit_comparison(
        &mut self,
        _node: &FilterNode,
        op: ComparisonOp,
        comparison: &Comparison,
    ) -> Self::Output {
        let Some(attribute_type) = self.indexed_attribute(&comparison.attribute) else {
            return Ok(MAX_COUNT);
        };
        let normalized = match op {
            ComparisonOp::Equality | ComparisonOp::Approximate => {
                attribute_type.normalize(&comparison.value)
            }
            ComparisonOp::GreaterOrEqual | ComparisonOp::LessOrEqual => {
                attribute_type.normalize_ordering(&comparison.value)
            }
        };
        // A value no stored value can equal matches nothing.
        let Some(value) = normalized else {
            return Ok(0);
        };

        let index = self.store.index(&attribute_type)?;
        let count = match op {
            ComparisonOp::Equality | ComparisonOp::Approximate => index.count_of(&value)?,
            ComparisonOp::GreaterOrEqual => index.greater_than_count(&value)?,
            ComparisonOp::LessOrEqual => index.less_than_count(&value)?,
        };
        Ok(count)
    }

    fn visit_substring(
        &mut self,
        _node: &FilterNode,
        assertion: &SubstringAssertion,
    ) -> Self::Output {
        // Subtype values are not in the attribute's own index, so its total
        // is no bound.
        match self.indexed_attribute(&assertion.attribute) {
            Some(at) if self.schema.descendants(&at).is_empty() => {
                Ok(self.store.index(&at)?.count()?)
            }
            _ => Ok(MAX_COUNT),
        }
    }

    fn visit_and(&mut self, _node: &FilterNode, children: &[FilterNode]) -> Self::Output {
        let mut smallest = MAX_COUNT;
        for child in children {
            smallest = smallest.min(self.annotate(child)?);
        }
        Ok(smallest)
    }

    fn visit_or(&mut self, _node: &FilterNode, children: &[FilterNode]) -> Self::Output {
        self.sum(children)
    }

    fn visit_not(&mut self, _node: &FilterNode, child: &FilterNode) -> Self::Output {
        self.annotate(child)?;
        Ok(MAX_COUNT)
    }

    fn visit_scope(&mut self, _node: &FilterNode, scope: &ScopeAssertion) -> Self::Output {
        let direct = match scope.scope {
            SearchScope::Object => return Ok(1),
            SearchScope::OneLevel => self.store.child_count(scope.base)?,
            SearchScope::Subtree => {
                if self.store.context_entry_id()? == Some(scope.base) {
                    self.store.count()?
                } else {
                    self.store.sub_level_index().count_of(&scope.base)?
                }
            }
        };

        if !scope.deref.is_deref_in_searching() {
            return Ok(direct);
        }
        let aliased = match scope.scope {
            SearchScope::OneLevel => self.store.one_alias_index().count_of(&scope.base)?,
            _ => self.store.sub_alias_index().count_of(&scope.base)?,
        };
        Ok(direct.checked_add(aliased).unwrap_or(MAX_COUNT))
    }

    fn visit_assertion(&mut self, _node: &FilterNode, assertion: &OpaqueAssertion) -> Self::Output {
        Ok(assertion.cost.unwrap_or(MAX_COUNT))
    }

    fn visit_extensible(
        &mut self,
        _node: &FilterNode,
        extensible: &ExtensibleMatch,
    ) -> Self::Output {
        match &extensible.attribute {
            Some(attribute) => self.index_total(attribute),
            None => Ok(MAX_COUNT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AliasDerefMode;
    use crate::schema::Schema;
    use crate::store::MemoryStore;
    use crate::types::EntryId;

    fn store(schema: &Schema) -> MemoryStore {
        let mut builder = MemoryStore::builder(schema, "ou=system").expect("builder");
        builder.index("cn").expect("index");
        builder.index("uidNumber").expect("index");
        builder.add("ou=system", [("objectClass", "organizationalUnit")]).expect("add");
        let people = [("a", "10"), ("b", "20"), ("c", "30"), ("a", "40")];
        for (i, &(cn, uid)) in people.iter().enumerate() {
            builder
                .add(
                    &format!("uid=u{i},ou=system"),
                    [("objectClass", "person"), ("cn", cn), ("uidNumber", uid), ("sn", "x")],
                )
                .expect("add");
        }
        builder.build()
    }

    fn annotate(schema: &Schema, store: &MemoryStore, node: &FilterNode) -> u64 {
        Optimizer::new(store, schema).annotate(node).expect("annotate")
    }

    #[test]
    fn test_leaf_counts() {
        let schema = Schema::bootstrap();
        let store = store(&schema);
        assert_eq!(annotate(&schema, &store, &FilterNode::equality("cn", "A")), 2);
        assert_eq!(annotate(&schema, &store, &FilterNode::approximate("cn", "b")), 1);
        assert_eq!(annotate(&schema, &store, &FilterNode::equality("cn", "zzz")), 0);
        assert_eq!(annotate(&schema, &store, &FilterNode::equality("sn", "x")), MAX_COUNT);
        assert_eq!(annotate(&schema, &store, &FilterNode::equality("bogus", "x")), MAX_COUNT);
        assert_eq!(annotate(&schema, &store, &FilterNode::greater_or_equal("uidNumber", "20")), 3);
        assert_eq!(annotate(&schema, &store, &FilterNode::less_or_equal("uidNumber", "20")), 2);
        assert_eq!(annotate(&schema, &store, &FilterNode::equality("uidNumber", "ten")), 0);
        assert_eq!(
            annotate(&schema, &store, &FilterNode::substring("cn", Some("a"), &[], None)),
            4
        );
        assert_eq!(
            annotate(&schema, &store, &FilterNode::substring("sn", Some("a"), &[], None)),
            MAX_COUNT
        );
    }

    #[test]
    fn test_presence_counts() {
        let schema = Schema::bootstrap();
        let store = store(&schema);
        assert_eq!(annotate(&schema, &store, &FilterNode::presence("cn")), 4);
        assert_eq!(annotate(&schema, &store, &FilterNode::presence("objectClass")), 5);
        assert_eq!(annotate(&schema, &store, &FilterNode::presence("sn")), MAX_COUNT);
    }

    #[test]
    fn test_branch_counts() {
        let schema = Schema::bootstrap();
        let store = store(&schema);

        let and = FilterNode::and(vec![
            FilterNode::equality("cn", "a"),
            FilterNode::equality("cn", "b"),
            FilterNode::equality("sn", "x"),
        ]);
        assert_eq!(annotate(&schema, &store, &and), 1);
        assert!(and.is_annotated());

        let or = FilterNode::or(vec![
            FilterNode::equality("cn", "a"),
            FilterNode::equality("cn", "b"),
        ]);
        assert_eq!(annotate(&schema, &store, &or), 3);

        let not = FilterNode::not(FilterNode::equality("cn", "a"));
        assert_eq!(annotate(&schema, &store, &not), MAX_COUNT);
        assert!(not.is_annotated());
    }

    #[test]
    fn test_or_clamps_on_overflow() {
        let schema = Schema::bootstrap();
        let store = store(&schema);
        let or = FilterNode::or(vec![
            FilterNode::equality("sn", "x"),
            FilterNode::equality("cn", "a"),
        ]);
        assert_eq!(annotate(&schema, &store, &or), MAX_COUNT);

        let costs = FilterNode::or(vec![
            FilterNode::assertion("big", Some(u64::MAX - 1)),
            FilterNode::assertion("small", Some(2)),
        ]);
        assert_eq!(annotate(&schema, &store, &costs), MAX_COUNT);
    }

    #[test]
    fn test_assertion_cost() {
        let schema = Schema::bootstrap();
        let store = store(&schema);
        assert_eq!(annotate(&schema, &store, &FilterNode::assertion("x", Some(12))), 12);
        assert_eq!(annotate(&schema, &store, &FilterNode::assertion("x", None)), MAX_COUNT);
    }

    #[test]
    fn test_extensible_counts() {
        let schema = Schema::bootstrap();
        let store = store(&schema);
        let indexed = FilterNode::extensible(Some("cn"), Some("caseExactMatch"), "a");
        assert_eq!(annotate(&schema, &store, &indexed), 4);
        let unindexed = FilterNode::extensible(Some("sn"), None, "x");
        assert_eq!(annotate(&schema, &store, &unindexed), MAX_COUNT);
        let rule_only = FilterNode::extensible(None, Some("2.5.13.2"), "a");
        assert_eq!(annotate(&schema, &store, &rule_only), MAX_COUNT);
    }

    #[test]
    fn test_scope_counts() {
        let schema = Schema::bootstrap();
        let store = store(&schema);
        let scope = |base, scope| {
            FilterNode::scope(ScopeAssertion::new(
                EntryId(base),
                scope,
                AliasDerefMode::NeverDerefAliases,
            ))
        };
        assert_eq!(annotate(&schema, &store, &scope(1, SearchScope::Object)), 1);
        assert_eq!(annotate(&schema, &store, &scope(1, SearchScope::OneLevel)), 4);
        assert_eq!(annotate(&schema, &store, &scope(1, SearchScope::Subtree)), 5);
        assert_eq!(annotate(&schema, &store, &scope(2, SearchScope::Subtree)), 1);
    }

    #[test]
    fn test_existing_count_is_kept() {
        let schema = Schema::bootstrap();
        let store = store(&schema);
        let node = FilterNode::equality("cn", "a");
        node.set_count(99);
        assert_eq!(annotate(&schema, &store, &node), 99);
    }
}
