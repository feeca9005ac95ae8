//! The search entry point.
//!
//! A request names a base entry, a scope, an alias dereferencing mode and a
//! filter. The engine:
//!
//! 1. Resolves the base to an id. A base that does not exist yields an empty
//!    cursor, not an error.
//! 2. Follows an alias at the base when the mode dereferences while finding
//!    the base.
//! 3. For an OBJECT scope, tests the filter against the base alone and
//!    returns a one-element or empty cursor.
//! 4. Otherwise, ANDs a scope node with the filter, annotates the combined
//!    tree and builds its cursor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cursor::{Cursor, CursorBuilder, EmptyCursor, SingletonCursor};
use crate::error::SearchError;
use crate::evaluator::{Evaluator, EvaluatorBuilder};
use crate::filter::{AliasDerefMode, FilterNode, ScopeAssertion, SearchScope};
use crate::optimizer::Optimizer;
use crate::schema::SchemaManager;
use crate::store::Store;
use crate::types::{Dn, EntryId, IndexEntry};

/// Per-request search options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchControls {
    pub scope: SearchScope,
}

impl SearchControls {
    #[must_use]
    pub const fn new(scope: SearchScope) -> Self {
        Self { scope }
    }
}

impl Default for SearchControls {
    fn default() -> Self {
        Self::new(SearchScope::Subtree)
    }
}

/// Turns search requests into cursors over one store.
pub struct SearchEngine<'a> {
    store: &'a dyn Store,
    schema: &'a dyn SchemaManager,
}

impl<'a> SearchEngine<'a> {
    #[must_use]
    pub fn new(store: &'a dyn Store, schema: &'a dyn SchemaManager) -> Self {
        Self { store, schema }
    }

    /// Open a cursor over the candidates of a search request.
    ///
    /// The filter is annotated in place. The caller owns the returned cursor
    /// and must close it.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::NotImplemented` for filters holding opaque or
    /// extensible assertions, and propagates store failures unchanged.
    pub fn cursor(
        &self,
        base: &Dn,
        deref: AliasDerefMode,
        filter: &FilterNode,
        controls: &SearchControls,
    ) -> Result<Box<dyn Cursor + 'a>, SearchError> {
        let Some(base_id) = self.effective_base(base, deref)? else {
            tracing::debug!("search base {base} not found");
            return Ok(Box::new(EmptyCursor::new()));
        };

        if controls.scope == SearchScope::Object {
            let evaluator = self.evaluator(filter)?;
            let matched = evaluator.evaluate(&mut IndexEntry::new(base_id))?;
            tracing::debug!("object search of {base} ({base_id}) for {filter}: matched={matched}");
            if matched {
                return Ok(Box::new(SingletonCursor::new(IndexEntry::new(base_id))));
            }
            return Ok(Box::new(EmptyCursor::new()));
        }

        // The clone keeps the caller's counts; the root pass only fills the
        // scope and AND nodes.
        let mut optimizer = Optimizer::new(self.store, self.schema);
        optimizer.annotate(filter)?;
        let scope = ScopeAssertion::new(base_id, controls.scope, deref);
        let root = FilterNode::and(vec![FilterNode::scope(scope), filter.clone()]);
        let count = optimizer.annotate(&root)?;
        tracing::debug!(
            "search of {base} ({base_id}) scope={} deref={deref} filter={filter} count={count}",
            controls.scope
        );
        CursorBuilder::new(self.store, self.schema).build(&root)
    }

    /// Build the evaluator tree for a filter, annotating it first when it
    /// carries no counts.
    pub fn evaluator(&self, filter: &FilterNode) -> Result<Arc<dyn Evaluator + 'a>, SearchError> {
        if !filter.is_annotated() {
            Optimizer::new(self.store, self.schema).annotate(filter)?;
        }
        EvaluatorBuilder::new(self.store, self.schema).build(filter)
    }

    /// The id the search starts from, after following an alias at the base
    /// when the mode asks for it.
    fn effective_base(
        &self,
        base: &Dn,
        deref: AliasDerefMode,
    ) -> Result<Option<EntryId>, SearchError> {
        let Some(id) = self.store.entry_id(base)? else {
            return Ok(None);
        };
        if !deref.is_deref_finding_base() {
            return Ok(Some(id));
        }
        let Some(target) = self.store.alias_index().reverse_lookup(id)? else {
            return Ok(Some(id));
        };
        let resolved = self.store.entry_id(&target)?;
        match resolved {
            Some(target_id) => {
                tracing::debug!("base {base} is an alias for {target} ({target_id})");
            }
            None => tracing::warn!("base {base} is an alias for missing entry {target}"),
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::collect_ids;
    use crate::filter::NodeKind;
    use crate::schema::Schema;
    use crate::store::MemoryStore;
    use crate::testing::{self, ADMINS, BAR, FIZZ, FOO, FOOLINK, GROUPS};

    fn dn(s: &str) -> Dn {
        Dn::parse(s).expect("dn")
    }

    fn search(
        store: &MemoryStore,
        schema: &Schema,
        base: &str,
        scope: SearchScope,
        deref: AliasDerefMode,
        filter: &FilterNode,
    ) -> Vec<EntryId> {
        let engine = SearchEngine::new(store, schema);
        let mut cursor = engine
            .cursor(&dn(base), deref, filter, &SearchControls::new(scope))
            .expect("cursor");
        let ids = collect_ids(cursor.as_mut()).expect("collect");
        cursor.close().expect("close");
        ids
    }

    #[test]
    fn test_subtree_search() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let filter = FilterNode::equality("sn", "smith");
        assert_eq!(
            search(
                &store,
                &schema,
                "ou=system",
                SearchScope::Subtree,
                AliasDerefMode::NeverDerefAliases,
                &filter,
            ),
            vec![FOO, FIZZ]
        );
        assert!(filter.is_annotated());
    }

    #[test]
    fn test_filter_annotated_in_place() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let never = AliasDerefMode::NeverDerefAliases;
        for scope in [SearchScope::OneLevel, SearchScope::Subtree] {
            let filter = FilterNode::or(vec![
                FilterNode::equality("cn", "foo"),
                FilterNode::equality("cn", "bar"),
            ]);
            search(&store, &schema, "ou=users,ou=system", scope, never, &filter);
            assert_eq!(filter.count(), Some(2));
            let NodeKind::Or(children) = filter.kind() else {
                panic!("expected a disjunction");
            };
            assert!(children.iter().all(|child| child.count() == Some(1)));
        }
    }

    #[test]
    fn test_missing_base_is_empty() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let filter = FilterNode::presence("objectClass");
        for scope in [SearchScope::Object, SearchScope::OneLevel, SearchScope::Subtree] {
            assert_eq!(
                search(
                    &store,
                    &schema,
                    "ou=nowhere,ou=system",
                    scope,
                    AliasDerefMode::DerefAlways,
                    &filter,
                ),
                vec![]
            );
        }
    }

    #[test]
    fn test_object_fast_path() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let never = AliasDerefMode::NeverDerefAliases;
        let base = "cn=bar,ou=users,ou=system";
        assert_eq!(
            search(
                &store,
                &schema,
                base,
                SearchScope::Object,
                never,
                &FilterNode::equality("sn", "jones"),
            ),
            vec![BAR]
        );
        assert_eq!(
            search(
                &store,
                &schema,
                base,
                SearchScope::Object,
                never,
                &FilterNode::equality("sn", "smith"),
            ),
            vec![]
        );
    }

    #[test]
    fn test_deref_finding_base() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let base = "cn=foolink,ou=groups,ou=system";
        let filter = FilterNode::presence("objectClass");
        assert_eq!(
            search(
                &store,
                &schema,
                base,
                SearchScope::Object,
                AliasDerefMode::DerefFindingBase,
                &filter,
            ),
            vec![FOO]
        );
        assert_eq!(
            search(
                &store,
                &schema,
                base,
                SearchScope::Object,
                AliasDerefMode::NeverDerefAliases,
                &filter,
            ),
            vec![FOOLINK]
        );
    }

    #[test]
    fn test_deref_in_searching() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let filter = FilterNode::presence("cn");
        assert_eq!(
            search(
                &store,
                &schema,
                "ou=groups,ou=system",
                SearchScope::OneLevel,
                AliasDerefMode::DerefInSearching,
                &filter,
            ),
            vec![ADMINS, FOO]
        );
        assert_eq!(
            search(
                &store,
                &schema,
                "ou=groups,ou=system",
                SearchScope::OneLevel,
                AliasDerefMode::NeverDerefAliases,
                &filter,
            ),
            vec![ADMINS, FOOLINK]
        );
    }

    #[test]
    fn test_dangling_alias_base_is_empty() {
        let schema = Schema::bootstrap();
        let mut builder = MemoryStore::builder(&schema, "ou=system").expect("builder");
        builder.add("ou=system", [("ou", "system")]).expect("add");
        builder
            .add(
                "cn=dangling,ou=system",
                [
                    ("objectClass", "alias"),
                    ("cn", "dangling"),
                    ("aliasedObjectName", "cn=gone,ou=system"),
                ],
            )
            .expect("add");
        let store = builder.build();
        let filter = FilterNode::presence("objectClass");
        assert_eq!(
            search(
                &store,
                &schema,
                "cn=dangling,ou=system",
                SearchScope::Subtree,
                AliasDerefMode::DerefAlways,
                &filter,
            ),
            vec![]
        );
    }

    #[test]
    fn test_evaluator_annotates() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let engine = SearchEngine::new(&store, &schema);
        let filter = FilterNode::and(vec![
            FilterNode::equality("objectClass", "groupOfNames"),
            FilterNode::substring("description", Some("admin"), &[], None),
        ]);
        let evaluator = engine.evaluator(&filter).expect("evaluator");
        assert!(filter.is_annotated());
        assert!(evaluator.evaluate_id(ADMINS).expect("evaluate"));
        assert!(!evaluator.evaluate_id(GROUPS).expect("evaluate"));

        let entry = store.lookup(ADMINS).expect("lookup").expect("present");
        assert!(evaluator.evaluate_entry(&entry).expect("evaluate"));
    }
}
