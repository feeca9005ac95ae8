//! Scope and alias evaluators.

use super::Evaluator;
use crate::error::SearchError;
use crate::filter::{ScopeAssertion, SearchScope};
use crate::store::Store;
use crate::types::{Entry, EntryId, IndexEntry};

/// Accepts candidates inside a search scope.
///
/// With dereferencing in searching, alias entries are rejected and the
/// targets of aliases inside the scope are accepted even when they live
/// elsewhere in the tree.
pub struct ScopeEvaluator<'a> {
    store: &'a dyn Store,
    scope: ScopeAssertion,
    /// Whether the base is the context entry, which holds every entry.
    base_is_context: bool,
}

impl<'a> ScopeEvaluator<'a> {
    pub fn new(store: &'a dyn Store, scope: ScopeAssertion) -> Result<Self, SearchError> {
        let base_is_context = store.context_entry_id()? == Some(scope.base);
        Ok(Self {
            store,
            scope,
            base_is_context,
        })
    }

    #[must_use]
    pub const fn scope(&self) -> &ScopeAssertion {
        &self.scope
    }

    #[must_use]
    pub const fn base_is_context(&self) -> bool {
        self.base_is_context
    }

    /// Membership by hierarchy alone, ignoring aliases.
    pub fn in_direct_scope(&self, id: EntryId) -> Result<bool, SearchError> {
        let base = self.scope.base;
        let member = match self.scope.scope {
            SearchScope::Object => id == base,
            SearchScope::OneLevel => self.store.one_level_index().has(&base, id)?,
            SearchScope::Subtree => {
                self.base_is_context || self.store.sub_level_index().has(&base, id)?
            }
        };
        Ok(member)
    }

    fn is_alias_target(&self, id: EntryId) -> Result<bool, SearchError> {
        let base = self.scope.base;
        let target = match self.scope.scope {
            SearchScope::Object => false,
            SearchScope::OneLevel => self.store.one_alias_index().has(&base, id)?,
            SearchScope::Subtree => self.store.sub_alias_index().has(&base, id)?,
        };
        Ok(target)
    }
}

impl Evaluator for ScopeEvaluator<'_> {
    fn evaluate(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError> {
        let id = candidate.id;
        if !self.scope.deref.is_deref_in_searching() {
            return self.in_direct_scope(id);
        }
        if is_alias(self.store, id)? {
            return Ok(false);
        }
        Ok(self.in_direct_scope(id)? || self.is_alias_target(id)?)
    }

    fn evaluate_entry(&self, entry: &Entry) -> Result<bool, SearchError> {
        match self.store.entry_id(&entry.dn)? {
            Some(id) => self.evaluate_id(id),
            None => Ok(false),
        }
    }
}

/// Accepts alias entries.
pub struct AliasEvaluator<'a> {
    store: &'a dyn Store,
}

impl<'a> AliasEvaluator<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }
}

impl Evaluator for AliasEvaluator<'_> {
    fn evaluate(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError> {
        is_alias(self.store, candidate.id)
    }

    fn evaluate_entry(&self, entry: &Entry) -> Result<bool, SearchError> {
        match self.store.entry_id(&entry.dn)? {
            Some(id) => is_alias(self.store, id),
            None => Ok(false),
        }
    }
}

fn is_alias(store: &dyn Store, id: EntryId) -> Result<bool, SearchError> {
    Ok(store.alias_index().reverse_lookup(id)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AliasDerefMode;
    use crate::schema::Schema;
    use crate::testing::{self, ADMINS, FOO, FOOLINK, GROUPS, SYSTEM, USERS};

    fn evaluator(
        store: &dyn Store,
        base: EntryId,
        scope: SearchScope,
        deref: AliasDerefMode,
    ) -> ScopeEvaluator<'_> {
        ScopeEvaluator::new(store, ScopeAssertion::new(base, scope, deref)).expect("build")
    }

    #[test]
    fn test_one_level() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let one = evaluator(
            &store,
            USERS,
            SearchScope::OneLevel,
            AliasDerefMode::NeverDerefAliases,
        );
        assert!(one.evaluate_id(FOO).expect("evaluate"));
        assert!(!one.evaluate_id(USERS).expect("evaluate"));
        assert!(!one.evaluate_id(ADMINS).expect("evaluate"));
    }

    #[test]
    fn test_subtree() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let sub = evaluator(
            &store,
            GROUPS,
            SearchScope::Subtree,
            AliasDerefMode::NeverDerefAliases,
        );
        assert!(!sub.base_is_context());
        assert!(sub.evaluate_id(GROUPS).expect("evaluate"));
        assert!(sub.evaluate_id(FOOLINK).expect("evaluate"));
        assert!(!sub.evaluate_id(FOO).expect("evaluate"));

        let everything =
            evaluator(&store, SYSTEM, SearchScope::Subtree, AliasDerefMode::NeverDerefAliases);
        assert!(everything.base_is_context());
        assert!(everything.evaluate_id(FOO).expect("evaluate"));
    }

    #[test]
    fn test_deref_in_searching() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let sub = evaluator(&store, GROUPS, SearchScope::Subtree, AliasDerefMode::DerefAlways);
        assert!(!sub.evaluate_id(FOOLINK).expect("evaluate"));
        assert!(sub.evaluate_id(FOO).expect("evaluate"));
        assert!(sub.evaluate_id(ADMINS).expect("evaluate"));

        let entry = store.lookup(FOO).expect("lookup").expect("present");
        assert!(sub.evaluate_entry(&entry).expect("evaluate"));
    }

    #[test]
    fn test_alias_evaluator() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let aliases = AliasEvaluator::new(&store);
        assert!(aliases.evaluate_id(FOOLINK).expect("evaluate"));
        assert!(!aliases.evaluate_id(FOO).expect("evaluate"));
    }
}
