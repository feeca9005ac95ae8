//! Scope cursor.

use std::sync::Arc;

use super::{
    AllEntriesCursor, Cursor, EmptyCursor, FilteredCursor, IndexedCursor, OrCursor,
    SingletonCursor,
};
use crate::error::SearchError;
use crate::evaluator::{AliasEvaluator, Evaluator, ScopeEvaluator};
use crate::filter::{AliasDerefMode, ScopeAssertion, SearchScope};
use crate::store::Store;
use crate::types::IndexEntry;

/// The entries inside a search scope, read from the hierarchy indices.
///
/// - OBJECT holds the base alone.
/// - ONELEVEL walks the one-level index under the base.
/// - SUBTREE walks the sub-level index under the base, or every entry when
///   the base is the context entry.
///
/// When aliases are dereferenced in searching, alias entries are dropped and
/// the alias targets recorded for the base follow the direct members, minus
/// the targets that are direct members themselves.
pub struct ScopeCursor<'a> {
    inner: Box<dyn Cursor + 'a>,
}

impl<'a> ScopeCursor<'a> {
    pub fn new(store: &'a dyn Store, scope: &ScopeAssertion) -> Result<Self, SearchError> {
        let deref = scope.deref.is_deref_in_searching();
        let inner: Box<dyn Cursor + 'a> = match scope.scope {
            SearchScope::Object => Self::object(store, scope)?,
            _ if deref => Self::dereferencing(store, scope)?,
            _ => Self::direct(store, scope)?,
        };
        Ok(Self { inner })
    }

    fn object(
        store: &'a dyn Store,
        scope: &ScopeAssertion,
    ) -> Result<Box<dyn Cursor + 'a>, SearchError> {
        let Some(entry) = store.lookup(scope.base)? else {
            return Ok(Box::new(EmptyCursor::new()));
        };
        let evaluator = ScopeEvaluator::new(store, *scope)?;
        let mut candidate = IndexEntry::with_entry(scope.base, entry);
        if evaluator.evaluate(&mut candidate)? {
            Ok(Box::new(SingletonCursor::new(IndexEntry::new(scope.base))))
        } else {
            Ok(Box::new(EmptyCursor::new()))
        }
    }

    fn direct(
        store: &'a dyn Store,
        scope: &ScopeAssertion,
    ) -> Result<Box<dyn Cursor + 'a>, SearchError> {
        let base = scope.base;
        let cursor: Box<dyn Cursor + 'a> = match scope.scope {
            SearchScope::Object => Self::object(store, scope)?,
            SearchScope::OneLevel => {
                Box::new(IndexedCursor::for_key(store.one_level_index(), &base)?)
            }
            SearchScope::Subtree if store.context_entry_id()? == Some(base) => {
                Box::new(AllEntriesCursor::new(store)?)
            }
            SearchScope::Subtree => {
                Box::new(IndexedCursor::for_key(store.sub_level_index(), &base)?)
            }
        };
        Ok(cursor)
    }

    fn dereferencing(
        store: &'a dyn Store,
        scope: &ScopeAssertion,
    ) -> Result<Box<dyn Cursor + 'a>, SearchError> {
        let base = scope.base;
        let direct_scope =
            ScopeAssertion::new(base, scope.scope, AliasDerefMode::NeverDerefAliases);
        let aliases = Arc::new(AliasEvaluator::new(store));

        let members: Box<dyn Cursor + 'a> = Box::new(FilteredCursor::rejecting(
            Self::direct(store, &direct_scope)?,
            Arc::clone(&aliases) as Arc<dyn Evaluator + 'a>,
        ));
        let targets: Box<dyn Cursor + 'a> = match scope.scope {
            SearchScope::OneLevel => {
                Box::new(IndexedCursor::for_key(store.one_alias_index(), &base)?)
            }
            _ => Box::new(IndexedCursor::for_key(store.sub_alias_index(), &base)?),
        };
        let targets: Box<dyn Cursor + 'a> = Box::new(FilteredCursor::rejecting(targets, aliases));

        let in_direct_scope: Arc<dyn Evaluator + 'a> =
            Arc::new(ScopeEvaluator::new(store, direct_scope)?);
        let in_scope: Arc<dyn Evaluator + 'a> = Arc::new(ScopeEvaluator::new(store, *scope)?);

        tracing::trace!("scope {} of {base} follows alias targets", scope.scope);
        Ok(Box::new(OrCursor::new(vec![
            (members, in_direct_scope),
            (targets, in_scope),
        ])))
    }
}

impl Cursor for ScopeCursor<'_> {
    fn before_first(&mut self) -> Result<(), SearchError> {
        self.inner.before_first()
    }

    fn after_last(&mut self) -> Result<(), SearchError> {
        self.inner.after_last()
    }

    fn next(&mut self) -> Result<bool, SearchError> {
        self.inner.next()
    }

    fn previous(&mut self) -> Result<bool, SearchError> {
        self.inner.previous()
    }

    fn available(&self) -> bool {
        self.inner.available()
    }

    fn get(&self) -> Result<IndexEntry, SearchError> {
        let candidate = self.inner.get()?;
        Ok(IndexEntry {
            value: None,
            ..candidate
        })
    }

    fn close(&mut self) -> Result<(), SearchError> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::collect_ids;
    use crate::schema::Schema;
    use crate::testing::{self, ADMINS, BAR, FIZZ, FOO, FOOLINK, GROUPS, SYSTEM, USERS};
    use crate::types::EntryId;

    fn ids(
        store: &dyn Store,
        base: EntryId,
        scope: SearchScope,
        deref: AliasDerefMode,
    ) -> Vec<EntryId> {
        let mut cursor =
            ScopeCursor::new(store, &ScopeAssertion::new(base, scope, deref)).expect("cursor");
        let ids = collect_ids(&mut cursor).expect("collect");
        cursor.close().expect("close");
        ids
    }

    #[test]
    fn test_object() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let never = AliasDerefMode::NeverDerefAliases;
        assert_eq!(ids(&store, FOO, SearchScope::Object, never), vec![FOO]);
        assert_eq!(ids(&store, EntryId(99), SearchScope::Object, never), vec![]);
        assert_eq!(ids(&store, FOOLINK, SearchScope::Object, never), vec![FOOLINK]);
        assert_eq!(
            ids(&store, FOOLINK, SearchScope::Object, AliasDerefMode::DerefInSearching),
            vec![]
        );
    }

    #[test]
    fn test_one_level_and_subtree() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let never = AliasDerefMode::NeverDerefAliases;
        assert_eq!(ids(&store, USERS, SearchScope::OneLevel, never), vec![FOO, BAR, FIZZ]);
        assert_eq!(ids(&store, SYSTEM, SearchScope::OneLevel, never), vec![USERS, GROUPS]);
        assert_eq!(
            ids(&store, GROUPS, SearchScope::Subtree, never),
            vec![GROUPS, ADMINS, FOOLINK]
        );
        assert_eq!(ids(&store, SYSTEM, SearchScope::Subtree, never).len(), 8);
    }

    #[test]
    fn test_deref_in_searching() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let always = AliasDerefMode::DerefAlways;
        assert_eq!(ids(&store, GROUPS, SearchScope::OneLevel, always), vec![ADMINS, FOO]);
        assert_eq!(ids(&store, GROUPS, SearchScope::Subtree, always), vec![GROUPS, ADMINS, FOO]);

        // The target is already inside a subtree rooted at the context entry.
        let everything = ids(&store, SYSTEM, SearchScope::Subtree, always);
        assert_eq!(everything, vec![SYSTEM, USERS, FOO, BAR, FIZZ, GROUPS, ADMINS]);
    }

    #[test]
    fn test_seek_unsupported() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let scope =
            ScopeAssertion::new(USERS, SearchScope::OneLevel, AliasDerefMode::NeverDerefAliases);
        let mut cursor = ScopeCursor::new(&store, &scope).expect("cursor");
        assert_eq!(
            cursor.after(&IndexEntry::new(FOO)),
            Err(SearchError::UnsupportedOperation("after"))
        );
        assert!(cursor.first().expect("first"));
        assert_eq!(cursor.get().expect("get").value, None);
    }
}
