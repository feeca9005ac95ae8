//! Full scans.

use std::sync::Arc;

use super::{Cursor, IndexedCursor, check_open};
use crate::error::SearchError;
use crate::evaluator::Evaluator;
use crate::store::Store;
use crate::types::{Dn, IndexEntry};

/// Every entry of the store, in id order.
///
/// Walks the reverse side of the ndn index, which holds exactly one tuple per
/// entry. Candidates carry only their id: the name is not a value any filter
/// asserts on.
pub struct AllEntriesCursor<'a> {
    inner: IndexedCursor<'a, Dn>,
}

impl<'a> AllEntriesCursor<'a> {
    pub fn new(store: &'a dyn Store) -> Result<Self, SearchError> {
        Ok(Self {
            inner: IndexedCursor::by_id(store.ndn_index())?,
        })
    }
}

impl Cursor for AllEntriesCursor<'_> {
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
        Ok(IndexEntry::new(self.inner.get()?.id))
    }

    fn close(&mut self) -> Result<(), SearchError> {
        self.inner.close()
    }
}

/// Passes another cursor's candidates through an evaluator.
///
/// `accepting` keeps what the evaluator accepts: the full-scan form of an
/// unindexed leaf. `rejecting` keeps what it rejects: the NOT cursor.
pub struct FilteredCursor<'a> {
    inner: Box<dyn Cursor + 'a>,
    evaluator: Arc<dyn Evaluator + 'a>,
    keep: bool,
    current: Option<IndexEntry>,
    closed: bool,
}

impl<'a> FilteredCursor<'a> {
    #[must_use]
    pub fn accepting(inner: Box<dyn Cursor + 'a>, evaluator: Arc<dyn Evaluator + 'a>) -> Self {
        Self::new(inner, evaluator, true)
    }

    #[must_use]
    pub fn rejecting(inner: Box<dyn Cursor + 'a>, evaluator: Arc<dyn Evaluator + 'a>) -> Self {
        Self::new(inner, evaluator, false)
    }

    fn new(inner: Box<dyn Cursor + 'a>, evaluator: Arc<dyn Evaluator + 'a>, keep: bool) -> Self {
        Self {
            inner,
            evaluator,
            keep,
            current: None,
            closed: false,
        }
    }

    fn step(&mut self, forward: bool) -> Result<bool, SearchError> {
        check_open(self.closed)?;
        self.current = None;
        loop {
            let moved = if forward {
                self.inner.next()?
            } else {
                self.inner.previous()?
            };
            if !moved {
                return Ok(false);
            }
            let mut candidate = self.inner.get()?;
            if self.evaluator.evaluate(&mut candidate)? == self.keep {
                if !self.keep {
                    // A value filled in by a rejected match is not this
                    // candidate's value.
                    candidate.value = None;
                }
                self.current = Some(candidate);
                return Ok(true);
            }
        }
    }
}

impl Cursor for FilteredCursor<'_> {
    fn before_first(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)?;
        self.current = None;
        self.inner.before_first()
    }

    fn after_last(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)?;
        self.current = None;
        self.inner.after_last()
    }

    fn next(&mut self) -> Result<bool, SearchError> {
        self.step(true)
    }

    fn previous(&mut self) -> Result<bool, SearchError> {
        self.step(false)
    }

    fn available(&self) -> bool {
        !self.closed && self.current.is_some()
    }

    fn get(&self) -> Result<IndexEntry, SearchError> {
        check_open(self.closed)?;
        self.current.clone().ok_or(SearchError::InvalidCursorPosition)
    }

    fn close(&mut self) -> Result<(), SearchError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.current = None;
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::collect_ids;
    use crate::evaluator::{AliasEvaluator, EqualityEvaluator};
    use crate::schema::{Schema, SchemaManager};
    use crate::testing::{self, ADMINS, BAR, FIZZ, FOO, FOOLINK, GROUPS, SYSTEM, USERS};
    use crate::types::Value;

    #[test]
    fn test_all_entries_in_id_order() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let mut cursor = AllEntriesCursor::new(&store).expect("cursor");
        assert_eq!(
            collect_ids(&mut cursor).expect("collect"),
            vec![SYSTEM, USERS, FOO, BAR, FIZZ, GROUPS, ADMINS, FOOLINK]
        );
        assert!(cursor.last().expect("last"));
        assert_eq!(cursor.get().expect("get"), IndexEntry::new(FOOLINK));
        assert_eq!(
            cursor.before(&IndexEntry::new(FOO)),
            Err(SearchError::UnsupportedOperation("before"))
        );
    }

    #[test]
    fn test_accepting_fills_value() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let sn = schema.lookup("sn").expect("sn");
        let evaluator = Arc::new(EqualityEvaluator::new(&store, sn, "SMITH").expect("evaluator"));
        let all = Box::new(AllEntriesCursor::new(&store).expect("all"));
        let mut cursor = FilteredCursor::accepting(all, evaluator);

        assert_eq!(collect_ids(&mut cursor).expect("collect"), vec![FOO, FIZZ]);
        assert!(cursor.last().expect("last"));
        let last = cursor.get().expect("get");
        assert_eq!(last.id, FIZZ);
        assert_eq!(last.value, Some(Value::text("smith")));
    }

    #[test]
    fn test_rejecting() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let mut cursor = FilteredCursor::rejecting(
            Box::new(AllEntriesCursor::new(&store).expect("all")),
            Arc::new(AliasEvaluator::new(&store)),
        );
        let ids = collect_ids(&mut cursor).expect("collect");
        assert_eq!(ids.len(), 7);
        assert!(!ids.contains(&FOOLINK));

        cursor.close().expect("close");
        assert_eq!(cursor.previous(), Err(SearchError::CursorClosed));
    }
}
