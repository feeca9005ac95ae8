//! The cursor a leaf node resolves to.

use super::{Cursor, FilteredCursor, IndexKey, IndexedCursor};
use crate::error::SearchError;
use crate::types::{EntryId, IndexEntry, Value};

/// A leaf's candidates: straight from its index, or a full scan filtered
/// through its evaluator when the attribute has no index.
pub enum LeafCursor<'a, K = Value> {
    Indexed(IndexedCursor<'a, K>),
    FullScan(FilteredCursor<'a>),
}

impl<'a, K: IndexKey> LeafCursor<'a, K> {
    fn active(&mut self) -> &mut (dyn Cursor + 'a) {
        match self {
            Self::Indexed(cursor) => cursor,
            Self::FullScan(cursor) => cursor,
        }
    }

    fn active_ref(&self) -> &(dyn Cursor + 'a) {
        match self {
            Self::Indexed(cursor) => cursor,
            Self::FullScan(cursor) => cursor,
        }
    }

    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed(_))
    }
}

impl<K: IndexKey> Cursor for LeafCursor<'_, K> {
    fn before_first(&mut self) -> Result<(), SearchError> {
        self.active().before_first()
    }

    fn after_last(&mut self) -> Result<(), SearchError> {
        self.active().after_last()
    }

    fn next(&mut self) -> Result<bool, SearchError> {
        self.active().next()
    }

    fn previous(&mut self) -> Result<bool, SearchError> {
        self.active().previous()
    }

    fn available(&self) -> bool {
        self.active_ref().available()
    }

    fn get(&self) -> Result<IndexEntry, SearchError> {
        self.active_ref().get()
    }

    fn before(&mut self, element: &IndexEntry) -> Result<(), SearchError> {
        self.active().before(element)
    }

    fn after(&mut self, element: &IndexEntry) -> Result<(), SearchError> {
        self.active().after(element)
    }

    fn before_value(&mut self, id: EntryId, value: &Value) -> Result<(), SearchError> {
        self.active().before_value(id, value)
    }

    fn after_value(&mut self, id: EntryId, value: &Value) -> Result<(), SearchError> {
        self.active().after_value(id, value)
    }

    fn close(&mut self) -> Result<(), SearchError> {
        self.active().close()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cursor::{AllEntriesCursor, collect_ids};
    use crate::evaluator::EqualityEvaluator;
    use crate::schema::{Schema, SchemaManager};
    use crate::store::Store;
    use crate::testing::{self, BAR};

    #[test]
    fn test_indexed_and_full_scan_agree() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let cn = schema.lookup("cn").expect("cn");

        let index = store.index(&cn).expect("index");
        let bar = IndexedCursor::for_key(index, &Value::text("bar")).expect("cursor");
        let mut indexed: LeafCursor<'_> = LeafCursor::Indexed(bar);
        assert!(indexed.is_indexed());

        let evaluator = Arc::new(EqualityEvaluator::new(&store, cn, "BAR").expect("evaluator"));
        let mut scan: LeafCursor<'_> = LeafCursor::FullScan(FilteredCursor::accepting(
            Box::new(AllEntriesCursor::new(&store).expect("all")),
            evaluator,
        ));
        assert!(!scan.is_indexed());

        assert_eq!(collect_ids(&mut indexed).expect("collect"), vec![BAR]);
        assert_eq!(collect_ids(&mut scan).expect("collect"), vec![BAR]);

        indexed.close().expect("close");
        assert!(!indexed.available());
        assert_eq!(indexed.next(), Err(SearchError::CursorClosed));
    }
}
