//! Cursors over index tuples.

use regex::Regex;

use super::{Cursor, check_open};
use crate::error::SearchError;
use crate::store::{Index, IndexCursor, IndexTuple};
use crate::types::{Dn, EntryId, IndexEntry, Value};

/// Index key types a cursor can surface as candidate values.
pub trait IndexKey: Clone + Ord + Send + Sync + 'static {
    /// The key as a candidate value.
    fn to_value(&self) -> Value;

    /// The key a seek value names, if it names one of this type.
    fn from_value(value: &Value) -> Option<Self>;
}

impl IndexKey for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl IndexKey for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_text().map(str::to_owned)
    }
}

impl IndexKey for EntryId {
    fn to_value(&self) -> Value {
        Value::Id(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Id(id) => Some(*id),
            _ => None,
        }
    }
}

impl IndexKey for Dn {
    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_text().and_then(Self::parse)
    }
}

/// Where a key lies relative to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Place {
    Below,
    Inside,
    Above,
}

/// The keys an `IndexedCursor` yields.
#[derive(Debug, Clone)]
pub enum KeyRange {
    /// Every key.
    All,
    /// Keys `>=` the bound.
    AtLeast(Value),
    /// Keys `<=` the bound.
    AtMost(Value),
    /// Keys matching a substring pattern. When every match starts with a
    /// known text prefix, only the keys carrying it are walked.
    Pattern { regex: Regex, prefix: Option<String> },
}

impl KeyRange {
    fn place(&self, key: &Value) -> Place {
        match self {
            Self::All | Self::Pattern { prefix: None, .. } => Place::Inside,
            Self::AtLeast(bound) if key < bound => Place::Below,
            Self::AtMost(bound) if key > bound => Place::Above,
            Self::AtLeast(_) | Self::AtMost(_) => Place::Inside,
            Self::Pattern {
                prefix: Some(prefix),
                ..
            } => match key {
                Value::Text(text) if text.starts_with(prefix.as_str()) => Place::Inside,
                Value::Text(text) if text.as_str() < prefix.as_str() => Place::Below,
                Value::Text(_) => Place::Above,
                _ => Place::Inside,
            },
        }
    }

    fn accepts(&self, key: &Value) -> bool {
        match self {
            Self::Pattern { regex, .. } => {
                self.place(key) == Place::Inside && regex.is_match(&key.to_match_string())
            }
            _ => self.place(key) == Place::Inside,
        }
    }

    /// Seek key for the start of the range.
    fn lower(&self) -> Option<Value> {
        match self {
            Self::AtLeast(bound) => Some(bound.clone()),
            Self::Pattern {
                prefix: Some(prefix),
                ..
            } => Some(Value::text(prefix.as_str())),
            _ => None,
        }
    }

    /// Seek key past the end of the range.
    fn upper(&self) -> Option<Value> {
        match self {
            Self::AtMost(bound) => Some(bound.clone()),
            Self::Pattern {
                prefix: Some(prefix),
                ..
            } => Some(Value::Text(format!("{prefix}{}", char::MAX))),
            _ => None,
        }
    }
}

/// Walks an index cursor, yielding tuples inside a `KeyRange`.
///
/// # Invariants
///
/// - With `distinct_ids`, a tuple is only yielded when its key is the
///   smallest in-range key of its id, so a multi-valued entry appears once in
///   either direction.
/// - Leaving the range forward jumps to the end of the range, and leaving it
///   backward jumps to its start, instead of walking the rest of the index.
pub struct IndexedCursor<'a, K> {
    index: &'a dyn Index<K>,
    source: Box<dyn IndexCursor<K> + 'a>,
    range: KeyRange,
    distinct_ids: bool,
    current: Option<IndexEntry>,
    closed: bool,
}

impl<'a, K: IndexKey> IndexedCursor<'a, K> {
    /// The tuples of one key, in id order.
    pub fn for_key(index: &'a dyn Index<K>, key: &K) -> Result<Self, SearchError> {
        Ok(Self::new(index, index.forward_cursor_for(key)?, KeyRange::All, false))
    }

    /// The ids with at least one key in `range`, in key order.
    pub fn ranged(index: &'a dyn Index<K>, range: KeyRange) -> Result<Self, SearchError> {
        Ok(Self::new(index, index.forward_cursor()?, range, true))
    }

    /// Every tuple, in id order.
    pub fn by_id(index: &'a dyn Index<K>) -> Result<Self, SearchError> {
        Ok(Self::new(index, index.reverse_cursor()?, KeyRange::All, false))
    }

    const fn new(
        index: &'a dyn Index<K>,
        source: Box<dyn IndexCursor<K> + 'a>,
        range: KeyRange,
        distinct_ids: bool,
    ) -> Self {
        Self {
            index,
            source,
            range,
            distinct_ids,
            current: None,
            closed: false,
        }
    }

    fn seek_start(&mut self) -> Result<(), SearchError> {
        match self.range.lower().as_ref().and_then(K::from_value) {
            Some(key) => self.source.before(&key, None)?,
            None => self.source.before_first()?,
        }
        Ok(())
    }

    fn seek_end(&mut self) -> Result<(), SearchError> {
        match self.range.upper().as_ref().and_then(K::from_value) {
            Some(key) => self.source.after(&key, None)?,
            None => self.source.after_last()?,
        }
        Ok(())
    }

    /// Whether `tuple` carries the smallest in-range key of its id.
    fn is_first_for_id(&self, tuple: &IndexTuple<K>) -> Result<bool, SearchError> {
        let mut keys = self.index.reverse_cursor_for(tuple.id)?;
        let mut first = None;
        while keys.next()? {
            let candidate = keys.get()?;
            if self.range.accepts(&candidate.key.to_value()) {
                first = Some(candidate.key);
                break;
            }
        }
        keys.close()?;
        Ok(first.as_ref() == Some(&tuple.key))
    }

    /// Step the source until it yields a qualifying tuple or leaves the range.
    fn step(&mut self, forward: bool) -> Result<bool, SearchError> {
        check_open(self.closed)?;
        self.current = None;
        loop {
            let moved = if forward {
                self.source.next()?
            } else {
                self.source.previous()?
            };
            if !moved {
                return Ok(false);
            }

            let tuple = self.source.get()?;
            let value = tuple.key.to_value();
            match (self.range.place(&value), forward) {
                (Place::Above, true) => {
                    self.seek_end()?;
                    return Ok(false);
                }
                (Place::Below, false) => {
                    self.seek_start()?;
                    return Ok(false);
                }
                (Place::Inside, _) => {}
                _ => continue,
            }

            if !self.range.accepts(&value) {
                continue;
            }
            if self.distinct_ids && !self.is_first_for_id(&tuple)? {
                continue;
            }
            self.current = Some(IndexEntry::with_value(tuple.id, value));
            return Ok(true);
        }
    }

    fn seek_key(value: &Value) -> Result<K, SearchError> {
        K::from_value(value).ok_or(SearchError::UnsupportedOperation(
            "seek with a value of another key type",
        ))
    }
}

impl<K: IndexKey> Cursor for IndexedCursor<'_, K> {
    fn before_first(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)?;
        self.current = None;
        self.seek_start()
    }

    fn after_last(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)?;
        self.current = None;
        self.seek_end()
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

    fn before(&mut self, element: &IndexEntry) -> Result<(), SearchError> {
        let value = element
            .value
            .as_ref()
            .ok_or(SearchError::UnsupportedOperation("seek without a value"))?;
        self.before_value(element.id, value)
    }

    fn after(&mut self, element: &IndexEntry) -> Result<(), SearchError> {
        let value = element
            .value
            .as_ref()
            .ok_or(SearchError::UnsupportedOperation("seek without a value"))?;
        self.after_value(element.id, value)
    }

    fn before_value(&mut self, id: EntryId, value: &Value) -> Result<(), SearchError> {
        check_open(self.closed)?;
        let key = Self::seek_key(value)?;
        self.current = None;
        self.source.before(&key, Some(id))?;
        Ok(())
    }

    fn after_value(&mut self, id: EntryId, value: &Value) -> Result<(), SearchError> {
        check_open(self.closed)?;
        let key = Self::seek_key(value)?;
        self.current = None;
        self.source.after(&key, Some(id))?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SearchError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.current = None;
        self.source.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryIndex;

    fn index() -> MemoryIndex<Value> {
        MemoryIndex::from_tuples(
            "cn",
            vec![
                (Value::text("apple"), EntryId(1)),
                (Value::text("apricot"), EntryId(2)),
                (Value::text("banana"), EntryId(1)),
                (Value::text("blueberry"), EntryId(3)),
                (Value::text("cherry"), EntryId(4)),
                (Value::text("date"), EntryId(2)),
            ],
        )
    }

    fn forward(cursor: &mut dyn Cursor) -> Vec<u64> {
        let mut ids = Vec::new();
        cursor.before_first().expect("before first");
        while cursor.next().expect("next") {
            ids.push(cursor.get().expect("get").id.0);
        }
        ids
    }

    fn backward(cursor: &mut dyn Cursor) -> Vec<u64> {
        let mut ids = Vec::new();
        cursor.after_last().expect("after last");
        while cursor.previous().expect("previous") {
            ids.push(cursor.get().expect("get").id.0);
        }
        ids
    }

    #[test]
    fn test_for_key() {
        let index = MemoryIndex::from_tuples(
            "cn",
            vec![
                (Value::text("foo"), EntryId(1)),
                (Value::text("bar"), EntryId(2)),
                (Value::text("foo"), EntryId(3)),
            ],
        );
        let mut cursor = IndexedCursor::for_key(&index, &Value::text("foo")).expect("cursor");
        assert_eq!(forward(&mut cursor), vec![1, 3]);
        assert_eq!(backward(&mut cursor), vec![3, 1]);
    }

    #[test]
    fn test_at_least_dedups_ids() {
        let index = index();
        let mut cursor =
            IndexedCursor::ranged(&index, KeyRange::AtLeast(Value::text("b"))).expect("cursor");
        // #1 appears once, at banana; #2 at date.
        assert_eq!(forward(&mut cursor), vec![1, 3, 4, 2]);
        assert_eq!(backward(&mut cursor), vec![2, 4, 3, 1]);
    }

    #[test]
    fn test_at_most_stops_early() {
        let index = index();
        let mut cursor =
            IndexedCursor::ranged(&index, KeyRange::AtMost(Value::text("banana"))).expect("cursor");
        assert_eq!(forward(&mut cursor), vec![1, 2]);
        assert_eq!(backward(&mut cursor), vec![2, 1]);
    }

    #[test]
    fn test_pattern_with_prefix() {
        let index = index();
        let range = KeyRange::Pattern {
            regex: Regex::new("^b.*y$").expect("regex"),
            prefix: Some("b".to_owned()),
        };
        let mut cursor = IndexedCursor::ranged(&index, range).expect("cursor");
        assert_eq!(forward(&mut cursor), vec![3]);
        assert_eq!(backward(&mut cursor), vec![3]);
    }

    #[test]
    fn test_pattern_without_prefix() {
        let index = index();
        let range = KeyRange::Pattern {
            regex: Regex::new("^.*r.*$").expect("regex"),
            prefix: None,
        };
        let mut cursor = IndexedCursor::ranged(&index, range).expect("cursor");
        assert_eq!(forward(&mut cursor), vec![2, 3, 4]);
    }

    #[test]
    fn test_get_is_idempotent() {
        let index = index();
        let mut cursor = IndexedCursor::ranged(&index, KeyRange::All).expect("cursor");
        assert!(cursor.first().expect("first"));
        let first = cursor.get().expect("get");
        assert_eq!(cursor.get().expect("get"), first);
        assert_eq!(first.value, Some(Value::text("apple")));
    }

    #[test]
    fn test_seek_before_value() {
        let index = index();
        let mut cursor = IndexedCursor::ranged(&index, KeyRange::All).expect("cursor");
        cursor
            .before_value(EntryId::MIN, &Value::text("c"))
            .expect("seek");
        assert!(!cursor.available());
        assert!(cursor.next().expect("next"));
        assert_eq!(cursor.get().expect("get").id, EntryId(4));

        cursor
            .after(&IndexEntry::with_value(EntryId(4), Value::text("cherry")))
            .expect("seek");
        assert!(cursor.previous().expect("previous"));
        assert_eq!(cursor.get().expect("get").id, EntryId(4));

        assert_eq!(
            cursor.before(&IndexEntry::new(EntryId(1))),
            Err(SearchError::UnsupportedOperation("seek without a value"))
        );
    }

    #[test]
    fn test_close() {
        let index = index();
        let mut cursor = IndexedCursor::ranged(&index, KeyRange::All).expect("cursor");
        cursor.close().expect("close");
        cursor.close().expect("close twice");
        assert_eq!(cursor.next(), Err(SearchError::CursorClosed));
        assert_eq!(cursor.get(), Err(SearchError::CursorClosed));
    }

    #[test]
    fn test_by_id() {
        let index = index();
        let mut cursor = IndexedCursor::by_id(&index).expect("cursor");
        assert_eq!(forward(&mut cursor), vec![1, 1, 2, 2, 3, 4]);
    }
}
