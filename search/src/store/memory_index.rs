//! Sorted-vector index implementation.
//!
//! A `MemoryIndex` is built once from its tuples and is immutable afterwards,
//! so both orders are kept as sorted, deduplicated vectors and cursors walk
//! sub-slices of them by position.

use std::marker::PhantomData;

use super::{Index, IndexCursor, IndexTuple, StoreError};
use crate::types::EntryId;

/// Tuple stored in `(key, id)` order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Forward<K>(K, EntryId);

/// Tuple stored in `(id, key)` order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Reverse<K>(EntryId, K);

/// Conversion between a stored tuple and the cursor-facing `IndexTuple`.
trait Ordered<K>: Ord + Sized {
    fn tuple(&self) -> IndexTuple<K>;
    fn seek_key(key: &K, id: EntryId) -> Self;
}

impl<K: Ord + Clone> Ordered<K> for Forward<K> {
    fn tuple(&self) -> IndexTuple<K> {
        IndexTuple::new(self.0.clone(), self.1)
    }

    fn seek_key(key: &K, id: EntryId) -> Self {
        Self(key.clone(), id)
    }
}

impl<K: Ord + Clone> Ordered<K> for Reverse<K> {
    fn tuple(&self) -> IndexTuple<K> {
        IndexTuple::new(self.1.clone(), self.0)
    }

    fn seek_key(key: &K, id: EntryId) -> Self {
        Self(id, key.clone())
    }
}

/// An immutable in-memory index.
///
/// # Invariants
///
/// - `forward` is sorted by `(key, id)` and holds no duplicates.
/// - `reverse` holds exactly the same tuples sorted by `(id, key)`.
#[derive(Debug)]
pub struct MemoryIndex<K> {
    attribute_id: String,
    forward: Vec<Forward<K>>,
    reverse: Vec<Reverse<K>>,
}

impl<K: Ord + Clone> MemoryIndex<K> {
    /// Build an index from unsorted tuples. Duplicate tuples collapse.
    pub fn from_tuples(
        attribute_id: impl Into<String>,
        tuples: impl IntoIterator<Item = (K, EntryId)>,
    ) -> Self {
        let mut forward: Vec<Forward<K>> = tuples
            .into_iter()
            .map(|(key, id)| Forward(key, id))
            .collect();
        forward.sort();
        forward.dedup();

        let mut reverse: Vec<Reverse<K>> = forward
            .iter()
            .map(|Forward(key, id)| Reverse(*id, key.clone()))
            .collect();
        reverse.sort();

        Self {
            attribute_id: attribute_id.into(),
            forward,
            reverse,
        }
    }

    /// Create an empty index.
    pub fn empty(attribute_id: impl Into<String>) -> Self {
        Self::from_tuples(attribute_id, std::iter::empty())
    }

    /// The sub-slice of `forward` holding one key.
    fn forward_range(&self, key: &K) -> &[Forward<K>] {
        let start = self.forward.partition_point(|t| t.0 < *key);
        let end = self.forward.partition_point(|t| t.0 <= *key);
        &self.forward[start..end]
    }

    /// The sub-slice of `reverse` holding one id.
    fn reverse_range(&self, id: EntryId) -> &[Reverse<K>] {
        let start = self.reverse.partition_point(|t| t.0 < id);
        let end = self.reverse.partition_point(|t| t.0 <= id);
        &self.reverse[start..end]
    }
}

fn as_count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl<K: Ord + Clone + Send + Sync> Index<K> for MemoryIndex<K> {
    fn attribute_id(&self) -> &str {
        &self.attribute_id
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(as_count(self.forward.len()))
    }

    fn count_of(&self, key: &K) -> Result<u64, StoreError> {
        Ok(as_count(self.forward_range(key).len()))
    }

    fn greater_than_count(&self, key: &K) -> Result<u64, StoreError> {
        let start = self.forward.partition_point(|t| t.0 < *key);
        Ok(as_count(self.forward.len() - start))
    }

    fn less_than_count(&self, key: &K) -> Result<u64, StoreError> {
        Ok(as_count(self.forward.partition_point(|t| t.0 <= *key)))
    }

    fn forward_cursor(&self) -> Result<Box<dyn IndexCursor<K> + '_>, StoreError> {
        Ok(Box::new(MemoryIndexCursor::new(&self.forward)))
    }

    fn forward_cursor_for(&self, key: &K) -> Result<Box<dyn IndexCursor<K> + '_>, StoreError> {
        Ok(Box::new(MemoryIndexCursor::new(self.forward_range(key))))
    }

    fn reverse_cursor(&self) -> Result<Box<dyn IndexCursor<K> + '_>, StoreError> {
        Ok(Box::new(MemoryIndexCursor::new(&self.reverse)))
    }

    fn reverse_cursor_for(
        &self,
        id: EntryId,
    ) -> Result<Box<dyn IndexCursor<K> + '_>, StoreError> {
        Ok(Box::new(MemoryIndexCursor::new(self.reverse_range(id))))
    }

    fn reverse_lookup(&self, id: EntryId) -> Result<Option<K>, StoreError> {
        Ok(self.reverse_range(id).first().map(|t| t.1.clone()))
    }

    fn has(&self, key: &K, id: EntryId) -> Result<bool, StoreError> {
        Ok(self
            .forward
            .binary_search(&Forward(key.clone(), id))
            .is_ok())
    }
}

/// Cursor position over a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    /// On the tuple at this offset.
    On(usize),
    /// Between `offset - 1` and `offset`.
    Gap(usize),
    AfterLast,
}

/// Cursor over a sorted slice of a `MemoryIndex`.
pub struct MemoryIndexCursor<'a, K, T> {
    items: &'a [T],
    position: Position,
    closed: bool,
    _key: PhantomData<K>,
}

impl<'a, K, T> MemoryIndexCursor<'a, K, T> {
    const fn new(items: &'a [T]) -> Self {
        Self {
            items,
            position: Position::BeforeFirst,
            closed: false,
            _key: PhantomData,
        }
    }

    const fn check_open(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::CursorClosed)
        } else {
            Ok(())
        }
    }
}

#[allow(private_bounds)]
impl<K, T: Ordered<K>> IndexCursor<K> for MemoryIndexCursor<'_, K, T> {
    fn before_first(&mut self) -> Result<(), StoreError> {
        self.check_open()?;
        self.position = Position::BeforeFirst;
        Ok(())
    }

    fn after_last(&mut self) -> Result<(), StoreError> {
        self.check_open()?;
        self.position = Position::AfterLast;
        Ok(())
    }

    fn before(&mut self, key: &K, id: Option<EntryId>) -> Result<(), StoreError> {
        self.check_open()?;
        let probe = T::seek_key(key, id.unwrap_or(EntryId::MIN));
        self.position = Position::Gap(self.items.partition_point(|t| *t < probe));
        Ok(())
    }

    fn after(&mut self, key: &K, id: Option<EntryId>) -> Result<(), StoreError> {
        self.check_open()?;
        let probe = T::seek_key(key, id.unwrap_or(EntryId::MAX));
        self.position = Position::Gap(self.items.partition_point(|t| *t <= probe));
        Ok(())
    }

    fn next(&mut self) -> Result<bool, StoreError> {
        self.check_open()?;
        let candidate = match self.position {
            Position::BeforeFirst => 0,
            Position::On(offset) => offset + 1,
            Position::Gap(offset) => offset,
            Position::AfterLast => return Ok(false),
        };

        if candidate < self.items.len() {
            self.position = Position::On(candidate);
            Ok(true)
        } else {
            self.position = Position::AfterLast;
            Ok(false)
        }
    }

    fn previous(&mut self) -> Result<bool, StoreError> {
        self.check_open()?;
        let bound = match self.position {
            Position::AfterLast => self.items.len(),
            Position::On(offset) | Position::Gap(offset) => offset,
            Position::BeforeFirst => return Ok(false),
        };

        if bound > 0 {
            self.position = Position::On(bound - 1);
            Ok(true)
        } else {
            self.position = Position::BeforeFirst;
            Ok(false)
        }
    }

    fn available(&self) -> bool {
        !self.closed && matches!(self.position, Position::On(_))
    }

    fn get(&self) -> Result<IndexTuple<K>, StoreError> {
        self.check_open()?;
        match self.position {
            Position::On(offset) => self
                .items
                .get(offset)
                .map(Ordered::tuple)
                .ok_or(StoreError::InvalidCursorPosition),
            _ => Err(StoreError::InvalidCursorPosition),
        }
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        Ok(())
    }
}
