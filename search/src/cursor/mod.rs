//! Bidirectional candidate cursors.
//!
//! A cursor tree mirrors the filter tree and enumerates candidates lazily:
//!
//! - `IndexedCursor` walks an index, filtered to a key range or pattern.
//! - `AllEntriesCursor` walks every entry in id order (the ndn index).
//! - `FilteredCursor` passes another cursor's candidates through an evaluator;
//!   it is both the full-scan fallback of unindexed leaves and the NOT cursor.
//! - `LeafCursor` is the `Indexed | FullScan` choice a leaf node resolves to.
//! - `AndCursor` walks one driving child and filters through its siblings'
//!   evaluators.
//! - `OrCursor` walks its children in turn, skipping candidates an earlier
//!   child already produced.
//! - `ScopeCursor` walks the hierarchy indices below a base.
//! - `EmptyCursor` and `SingletonCursor` hold zero or one candidate.
//!
//! # Positions
//!
//! A cursor is before the first candidate, on a candidate, or after the last
//! one. `next` and `previous` move one step and report whether a candidate is
//! now available. Walking forward from `before_first` and backward from
//! `after_last` visit the same candidates in opposite orders.
//!
//! Every cursor must be closed. Closing a composite cursor closes everything
//! it wraps; any use after `close` fails with `SearchError::CursorClosed`.

mod all_entries;
mod and;
mod builder;
mod indexed;
mod leaf;
mod or;
mod scope;

pub use all_entries::{AllEntriesCursor, FilteredCursor};
pub use and::{AndCursor, select_driver};
pub use builder::CursorBuilder;
pub use indexed::{IndexKey, IndexedCursor, KeyRange};
pub use leaf::LeafCursor;
pub use or::OrCursor;
pub use scope::ScopeCursor;

use crate::error::SearchError;
use crate::types::{EntryId, IndexEntry, Value};

/// A bidirectional, positional cursor over candidates.
pub trait Cursor {
    /// Move before the first candidate.
    fn before_first(&mut self) -> Result<(), SearchError>;

    /// Move after the last candidate.
    fn after_last(&mut self) -> Result<(), SearchError>;

    /// Move to the first candidate.
    fn first(&mut self) -> Result<bool, SearchError> {
        self.before_first()?;
        self.next()
    }

    /// Move to the last candidate.
    fn last(&mut self) -> Result<bool, SearchError> {
        self.after_last()?;
        self.previous()
    }

    /// Advance one candidate.
    fn next(&mut self) -> Result<bool, SearchError>;

    /// Step back one candidate.
    fn previous(&mut self) -> Result<bool, SearchError>;

    /// Whether the cursor is positioned on a candidate.
    fn available(&self) -> bool;

    /// The current candidate.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidCursorPosition` when not `available`.
    fn get(&self) -> Result<IndexEntry, SearchError>;

    /// Move just before `element`, so `next` lands on it if it exists.
    fn before(&mut self, _element: &IndexEntry) -> Result<(), SearchError> {
        Err(SearchError::UnsupportedOperation("before"))
    }

    /// Move just after `element`, so `previous` lands on it if it exists.
    fn after(&mut self, _element: &IndexEntry) -> Result<(), SearchError> {
        Err(SearchError::UnsupportedOperation("after"))
    }

    /// Move just before the `(value, id)` index position.
    fn before_value(&mut self, _id: EntryId, _value: &Value) -> Result<(), SearchError> {
        Err(SearchError::UnsupportedOperation("before_value"))
    }

    /// Move just after the `(value, id)` index position.
    fn after_value(&mut self, _id: EntryId, _value: &Value) -> Result<(), SearchError> {
        Err(SearchError::UnsupportedOperation("after_value"))
    }

    /// Release the cursor and everything it wraps.
    fn close(&mut self) -> Result<(), SearchError>;
}

/// Close every cursor, returning the first failure.
fn close_all<'c, 'a: 'c>(
    cursors: impl IntoIterator<Item = &'c mut (dyn Cursor + 'a)>,
) -> Result<(), SearchError> {
    let mut first_error = None;
    for cursor in cursors {
        if let Err(e) = cursor.close() {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

const fn check_open(closed: bool) -> Result<(), SearchError> {
    if closed {
        Err(SearchError::CursorClosed)
    } else {
        Ok(())
    }
}

/// A cursor with nothing in it: the result of a search whose base does not
/// exist.
#[derive(Debug, Default)]
pub struct EmptyCursor {
    closed: bool,
}

impl EmptyCursor {
    #[must_use]
    pub const fn new() -> Self {
        Self { closed: false }
    }
}

impl Cursor for EmptyCursor {
    fn before_first(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)
    }

    fn after_last(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)
    }

    fn next(&mut self) -> Result<bool, SearchError> {
        check_open(self.closed)?;
        Ok(false)
    }

    fn previous(&mut self) -> Result<bool, SearchError> {
        check_open(self.closed)?;
        Ok(false)
    }

    fn available(&self) -> bool {
        false
    }

    fn get(&self) -> Result<IndexEntry, SearchError> {
        check_open(self.closed)?;
        Err(SearchError::InvalidCursorPosition)
    }

    fn close(&mut self) -> Result<(), SearchError> {
        self.closed = true;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SingletonPosition {
    BeforeFirst,
    On,
    AfterLast,
}

/// A cursor over exactly one candidate.
#[derive(Debug)]
pub struct SingletonCursor {
    entry: IndexEntry,
    position: SingletonPosition,
    closed: bool,
}

impl SingletonCursor {
    #[must_use]
    pub const fn new(entry: IndexEntry) -> Self {
        Self {
            entry,
            position: SingletonPosition::BeforeFirst,
            closed: false,
        }
    }
}

impl Cursor for SingletonCursor {
    fn before_first(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)?;
        self.position = SingletonPosition::BeforeFirst;
        Ok(())
    }

    fn after_last(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)?;
        self.position = SingletonPosition::AfterLast;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, SearchError> {
        check_open(self.closed)?;
        self.position = match self.position {
            SingletonPosition::BeforeFirst => SingletonPosition::On,
            SingletonPosition::On | SingletonPosition::AfterLast => SingletonPosition::AfterLast,
        };
        Ok(self.available())
    }

    fn previous(&mut self) -> Result<bool, SearchError> {
        check_open(self.closed)?;
        self.position = match self.position {
            SingletonPosition::AfterLast => SingletonPosition::On,
            SingletonPosition::On | SingletonPosition::BeforeFirst => {
                SingletonPosition::BeforeFirst
            }
        };
        Ok(self.available())
    }

    fn available(&self) -> bool {
        !self.closed && self.position == SingletonPosition::On
    }

    fn get(&self) -> Result<IndexEntry, SearchError> {
        check_open(self.closed)?;
        if self.position == SingletonPosition::On {
            Ok(self.entry.clone())
        } else {
            Err(SearchError::InvalidCursorPosition)
        }
    }

    fn close(&mut self) -> Result<(), SearchError> {
        self.closed = true;
        Ok(())
    }
}

/// Walk a cursor forward from the start and collect the candidate ids.
pub fn collect_ids(cursor: &mut dyn Cursor) -> Result<Vec<EntryId>, SearchError> {
    let mut ids = Vec::new();
    cursor.before_first()?;
    while cursor.next()? {
        ids.push(cursor.get()?.id);
    }
    Ok(ids)
}
