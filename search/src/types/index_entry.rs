//! The candidate record flowing through evaluators and cursors.

use std::sync::Arc;

use super::{Entry, EntryId, Value};

/// A lazily populated projection of one candidate.
///
/// Cursors produce it with whatever they already know (always the id, usually
/// the index value). Evaluators fill in `value` when they match on a concrete
/// value and cache the looked up entry in `object`, so sibling evaluators of
/// the same traversal step never hit the store twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: EntryId,
    pub value: Option<Value>,
    pub object: Option<Arc<Entry>>,
}

impl IndexEntry {
    /// A candidate known only by id.
    #[must_use]
    pub const fn new(id: EntryId) -> Self {
        Self {
            id,
            value: None,
            object: None,
        }
    }

    /// A candidate read from an index tuple.
    #[must_use]
    pub const fn with_value(id: EntryId, value: Value) -> Self {
        Self {
            id,
            value: Some(value),
            object: None,
        }
    }

    /// A candidate whose entry is already materialized.
    #[must_use]
    pub fn with_entry(id: EntryId, entry: Arc<Entry>) -> Self {
        Self {
            id,
            value: None,
            object: Some(entry),
        }
    }

    /// Record the value a leaf matched on, unless one is already present.
    pub fn fill_value(&mut self, value: impl FnOnce() -> Value) {
        if self.value.is_none() {
            self.value = Some(value());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_value_keeps_existing() {
        let mut candidate = IndexEntry::with_value(EntryId(1), Value::text("a"));
        candidate.fill_value(|| Value::text("b"));
        assert_eq!(candidate.value, Some(Value::text("a")));

        let mut bare = IndexEntry::new(EntryId(2));
        bare.fill_value(|| Value::text("b"));
        assert_eq!(bare.value, Some(Value::text("b")));
    }
}
