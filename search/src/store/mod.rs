//! Store and index interfaces consumed by the search subsystem.
//!
//! The search engine never owns entry or index data. It borrows a `Store` for
//! the lifetime of a request and reads through these traits:
//!
//! - `Store`: the entry table keyed by `EntryId`, plus the distinguished
//!   indices (presence, ndn, alias, hierarchy).
//! - `Index<K>`: a sorted, non-unique `key <-> id` mapping.
//! - `IndexCursor<K>`: a bidirectional positional cursor over an index.
//!
//! # Index Orders
//!
//! - Forward cursors are ordered by `(key, id)`.
//! - Reverse cursors are ordered by `(id, key)`.
//!
//! `MemoryStore` is the in-memory reference implementation used by the
//! binary and the tests.

mod dump;
mod memory_index;
mod memory_store;

use std::sync::Arc;

pub use dump::{DirectoryDump, DumpEntry};
pub use memory_index::{MemoryIndex, MemoryIndexCursor};
pub use memory_store::{MemoryStore, MemoryStoreBuilder};

use crate::schema::AttributeType;
use crate::types::{Dn, Entry, EntryId, Value};

/// One `(key, id)` tuple read from an index cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTuple<K> {
    /// The indexed key (attribute value, parent id, normalized name, ...).
    pub key: K,
    /// The entry the key belongs to.
    pub id: EntryId,
}

impl<K> IndexTuple<K> {
    /// Create a new tuple.
    #[must_use]
    pub const fn new(key: K, id: EntryId) -> Self {
        Self { key, id }
    }
}

/// A bidirectional positional cursor over an index.
///
/// The cursor sits either before the first tuple, on a tuple, in a gap
/// between tuples (after a seek), or after the last tuple. Only the "on a
/// tuple" state is `available`.
pub trait IndexCursor<K> {
    /// Move before the first tuple.
    fn before_first(&mut self) -> Result<(), StoreError>;

    /// Move after the last tuple.
    fn after_last(&mut self) -> Result<(), StoreError>;

    /// Move into the gap before the first tuple `>= (key, id)`.
    ///
    /// A missing `id` means the smallest id for `key`.
    fn before(&mut self, key: &K, id: Option<EntryId>) -> Result<(), StoreError>;

    /// Move into the gap after the last tuple `<= (key, id)`.
    ///
    /// A missing `id` means the largest id for `key`.
    fn after(&mut self, key: &K, id: Option<EntryId>) -> Result<(), StoreError>;

    /// Advance one tuple. Returns whether a tuple is now available.
    fn next(&mut self) -> Result<bool, StoreError>;

    /// Step back one tuple. Returns whether a tuple is now available.
    fn previous(&mut self) -> Result<bool, StoreError>;

    /// Whether the cursor is positioned on a tuple.
    fn available(&self) -> bool;

    /// The current tuple.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidCursorPosition` when not `available`.
    fn get(&self) -> Result<IndexTuple<K>, StoreError>;

    /// Release the cursor. Further calls fail with `StoreError::CursorClosed`.
    fn close(&mut self) -> Result<(), StoreError>;
}

/// A sorted, non-unique mapping between keys and entry ids.
pub trait Index<K>: Send + Sync {
    /// OID (or name, for system indices) of the indexed attribute.
    fn attribute_id(&self) -> &str;

    /// Total number of tuples.
    fn count(&self) -> Result<u64, StoreError>;

    /// Number of tuples with exactly this key.
    fn count_of(&self, key: &K) -> Result<u64, StoreError>;

    /// Number of tuples with a key `>= key`.
    fn greater_than_count(&self, key: &K) -> Result<u64, StoreError>;

    /// Number of tuples with a key `<= key`.
    fn less_than_count(&self, key: &K) -> Result<u64, StoreError>;

    /// Cursor over all tuples in `(key, id)` order.
    fn forward_cursor(&self) -> Result<Box<dyn IndexCursor<K> + '_>, StoreError>;

    /// Cursor over the tuples of one key, in id order.
    fn forward_cursor_for(&self, key: &K) -> Result<Box<dyn IndexCursor<K> + '_>, StoreError>;

    /// Cursor over all tuples in `(id, key)` order.
    fn reverse_cursor(&self) -> Result<Box<dyn IndexCursor<K> + '_>, StoreError>;

    /// Cursor over the keys of one id, in key order.
    fn reverse_cursor_for(&self, id: EntryId)
    -> Result<Box<dyn IndexCursor<K> + '_>, StoreError>;

    /// The smallest key of an id, if it has any.
    fn reverse_lookup(&self, id: EntryId) -> Result<Option<K>, StoreError>;

    /// Whether the tuple `(key, id)` exists.
    fn has(&self, key: &K, id: EntryId) -> Result<bool, StoreError>;
}

/// The entry table and its indices.
///
/// Implementations must be safe for concurrent reads; the search subsystem
/// never writes.
pub trait Store: Send + Sync {
    /// Resolve a normalized name to an id.
    fn entry_id(&self, dn: &Dn) -> Result<Option<EntryId>, StoreError>;

    /// Materialize an entry.
    fn lookup(&self, id: EntryId) -> Result<Option<Arc<Entry>>, StoreError>;

    /// Whether a user index exists on the attribute.
    fn has_user_index_on(&self, attribute_type: &AttributeType) -> bool;

    /// Whether a system index exists on the attribute.
    fn has_system_index_on(&self, attribute_type: &AttributeType) -> bool;

    /// Whether any index exists on the attribute.
    fn has_index_on(&self, attribute_type: &AttributeType) -> bool {
        self.has_user_index_on(attribute_type) || self.has_system_index_on(attribute_type)
    }

    /// The user or system index on an attribute.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IndexNotFound` when the attribute is not indexed.
    fn index(&self, attribute_type: &AttributeType) -> Result<&dyn Index<Value>, StoreError>;

    /// Attribute OID -> ids of entries carrying a user-indexed attribute.
    fn presence_index(&self) -> &dyn Index<String>;

    /// Normalized name -> id, the universal full-scan source.
    fn ndn_index(&self) -> &dyn Index<Dn>;

    /// Alias target name -> alias entry id.
    fn alias_index(&self) -> &dyn Index<Dn>;

    /// Parent id -> child ids.
    fn one_level_index(&self) -> &dyn Index<EntryId>;

    /// Ancestor-or-self id -> descendant ids.
    fn sub_level_index(&self) -> &dyn Index<EntryId>;

    /// Parent id of an alias -> alias target id.
    fn one_alias_index(&self) -> &dyn Index<EntryId>;

    /// Ancestor id of an alias -> alias target id, for targets outside that
    /// ancestor's subtree.
    fn sub_alias_index(&self) -> &dyn Index<EntryId>;

    /// Number of entries.
    fn count(&self) -> Result<u64, StoreError>;

    /// Number of direct children of an entry.
    fn child_count(&self, id: EntryId) -> Result<u64, StoreError> {
        self.one_level_index().count_of(&id)
    }

    /// The context entry's name.
    fn suffix(&self) -> &Dn;

    /// The default id: parent key of the context entry.
    fn default_id(&self) -> EntryId {
        EntryId::ROOT
    }

    /// The context entry's id, if the context entry exists.
    fn context_entry_id(&self) -> Result<Option<EntryId>, StoreError> {
        self.entry_id(self.suffix())
    }
}

/// Errors returned by store and index access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No entry with this id.
    EntryNotFound(EntryId),
    /// The attribute has no index.
    IndexNotFound(String),
    /// An attribute name could not be resolved against the schema.
    UnknownAttribute(String),
    /// An entry with this name already exists.
    DuplicateEntry(Dn),
    /// An entry was added before its parent.
    MissingParent(Dn),
    /// A name is not a valid distinguished name.
    InvalidDn(String),
    /// A directory dump could not be decoded.
    InvalidDump(String),
    /// `get` was called on a cursor that is not positioned on a tuple.
    InvalidCursorPosition,
    /// The cursor was used after `close`.
    CursorClosed,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::IndexNotFound(attribute) => write!(f, "no index on attribute: {attribute}"),
            Self::UnknownAttribute(name) => write!(f, "unknown attribute: {name}"),
            Self::DuplicateEntry(dn) => write!(f, "entry already exists: {dn}"),
            Self::MissingParent(dn) => write!(f, "parent entry missing for: {dn}"),
            Self::InvalidDn(raw) => write!(f, "invalid distinguished name: '{raw}'"),
            Self::InvalidDump(message) => write!(f, "invalid directory dump: {message}"),
            Self::InvalidCursorPosition => write!(f, "index cursor is not positioned on a tuple"),
            Self::CursorClosed => write!(f, "index cursor is closed"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::EntryNotFound(EntryId(3)).to_string(),
            "entry not found: #3"
        );
        assert_eq!(
            StoreError::IndexNotFound("cn".to_owned()).to_string(),
            "no index on attribute: cn"
        );
    }
}
