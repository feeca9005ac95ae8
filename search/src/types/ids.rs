//! ID type for directory entries.
//!
//! Entry IDs are opaque handles into a `Store`. They carry no meaning beyond
//! identity and ordering: the store assigns them, and every index orders its
//! tuples by them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for an entry within a store.
///
/// Wraps the store's native 64-bit key. The inner field is public to allow
/// direct access when building indices.
///
/// # Invariants
///
/// - `EntryId::ROOT` (0) is never assigned to a real entry; it is the parent
///   key of the context entry in the one-level index.
/// - IDs are totally ordered, which gives the ndn reverse cursor its order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl EntryId {
    /// The default id: parent of the context entry.
    pub const ROOT: Self = Self(0);
    /// Smallest possible id, used as a lower range bound.
    pub const MIN: Self = Self(u64::MIN);
    /// Largest possible id, used as an upper range bound.
    pub const MAX: Self = Self(u64::MAX);

    /// Get the underlying integer.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for EntryId {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl From<EntryId> for u64 {
    fn from(id: EntryId) -> Self {
        id.0
    }
}
