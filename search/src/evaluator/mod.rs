//! Predicate trees.
//!
//! An evaluator tests one candidate against one filter sub-expression. The
//! tree mirrors the filter: leaf evaluators for attribute assertions, branch
//! evaluators for `&`, `|` and `!`, and scope evaluators for the node the
//! search engine adds.
//!
//! Evaluators are immutable once built and are shared as
//! `Arc<dyn Evaluator + 'a>`: an AND cursor consults its non-driving
//! children's evaluators, an OR cursor keeps one per child, and full-scan
//! leaf cursors filter through their node's evaluator.
//!
//! # Representations
//!
//! Every evaluator accepts a candidate three ways, with identical results for
//! the same entry:
//!
//! - `evaluate(&mut IndexEntry)` picks the cheapest path (an index probe when
//!   one exists, else the entry) and fills in the candidate's `value` and
//!   `object` as it goes.
//! - `evaluate_id(id)` starts from a bare id.
//! - `evaluate_entry(&Entry)` works on an entry obtained some other way.

mod branch;
mod builder;
mod leaf;
mod scope;
mod substring;

use std::sync::Arc;

pub use branch::{AndEvaluator, NotEvaluator, OrEvaluator};
pub use builder::EvaluatorBuilder;
pub use leaf::{EqualityEvaluator, OrderingBound, OrderingEvaluator, PresenceEvaluator};
pub use scope::{AliasEvaluator, ScopeEvaluator};
pub use substring::SubstringEvaluator;

use crate::error::SearchError;
use crate::store::{Index, Store};
use crate::types::{Entry, EntryId, IndexEntry, Value};

/// A predicate over candidates.
pub trait Evaluator: Send + Sync {
    /// Test a candidate, filling in its `value` and `object` when they are
    /// learned along the way.
    fn evaluate(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError>;

    /// Test a candidate known only by id.
    fn evaluate_id(&self, id: EntryId) -> Result<bool, SearchError> {
        self.evaluate(&mut IndexEntry::new(id))
    }

    /// Test an already materialized entry.
    fn evaluate_entry(&self, entry: &Entry) -> Result<bool, SearchError>;
}

/// The candidate's entry, looked up once and cached on the candidate.
///
/// Returns `None` when the entry no longer exists.
fn candidate_entry(
    store: &dyn Store,
    candidate: &mut IndexEntry,
) -> Result<Option<Arc<Entry>>, SearchError> {
    if let Some(entry) = &candidate.object {
        return Ok(Some(Arc::clone(entry)));
    }
    let entry = store.lookup(candidate.id)?;
    candidate.object.clone_from(&entry);
    Ok(entry)
}

/// The smallest value an id carries in `index` that satisfies `accept`.
fn first_indexed_value(
    index: &dyn Index<Value>,
    id: EntryId,
    accept: impl Fn(&Value) -> bool,
) -> Result<Option<Value>, SearchError> {
    let mut cursor = index.reverse_cursor_for(id)?;
    let mut found = None;
    while cursor.next()? {
        let tuple = cursor.get()?;
        if accept(&tuple.key) {
            found = Some(tuple.key);
            break;
        }
    }
    cursor.close()?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::store::MemoryStore;

    #[test]
    fn test_candidate_entry_is_cached() {
        let schema = Schema::bootstrap();
        let mut builder = MemoryStore::builder(&schema, "ou=system").expect("builder");
        builder.add("ou=system", [("ou", "system")]).expect("add");
        let store = builder.build();

        let mut candidate = IndexEntry::new(EntryId(1));
        let entry = candidate_entry(&store, &mut candidate)
            .expect("lookup")
            .expect("present");
        assert_eq!(entry.dn.to_string(), "ou=system");
        assert!(candidate.object.is_some());

        let mut missing = IndexEntry::new(EntryId(7));
        assert!(candidate_entry(&store, &mut missing).expect("lookup").is_none());
        assert!(missing.object.is_none());
    }
}
