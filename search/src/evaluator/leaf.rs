//! Presence, equality and ordering evaluators.

use std::sync::Arc;

use super::{Evaluator, candidate_entry, first_indexed_value};
use crate::error::SearchError;
use crate::schema::AttributeType;
use crate::store::Store;
use crate::types::{Entry, IndexEntry, Value};

/// `(attr=*)`: the entry carries at least one value of the attribute.
pub struct PresenceEvaluator<'a> {
    store: &'a dyn Store,
    attribute_type: Arc<AttributeType>,
}

impl<'a> PresenceEvaluator<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, attribute_type: Arc<AttributeType>) -> Self {
        Self {
            store,
            attribute_type,
        }
    }

    #[must_use]
    pub fn attribute_type(&self) -> &AttributeType {
        &self.attribute_type
    }
}

impl Evaluator for PresenceEvaluator<'_> {
    fn evaluate(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError> {
        let at = &*self.attribute_type;
        if self.store.has_user_index_on(at) {
            return Ok(self.store.presence_index().has(&at.oid, candidate.id)?);
        }
        if self.store.has_system_index_on(at) {
            let index = self.store.index(at)?;
            return Ok(index.reverse_lookup(candidate.id)?.is_some());
        }
        match candidate_entry(self.store, candidate)? {
            Some(entry) => self.evaluate_entry(&entry),
            None => Ok(false),
        }
    }

    fn evaluate_entry(&self, entry: &Entry) -> Result<bool, SearchError> {
        Ok(entry.contains(&self.attribute_type.oid))
    }
}

/// `(attr=value)` and `(attr~=value)`, compared with the equality rule.
pub struct EqualityEvaluator<'a> {
    store: &'a dyn Store,
    attribute_type: Arc<AttributeType>,
    value: Value,
}

impl<'a> EqualityEvaluator<'a> {
    /// # Errors
    ///
    /// Returns `SearchError::InvalidAssertionValue` if `raw` is not valid for
    /// the attribute's equality rule.
    pub fn new(
        store: &'a dyn Store,
        attribute_type: Arc<AttributeType>,
        raw: &str,
    ) -> Result<Self, SearchError> {
        let value = attribute_type
            .normalize(raw)
            .ok_or_else(|| invalid_value(&attribute_type, raw))?;
        Ok(Self {
            store,
            attribute_type,
            value,
        })
    }

    #[must_use]
    pub fn attribute_type(&self) -> &AttributeType {
        &self.attribute_type
    }

    /// The normalized assertion value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }
}

impl Evaluator for EqualityEvaluator<'_> {
    fn evaluate(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError> {
        let at = &*self.attribute_type;
        let matched = if self.store.has_index_on(at) {
            self.store.index(at)?.has(&self.value, candidate.id)?
        } else {
            match candidate_entry(self.store, candidate)? {
                Some(entry) => self.evaluate_entry(&entry)?,
                None => false,
            }
        };
        if matched {
            candidate.fill_value(|| self.value.clone());
        }
        Ok(matched)
    }

    fn evaluate_entry(&self, entry: &Entry) -> Result<bool, SearchError> {
        let Some(values) = entry.get(&self.attribute_type.oid) else {
            return Ok(false);
        };
        Ok(values
            .iter()
            .filter_map(|raw| self.attribute_type.normalize(raw))
            .any(|value| value == self.value))
    }
}

/// Which side of the assertion value an ordering match accepts. Both sides
/// include the value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingBound {
    /// `>=`
    AtLeast,
    /// `<=`
    AtMost,
}

impl OrderingBound {
    /// Whether `value` lies on the accepted side of `bound`.
    #[must_use]
    pub fn admits(self, value: &Value, bound: &Value) -> bool {
        match self {
            Self::AtLeast => value >= bound,
            Self::AtMost => value <= bound,
        }
    }
}

/// `(attr>=value)` and `(attr<=value)`, compared with the ordering rule.
pub struct OrderingEvaluator<'a> {
    store: &'a dyn Store,
    attribute_type: Arc<AttributeType>,
    value: Value,
    bound: OrderingBound,
}

impl<'a> OrderingEvaluator<'a> {
    /// # Errors
    ///
    /// Returns `SearchError::InvalidAssertionValue` if `raw` is not valid for
    /// the attribute's ordering rule.
    pub fn new(
        store: &'a dyn Store,
        attribute_type: Arc<AttributeType>,
        raw: &str,
        bound: OrderingBound,
    ) -> Result<Self, SearchError> {
        let value = attribute_type
            .normalize_ordering(raw)
            .ok_or_else(|| invalid_value(&attribute_type, raw))?;
        Ok(Self {
            store,
            attribute_type,
            value,
            bound,
        })
    }

    #[must_use]
    pub fn attribute_type(&self) -> &AttributeType {
        &self.attribute_type
    }

    /// The normalized bound.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub const fn bound(&self) -> OrderingBound {
        self.bound
    }

    /// The smallest value of the entry inside the bound.
    fn matching_value(&self, entry: &Entry) -> Option<Value> {
        entry
            .get(&self.attribute_type.oid)?
            .iter()
            .filter_map(|raw| self.attribute_type.normalize_ordering(raw))
            .filter(|value| self.bound.admits(value, &self.value))
            .min()
    }
}

impl Evaluator for OrderingEvaluator<'_> {
    fn evaluate(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError> {
        let at = &*self.attribute_type;
        let matched = if self.store.has_index_on(at) {
            let index = self.store.index(at)?;
            first_indexed_value(index, candidate.id, |v| self.bound.admits(v, &self.value))?
        } else {
            candidate_entry(self.store, candidate)?.and_then(|entry| self.matching_value(&entry))
        };

        match matched {
            Some(value) => {
                candidate.fill_value(|| value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn evaluate_entry(&self, entry: &Entry) -> Result<bool, SearchError> {
        Ok(self.matching_value(entry).is_some())
    }
}

pub(super) fn invalid_value(attribute_type: &AttributeType, raw: &str) -> SearchError {
    SearchError::InvalidAssertionValue {
        attribute: attribute_type.name().to_owned(),
        value: raw.to_owned(),
    }
}
