//! Conjunction, disjunction and negation.

use std::sync::Arc;

use super::Evaluator;
use crate::error::SearchError;
use crate::types::{Entry, IndexEntry};

/// `(&...)`: every child accepts.
///
/// # Invariants
///
/// - Children are ordered by ascending scan count, so the most selective
///   child rejects first.
pub struct AndEvaluator<'a> {
    children: Vec<Arc<dyn Evaluator + 'a>>,
}

impl<'a> AndEvaluator<'a> {
    /// Build from `(count, evaluator)` pairs. The sort is stable, so children
    /// with equal counts keep their filter order.
    #[must_use]
    pub fn new(mut children: Vec<(u64, Arc<dyn Evaluator + 'a>)>) -> Self {
        children.sort_by_key(|(count, _)| *count);
        Self {
            children: children.into_iter().map(|(_, child)| child).collect(),
        }
    }

    /// Children in evaluation order.
    #[must_use]
    pub fn children(&self) -> &[Arc<dyn Evaluator + 'a>] {
        &self.children
    }
}

impl Evaluator for AndEvaluator<'_> {
    fn evaluate(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError> {
        for child in &self.children {
            if !child.evaluate(candidate)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn evaluate_entry(&self, entry: &Entry) -> Result<bool, SearchError> {
        for child in &self.children {
            if !child.evaluate_entry(entry)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// `(|...)`: some child accepts.
pub struct OrEvaluator<'a> {
    children: Vec<Arc<dyn Evaluator + 'a>>,
}

impl<'a> OrEvaluator<'a> {
    #[must_use]
    pub const fn new(children: Vec<Arc<dyn Evaluator + 'a>>) -> Self {
        Self { children }
    }
}

impl Evaluator for OrEvaluator<'_> {
    fn evaluate(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError> {
        for child in &self.children {
            if child.evaluate(candidate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn evaluate_entry(&self, entry: &Entry) -> Result<bool, SearchError> {
        for child in &self.children {
            if child.evaluate_entry(entry)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// `(!...)`: the child rejects.
pub struct NotEvaluator<'a> {
    child: Arc<dyn Evaluator + 'a>,
}

impl<'a> NotEvaluator<'a> {
    #[must_use]
    pub const fn new(child: Arc<dyn Evaluator + 'a>) -> Self {
        Self { child }
    }
}

impl Evaluator for NotEvaluator<'_> {
    fn evaluate(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError> {
        Ok(!self.child.evaluate(candidate)?)
    }

    fn evaluate_entry(&self, entry: &Entry) -> Result<bool, SearchError> {
        Ok(!self.child.evaluate_entry(entry)?)
    }
}
