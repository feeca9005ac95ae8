//! Conjunction cursor.

use std::sync::Arc;

use super::{Cursor, check_open};
use crate::error::SearchError;
use crate::evaluator::Evaluator;
use crate::filter::FilterNode;
use crate::types::IndexEntry;

/// Index of the child that should drive an AND: the first child with the
/// smallest annotated count.
///
/// # Errors
///
/// Returns `SearchError::NotAnnotated` if a child carries no count, and
/// `SearchError::UnsupportedOperation` for an empty conjunction.
pub fn select_driver(children: &[FilterNode]) -> Result<usize, SearchError> {
    let mut best: Option<(usize, u64)> = None;
    for (i, child) in children.iter().enumerate() {
        let count = child.annotated_count()?;
        if best.is_none_or(|(_, smallest)| count < smallest) {
            best = Some((i, count));
        }
    }
    best.map(|(i, _)| i)
        .ok_or(SearchError::UnsupportedOperation("driver of an empty conjunction"))
}

/// `(&...)`: walks the driving child's cursor and keeps the candidates every
/// sibling's evaluator accepts.
///
/// The siblings are never walked. They are checked cheapest first, so the
/// most selective one rejects first.
pub struct AndCursor<'a> {
    driver: Box<dyn Cursor + 'a>,
    siblings: Vec<Arc<dyn Evaluator + 'a>>,
    current: Option<IndexEntry>,
    closed: bool,
}

impl<'a> AndCursor<'a> {
    /// Build from the driver and the `(count, evaluator)` pairs of the other
    /// children.
    #[must_use]
    pub fn new(
        driver: Box<dyn Cursor + 'a>,
        mut siblings: Vec<(u64, Arc<dyn Evaluator + 'a>)>,
    ) -> Self {
        siblings.sort_by_key(|(count, _)| *count);
        Self {
            driver,
            siblings: siblings.into_iter().map(|(_, sibling)| sibling).collect(),
            current: None,
            closed: false,
        }
    }

    fn matches(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError> {
        for sibling in &self.siblings {
            if !sibling.evaluate(candidate)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn step(&mut self, forward: bool) -> Result<bool, SearchError> {
        check_open(self.closed)?;
        self.current = None;
        loop {
            let moved = if forward {
                self.driver.next()?
            } else {
                self.driver.previous()?
            };
            if !moved {
                return Ok(false);
            }
            let mut candidate = self.driver.get()?;
            if self.matches(&mut candidate)? {
                self.current = Some(candidate);
                return Ok(true);
            }
        }
    }
}

impl Cursor for AndCursor<'_> {
    fn before_first(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)?;
        self.current = None;
        self.driver.before_first()
    }

    fn after_last(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)?;
        self.current = None;
        self.driver.after_last()
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

    fn close(&mut self) -> Result<(), SearchError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.current = None;
        self.driver.close()
    }
}
