//! Disjunction cursor.

use std::sync::Arc;

use super::{Cursor, check_open, close_all};
use crate::error::SearchError;
use crate::evaluator::Evaluator;
use crate::types::IndexEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    /// Inside child `i`'s walk.
    On(usize),
    AfterLast,
}

/// `(|...)`: walks each child's cursor in turn.
///
/// A candidate from child `i` is skipped when the evaluator of any child
/// before it accepts it, so every id is yielded once, under the first child
/// that matches it. The rule reads the same in both directions. Output
/// follows child order, not id order.
pub struct OrCursor<'a> {
    children: Vec<(Box<dyn Cursor + 'a>, Arc<dyn Evaluator + 'a>)>,
    position: Position,
    current: Option<IndexEntry>,
    closed: bool,
}

impl<'a> OrCursor<'a> {
    #[must_use]
    pub const fn new(children: Vec<(Box<dyn Cursor + 'a>, Arc<dyn Evaluator + 'a>)>) -> Self {
        Self {
            children,
            position: Position::BeforeFirst,
            current: None,
            closed: false,
        }
    }

    /// Whether a child before `child` already yields the candidate.
    fn claimed_earlier(
        &self,
        child: usize,
        candidate: &mut IndexEntry,
    ) -> Result<bool, SearchError> {
        for (_, evaluator) in &self.children[..child] {
            if evaluator.evaluate(candidate)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn step_forward(&mut self) -> Result<bool, SearchError> {
        let mut child = match self.position {
            Position::AfterLast => return Ok(false),
            Position::On(i) => i,
            Position::BeforeFirst => {
                let Some((cursor, _)) = self.children.first_mut() else {
                    self.position = Position::AfterLast;
                    return Ok(false);
                };
                cursor.before_first()?;
                0
            }
        };
        loop {
            self.position = Position::On(child);
            if self.children[child].0.next()? {
                let mut candidate = self.children[child].0.get()?;
                if !self.claimed_earlier(child, &mut candidate)? {
                    self.current = Some(candidate);
                    return Ok(true);
                }
                continue;
            }
            child += 1;
            match self.children.get_mut(child) {
                Some((cursor, _)) => cursor.before_first()?,
                None => {
                    self.position = Position::AfterLast;
                    return Ok(false);
                }
            }
        }
    }

    fn step_backward(&mut self) -> Result<bool, SearchError> {
        let mut child = match self.position {
            Position::BeforeFirst => return Ok(false),
            Position::On(i) => i,
            Position::AfterLast => {
                let Some(last) = self.children.len().checked_sub(1) else {
                    self.position = Position::BeforeFirst;
                    return Ok(false);
                };
                self.children[last].0.after_last()?;
                last
            }
        };
        loop {
            self.position = Position::On(child);
            if self.children[child].0.previous()? {
                let mut candidate = self.children[child].0.get()?;
                if !self.claimed_earlier(child, &mut candidate)? {
                    self.current = Some(candidate);
                    return Ok(true);
                }
                continue;
            }
            let Some(earlier) = child.checked_sub(1) else {
                self.position = Position::BeforeFirst;
                return Ok(false);
            };
            child = earlier;
            self.children[child].0.after_last()?;
        }
    }
}

impl Cursor for OrCursor<'_> {
    fn before_first(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)?;
        self.current = None;
        self.position = Position::BeforeFirst;
        Ok(())
    }

    fn after_last(&mut self) -> Result<(), SearchError> {
        check_open(self.closed)?;
        self.current = None;
        self.position = Position::AfterLast;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, SearchError> {
        check_open(self.closed)?;
        self.current = None;
        self.step_forward()
    }

    fn previous(&mut self) -> Result<bool, SearchError> {
        check_open(self.closed)?;
        self.current = None;
        self.step_backward()
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
        close_all(self.children.iter_mut().map(|(cursor, _)| cursor.as_mut()))
    }
}
