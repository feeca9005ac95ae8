//! Builds cursor trees from annotated filters.

use std::sync::Arc;

use super::{
    AllEntriesCursor, AndCursor, Cursor, FilteredCursor, IndexedCursor, KeyRange, LeafCursor,
    OrCursor, ScopeCursor, close_all, select_driver,
};
use crate::error::SearchError;
use crate::evaluator::{Evaluator, EvaluatorBuilder, OrderingBound};
use crate::filter::{
    Comparison, ComparisonOp, ExtensibleMatch, FilterNode, FilterVisitor, OpaqueAssertion,
    ScopeAssertion, SubstringAssertion,
};
use crate::schema::SchemaManager;
use crate::store::Store;
use crate::types::Value;

/// Builds one cursor per filter node.
///
/// Leaves read their attribute's index when it has one and fall back to a
/// full scan filtered through their evaluator otherwise. An AND walks only
/// its cheapest child; the rest are consulted as evaluators.
///
/// # Pre-conditions
///
/// The filter must have been annotated by the `Optimizer`.
pub struct CursorBuilder<'a> {
    store: &'a dyn Store,
    schema: &'a dyn SchemaManager,
    evaluators: EvaluatorBuilder<'a>,
}

impl<'a> CursorBuilder<'a> {
    #[must_use]
    pub fn new(store: &'a dyn Store, schema: &'a dyn SchemaManager) -> Self {
        Self {
            store,
            schema,
            evaluators: EvaluatorBuilder::new(store, schema),
        }
    }

    /// Build the cursor tree for `node`.
    pub fn build(&mut self, node: &FilterNode) -> Result<Box<dyn Cursor + 'a>, SearchError> {
        node.annotated_count()?;
        node.accept(self)
    }

    fn full_scan(
        &self,
        evaluator: Arc<dyn Evaluator + 'a>,
    ) -> Result<Box<dyn Cursor + 'a>, SearchError> {
        let all = Box::new(AllEntriesCursor::new(self.store)?);
        let leaf: LeafCursor<'a> = LeafCursor::FullScan(FilteredCursor::accepting(all, evaluator));
        Ok(Box::new(leaf))
    }

    fn indexed(cursor: IndexedCursor<'a, Value>) -> Box<dyn Cursor + 'a> {
        let leaf: LeafCursor<'a> = LeafCursor::Indexed(cursor);
        Box::new(leaf)
    }

    fn equality(&self, comparison: &Comparison) -> Result<Box<dyn Cursor + 'a>, SearchError> {
        let evaluator = self.evaluators.equality(comparison)?;
        let at = evaluator.attribute_type();
        if !self.store.has_index_on(at) {
            return self.full_scan(Arc::new(evaluator));
        }
        let index = self.store.index(at)?;
        Ok(Self::indexed(IndexedCursor::for_key(index, evaluator.value())?))
    }

    fn ordering(
        &self,
        comparison: &Comparison,
        bound: OrderingBound,
    ) -> Result<Box<dyn Cursor + 'a>, SearchError> {
        let evaluator = self.evaluators.ordering(comparison, bound)?;
        let at = evaluator.attribute_type();
        if !self.store.has_index_on(at) {
            return self.full_scan(Arc::new(evaluator));
        }
        let value = evaluator.value().clone();
        let range = match bound {
            OrderingBound::AtLeast => KeyRange::AtLeast(value),
            OrderingBound::AtMost => KeyRange::AtMost(value),
        };
        Ok(Self::indexed(IndexedCursor::ranged(self.store.index(at)?, range)?))
    }
}

impl<'a> FilterVisitor for CursorBuilder<'a> {
    type Output = Result<Box<dyn Cursor + 'a>, SearchError>;

    fn visit_presence(&mut self, _node: &FilterNode, attribute: &str) -> Self::Output {
        let evaluator = self.evaluators.presence(attribute)?;
        let at = evaluator.attribute_type();
        if self.store.has_user_index_on(at) {
            let cursor = IndexedCursor::for_key(self.store.presence_index(), &at.oid)?;
            let leaf: LeafCursor<'a, String> = LeafCursor::Indexed(cursor);
            return Ok(Box::new(leaf));
        }
        if self.store.has_system_index_on(at) {
            let index = self.store.index(at)?;
            return Ok(Self::indexed(IndexedCursor::ranged(index, KeyRange::All)?));
        }
        self.full_scan(Arc::new(evaluator))
    }

    fn visit_comparison(
        &mut self,
        _node: &FilterNode,
        op: ComparisonOp,
        comparison: &Comparison,
    ) -> Self::Output {
        match op {
            ComparisonOp::Equality | ComparisonOp::Approximate => self.equality(comparison),
            ComparisonOp::GreaterOrEqual => self.ordering(comparison, OrderingBound::AtLeast),
            ComparisonOp::LessOrEqual => self.ordering(comparison, OrderingBound::AtMost),
        }
    }

    fn visit_substring(
        &mut self,
        _node: &FilterNode,
        assertion: &SubstringAssertion,
    ) -> Self::Output {
        let evaluator = self.evaluators.substring(assertion)?;
        let at = evaluator.attribute_type();
        // Subtype values live in other indices; only a scan sees them all.
        if !self.store.has_index_on(at) || !self.schema.descendants(at).is_empty() {
            return self.full_scan(Arc::new(evaluator));
        }

        // The prefix can only bound the walk when the index holds text keys.
        let text_keys = assertion
            .initial
            .as_deref()
            .and_then(|initial| at.normalize(initial))
            .is_some_and(|value| matches!(value, Value::Text(_)));
        let range = KeyRange::Pattern {
            regex: evaluator.pattern().clone(),
            prefix: evaluator.prefix().filter(|_| text_keys).map(str::to_owned),
        };
        Ok(Self::indexed(IndexedCursor::ranged(self.store.index(at)?, range)?))
    }

    fn visit_and(&mut self, node: &FilterNode, children: &[FilterNode]) -> Self::Output {
        if children.is_empty() {
            return Ok(Box::new(AllEntriesCursor::new(self.store)?));
        }

        let driver = select_driver(children)?;
        let mut siblings = Vec::with_capacity(children.len() - 1);
        for (i, child) in children.iter().enumerate() {
            if i != driver {
                siblings.push((child.annotated_count()?, self.evaluators.build(child)?));
            }
        }
        tracing::debug!(
            "{node} driven by child {driver} {} with count {}",
            children[driver],
            children[driver].annotated_count()?
        );
        let driver = self.build(&children[driver])?;
        Ok(Box::new(AndCursor::new(driver, siblings)))
    }

    fn visit_or(&mut self, _node: &FilterNode, children: &[FilterNode]) -> Self::Output {
        let mut built: Vec<(Box<dyn Cursor + 'a>, Arc<dyn Evaluator + 'a>)> =
            Vec::with_capacity(children.len());
        for child in children {
            let pair = self
                .build(child)
                .and_then(|cursor| Ok((cursor, self.evaluators.build(child)?)));
            match pair {
                Ok(pair) => built.push(pair),
                Err(e) => {
                    if let Err(close_error) =
                        close_all(built.iter_mut().map(|(cursor, _)| cursor.as_mut()))
                    {
                        tracing::warn!("failed to close partially built cursor: {close_error}");
                    }
                    return Err(e);
                }
            }
        }
        Ok(Box::new(OrCursor::new(built)))
    }

    fn visit_not(&mut self, _node: &FilterNode, child: &FilterNode) -> Self::Output {
        let evaluator = self.evaluators.build(child)?;
        let all = Box::new(AllEntriesCursor::new(self.store)?);
        Ok(Box::new(FilteredCursor::rejecting(all, evaluator)))
    }

    fn visit_scope(&mut self, _node: &FilterNode, scope: &ScopeAssertion) -> Self::Output {
        Ok(Box::new(ScopeCursor::new(self.store, scope)?))
    }

    fn visit_assertion(&mut self, node: &FilterNode, _assertion: &OpaqueAssertion) -> Self::Output {
        Err(SearchError::NotImplemented(format!("assertion cursor {node}")))
    }

    fn visit_extensible(
        &mut self,
        node: &FilterNode,
        _extensible: &ExtensibleMatch,
    ) -> Self::Output {
        Err(SearchError::NotImplemented(format!("extensible match cursor {node}")))
    }
}
