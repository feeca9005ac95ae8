//! Builds evaluator trees from annotated filters.

use std::sync::Arc;

use super::{
    AndEvaluator, EqualityEvaluator, Evaluator, NotEvaluator, OrEvaluator, OrderingBound,
    OrderingEvaluator, PresenceEvaluator, ScopeEvaluator, SubstringEvaluator,
};
use crate::error::SearchError;
use crate::filter::{
    Comparison, ComparisonOp, ExtensibleMatch, FilterNode, FilterVisitor, OpaqueAssertion,
    ScopeAssertion, SubstringAssertion,
};
use crate::schema::{AttributeType, SchemaManager};
use crate::store::Store;

/// Builds one evaluator per filter node.
///
/// # Pre-conditions
///
/// The filter must have been annotated by the `Optimizer`; building from an
/// unannotated node fails with `SearchError::NotAnnotated`.
pub struct EvaluatorBuilder<'a> {
    store: &'a dyn Store,
    schema: &'a dyn SchemaManager,
}

impl<'a> EvaluatorBuilder<'a> {
    #[must_use]
    pub fn new(store: &'a dyn Store, schema: &'a dyn SchemaManager) -> Self {
        Self { store, schema }
    }

    /// Build the evaluator tree for `node`.
    pub fn build(&mut self, node: &FilterNode) -> Result<Arc<dyn Evaluator + 'a>, SearchError> {
        node.annotated_count()?;
        node.accept(self)
    }

    pub(crate) fn attribute_type(
        &self,
        attribute: &str,
    ) -> Result<Arc<AttributeType>, SearchError> {
        Ok(self.schema.lookup(attribute)?)
    }

    pub(crate) fn presence(&self, attribute: &str) -> Result<PresenceEvaluator<'a>, SearchError> {
        Ok(PresenceEvaluator::new(self.store, self.attribute_type(attribute)?))
    }

    pub(crate) fn equality(
        &self,
        comparison: &Comparison,
    ) -> Result<EqualityEvaluator<'a>, SearchError> {
        let attribute_type = self.attribute_type(&comparison.attribute)?;
        EqualityEvaluator::new(self.store, attribute_type, &comparison.value)
    }

    pub(crate) fn ordering(
        &self,
        comparison: &Comparison,
        bound: OrderingBound,
    ) -> Result<OrderingEvaluator<'a>, SearchError> {
        let attribute_type = self.attribute_type(&comparison.attribute)?;
        OrderingEvaluator::new(self.store, attribute_type, &comparison.value, bound)
    }

    pub(crate) fn substring(
        &self,
        assertion: &SubstringAssertion,
    ) -> Result<SubstringEvaluator<'a>, SearchError> {
        let attribute_type = self.attribute_type(&assertion.attribute)?;
        let subtypes = self.schema.descendants(&attribute_type);
        SubstringEvaluator::new(self.store, attribute_type, subtypes, assertion)
    }

    /// Build the children of a branch node, keeping their counts.
    pub(crate) fn children(
        &mut self,
        children: &[FilterNode],
    ) -> Result<Vec<(u64, Arc<dyn Evaluator + 'a>)>, SearchError> {
        children
            .iter()
            .map(|child| Ok((child.annotated_count()?, self.build(child)?)))
            .collect()
    }
}

impl<'a> FilterVisitor for EvaluatorBuilder<'a> {
    type Output = Result<Arc<dyn Evaluator + 'a>, SearchError>;

    fn visit_presence(&mut self, _node: &FilterNode, attribute: &str) -> Self::Output {
        Ok(Arc::new(self.presence(attribute)?))
    }

    fn visit_comparison(
        &mut self,
        _node: &FilterNode,
        op: ComparisonOp,
        comparison: &Comparison,
    ) -> Self::Output {
        match op {
            ComparisonOp::Equality | ComparisonOp::Approximate => {
                Ok(Arc::new(self.equality(comparison)?))
            }
            ComparisonOp::GreaterOrEqual => {
                Ok(Arc::new(self.ordering(comparison, OrderingBound::AtLeast)?))
            }
            ComparisonOp::LessOrEqual => {
                Ok(Arc::new(self.ordering(comparison, OrderingBound::AtMost)?))
            }
        }
    }

    fn visit_substring(
        &mut self,
        _node: &FilterNode,
        assertion: &SubstringAssertion,
    ) -> Self::Output {
        Ok(Arc::new(self.substring(assertion)?))
    }

    fn visit_and(&mut self, _node: &FilterNode, children: &[FilterNode]) -> Self::Output {
        Ok(Arc::new(AndEvaluator::new(self.children(children)?)))
    }

    fn visit_or(&mut self, _node: &FilterNode, children: &[FilterNode]) -> Self::Output {
        let children = self
            .children(children)?
            .into_iter()
            .map(|(_, child)| child)
            .collect();
        Ok(Arc::new(OrEvaluator::new(children)))
    }

    fn visit_not(&mut self, _node: &FilterNode, child: &FilterNode) -> Self::Output {
        Ok(Arc::new(NotEvaluator::new(self.build(child)?)))
    }

    fn visit_scope(&mut self, _node: &FilterNode, scope: &ScopeAssertion) -> Self::Output {
        Ok(Arc::new(ScopeEvaluator::new(self.store, *scope)?))
    }

    fn visit_assertion(&mut self, node: &FilterNode, _assertion: &OpaqueAssertion) -> Self::Output {
        Err(SearchError::NotImplemented(format!("assertion evaluation {node}")))
    }

    fn visit_extensible(
        &mut self,
        node: &FilterNode,
        _extensible: &ExtensibleMatch,
    ) -> Self::Output {
        Err(SearchError::NotImplemented(format!("extensible match {node}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::Optimizer;
    use crate::schema::{Schema, SchemaError};
    use crate::testing::{self, ADMINS, BAR, FIZZ, FOO, SYSTEM};

    fn evaluate(filter: &FilterNode, ids: &[crate::types::EntryId]) -> Vec<bool> {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        Optimizer::new(&store, &schema).annotate(filter).expect("annotate");
        let evaluator = EvaluatorBuilder::new(&store, &schema)
            .build(filter)
            .expect("build");
        ids.iter()
            .map(|id| evaluator.evaluate_id(*id).expect("evaluate"))
            .collect()
    }

    #[test]
    fn test_compound_filter() {
        let filter = FilterNode::and(vec![
            FilterNode::equality("objectClass", "person"),
            FilterNode::or(vec![
                FilterNode::equality("sn", "smith"),
                FilterNode::less_or_equal("uidNumber", "20"),
            ]),
            FilterNode::not(FilterNode::substring("cn", Some("fi"), &[], None)),
        ]);
        assert_eq!(
            evaluate(&filter, &[SYSTEM, FOO, BAR, FIZZ, ADMINS]),
            vec![false, true, true, false, false]
        );
    }

    #[test]
    fn test_approximate_is_equality() {
        let filter = FilterNode::approximate("sn", "Smyth");
        assert_eq!(evaluate(&filter, &[FOO]), vec![false]);
        let filter = FilterNode::approximate("sn", "SMITH");
        assert_eq!(evaluate(&filter, &[FOO, BAR]), vec![true, false]);
    }

    #[test]
    fn test_requires_annotation() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let result = EvaluatorBuilder::new(&store, &schema).build(&FilterNode::presence("cn"));
        assert!(matches!(result, Err(SearchError::NotAnnotated)));
    }

    #[test]
    fn test_unsupported_constructs() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let filter = FilterNode::assertion("custom", Some(3));
        Optimizer::new(&store, &schema).annotate(&filter).expect("annotate");
        let result = EvaluatorBuilder::new(&store, &schema).build(&filter);
        assert!(matches!(result, Err(SearchError::NotImplemented(_))));
    }

    #[test]
    fn test_extensible_not_implemented() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        for filter in [
            FilterNode::extensible(Some("cn"), Some("caseExactMatch"), "foo"),
            FilterNode::and(vec![
                FilterNode::equality("sn", "smith"),
                FilterNode::extensible(None, Some("2.5.13.2"), "foo"),
            ]),
        ] {
            Optimizer::new(&store, &schema).annotate(&filter).expect("annotate");
            let result = EvaluatorBuilder::new(&store, &schema).build(&filter);
            assert!(matches!(result, Err(SearchError::NotImplemented(_))), "{filter}");
        }
    }

    #[test]
    fn test_unknown_attribute() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let filter = FilterNode::equality("bogus", "x");
        Optimizer::new(&store, &schema).annotate(&filter).expect("annotate");
        let result = EvaluatorBuilder::new(&store, &schema).build(&filter);
        assert!(matches!(
            result,
            Err(SearchError::Schema(SchemaError::UnknownAttributeType(_)))
        ));
    }
}
