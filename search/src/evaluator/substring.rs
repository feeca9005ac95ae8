//! Substring evaluator.

use std::sync::Arc;

use regex::Regex;

use super::{Evaluator, candidate_entry, first_indexed_value};
use crate::error::SearchError;
use crate::filter::SubstringAssertion;
use crate::schema::AttributeType;
use crate::store::Store;
use crate::types::{Entry, IndexEntry, Value};

/// `(attr=initial*any*final)`.
///
/// The components are normalized with the attribute's substring rule (or its
/// equality rule, or left as is) and compiled into one anchored pattern.
/// Candidate values go through the same normalizer before matching.
///
/// An entry with no value of the asserted attribute is tested against the
/// values of the attribute's subtypes instead, so `(name=f*)` matches an entry
/// whose `cn` starts with `f`.
pub struct SubstringEvaluator<'a> {
    store: &'a dyn Store,
    attribute_type: Arc<AttributeType>,
    subtypes: Vec<Arc<AttributeType>>,
    pattern: Regex,
    /// The normalized `initial` component, if any.
    prefix: Option<String>,
}

impl<'a> SubstringEvaluator<'a> {
    /// # Errors
    ///
    /// Returns `SearchError::InvalidPattern` if the components do not compile.
    pub fn new(
        store: &'a dyn Store,
        attribute_type: Arc<AttributeType>,
        subtypes: Vec<Arc<AttributeType>>,
        assertion: &SubstringAssertion,
    ) -> Result<Self, SearchError> {
        let normalize = |component: &str| attribute_type.normalize_substring(component);
        let prefix = assertion.initial.as_deref().map(normalize);

        let mut source = String::from("(?s)^");
        if let Some(initial) = &prefix {
            source.push_str(&regex::escape(initial));
        }
        source.push_str(".*");
        for any in &assertion.any {
            source.push_str(&regex::escape(&normalize(any)));
            source.push_str(".*");
        }
        if let Some(final_) = &assertion.final_ {
            source.push_str(&regex::escape(&normalize(final_)));
        }
        source.push('$');

        let pattern = Regex::new(&source).map_err(|e| SearchError::InvalidPattern(e.to_string()))?;
        tracing::trace!("compiled substring pattern {source} for {}", attribute_type.name());

        Ok(Self {
            store,
            attribute_type,
            subtypes,
            pattern,
            prefix,
        })
    }

    #[must_use]
    pub fn attribute_type(&self) -> &AttributeType {
        &self.attribute_type
    }

    /// The compiled pattern.
    #[must_use]
    pub const fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// The normalized initial component. Every matching value starts with it.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Whether a normalized index value matches.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        self.pattern.is_match(&value.to_match_string())
    }

    /// The first value of the entry that matches, trying subtypes when the
    /// asserted attribute itself is absent.
    fn matching_value(&self, entry: &Entry) -> Option<Value> {
        if entry.contains(&self.attribute_type.oid) {
            return self.matching_value_of(&self.attribute_type, entry);
        }
        self.subtypes
            .iter()
            .find_map(|subtype| self.matching_value_of(subtype, entry))
    }

    /// Values are normalized the way the index stores them, so a value the
    /// equality rule rejects never matches.
    fn matching_value_of(&self, attribute_type: &AttributeType, entry: &Entry) -> Option<Value> {
        entry
            .get(&attribute_type.oid)?
            .iter()
            .filter_map(|raw| attribute_type.normalize(raw))
            .find(|value| self.matches(value))
    }
}

impl Evaluator for SubstringEvaluator<'_> {
    fn evaluate(&self, candidate: &mut IndexEntry) -> Result<bool, SearchError> {
        let at = &*self.attribute_type;
        let matched = if self.store.has_index_on(at) {
            let index = self.store.index(at)?;
            match first_indexed_value(index, candidate.id, |v| self.matches(v))? {
                Some(value) => Some(value),
                // Subtype values live in their own indices; fall back to the
                // entry when the id has no value for the attribute itself.
                None if !self.subtypes.is_empty()
                    && index.reverse_lookup(candidate.id)?.is_none() =>
                {
                    candidate_entry(self.store, candidate)?.and_then(|e| self.matching_value(&e))
                }
                None => None,
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterNode;
    use crate::filter::NodeKind;
    use crate::schema::{Schema, SchemaManager};
    use crate::testing::{self, ADMINS, BAR, FIZZ, FOO};

    fn assertion(node: &FilterNode) -> SubstringAssertion {
        match node.kind() {
            NodeKind::Substring(s) => s.clone(),
            _ => unreachable!("not a substring node"),
        }
    }

    fn build<'a>(
        store: &'a dyn Store,
        schema: &Schema,
        node: &FilterNode,
    ) -> SubstringEvaluator<'a> {
        let assertion = assertion(node);
        let at = schema.lookup(&assertion.attribute).expect("lookup");
        let subtypes = schema.descendants(&at);
        SubstringEvaluator::new(store, at, subtypes, &assertion).expect("build")
    }

    #[test]
    fn test_initial_any_final() {
        let schema = Schema::bootstrap();
        let indexed = testing::fixture_store(&schema);
        let unindexed = testing::fixture_store_with(&schema, &[]);

        for store in [&indexed as &dyn Store, &unindexed] {
            let f_star = build(store, &schema, &FilterNode::substring("cn", Some("F"), &[], None));
            assert!(f_star.evaluate_id(FOO).expect("evaluate"));
            assert!(f_star.evaluate_id(FIZZ).expect("evaluate"));
            assert!(!f_star.evaluate_id(BAR).expect("evaluate"));

            let middle = build(
                store,
                &schema,
                &FilterNode::substring("cn", None, &["IZ"], Some("zz")),
            );
            assert!(middle.evaluate_id(FIZZ).expect("evaluate"));
            assert!(!middle.evaluate_id(FOO).expect("evaluate"));

            let ends = build(store, &schema, &FilterNode::substring("cn", None, &[], Some("buzz")));
            let mut candidate = IndexEntry::new(FIZZ);
            assert!(ends.evaluate(&mut candidate).expect("evaluate"));
            assert_eq!(candidate.value, Some(Value::text("fizz buzz")));
        }
    }

    #[test]
    fn test_components_are_escaped() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let dots = build(&store, &schema, &FilterNode::substring("cn", Some("f.."), &[], None));
        assert!(!dots.evaluate_id(FOO).expect("evaluate"));
    }

    #[test]
    fn test_subtype_fallback() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let name = build(&store, &schema, &FilterNode::substring("name", Some("adm"), &[], None));
        assert!(name.evaluate_id(ADMINS).expect("evaluate"));
        assert!(!name.evaluate_id(FOO).expect("evaluate"));

        let entry = store.lookup(ADMINS).expect("lookup").expect("present");
        assert!(name.evaluate_entry(&entry).expect("evaluate"));
    }

    #[test]
    fn test_prefix_is_normalized() {
        let schema = Schema::bootstrap();
        let store = testing::fixture_store(&schema);
        let evaluator = build(
            &store,
            &schema,
            &FilterNode::substring("cn", Some("FiZ"), &[], None),
        );
        assert_eq!(evaluator.prefix(), Some("fiz"));
        assert!(evaluator.matches(&Value::text("fizz")));
    }
}
