//! Filter expression trees.
//!
//! A `FilterNode` is the parsed form of an LDAP filter plus the nodes the
//! search engine synthesizes (scope, opaque assertions). Each node carries a
//! scan count written once by the `Optimizer` and read by the evaluator and
//! cursor builders.
//!
//! The three consumers never match on `NodeKind` themselves. They implement
//! `FilterVisitor` and call `FilterNode::accept`, so the set of node kinds is
//! enumerated in exactly one place.

mod scope;

use std::cell::OnceCell;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use scope::{AliasDerefMode, ScopeAssertion, SearchScope};

use crate::error::SearchError;

/// A filter node and its scan count.
///
/// Serializes as its `NodeKind`; the count is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterNode {
    kind: NodeKind,
    #[serde(skip)]
    count: OnceCell<u64>,
}

/// The kinds of filter node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// `(attr=*)`
    Presence { attribute: String },
    /// `(attr=value)`
    Equality(Comparison),
    /// `(attr>=value)`
    GreaterOrEqual(Comparison),
    /// `(attr<=value)`
    LessOrEqual(Comparison),
    /// `(attr~=value)`, matched as equality.
    Approximate(Comparison),
    /// `(attr=initial*any*final)`
    Substring(SubstringAssertion),
    /// `(&...)`
    And(Vec<FilterNode>),
    /// `(|...)`
    Or(Vec<FilterNode>),
    /// `(!...)`
    Not(Box<FilterNode>),
    /// Candidate restriction to a search scope.
    Scope(ScopeAssertion),
    /// An opaque assertion that only reports a cost.
    Assertion(OpaqueAssertion),
    /// `(attr:rule:=value)`
    Extensible(ExtensibleMatch),
}

/// Attribute and value of an equality, ordering or approximate assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub attribute: String,
    pub value: String,
}

/// The comparison a `Comparison` node performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equality,
    Approximate,
    GreaterOrEqual,
    LessOrEqual,
}

impl ComparisonOp {
    /// The operator as written in a filter string.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equality => "=",
            Self::Approximate => "~=",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        }
    }
}

/// Components of a substring assertion. At least one should be present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubstringAssertion {
    pub attribute: String,
    #[serde(default)]
    pub initial: Option<String>,
    #[serde(default)]
    pub any: Vec<String>,
    #[serde(default, rename = "final")]
    pub final_: Option<String>,
}

/// An assertion evaluated outside this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueAssertion {
    /// Human-readable description, used in errors.
    pub description: String,
    /// Cost the assertion reports for itself.
    #[serde(default)]
    pub cost: Option<u64>,
}

/// An extensible match assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensibleMatch {
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub matching_rule: Option<String>,
    pub value: String,
    #[serde(default)]
    pub dn_attributes: bool,
}

/// The single dispatch over node kinds.
///
/// Every method receives the node itself (for its count) and the kind's
/// payload.
pub trait FilterVisitor {
    type Output;

    fn visit_presence(&mut self, node: &FilterNode, attribute: &str) -> Self::Output;

    fn visit_comparison(
        &mut self,
        node: &FilterNode,
        op: ComparisonOp,
        comparison: &Comparison,
    ) -> Self::Output;

    fn visit_substring(&mut self, node: &FilterNode, assertion: &SubstringAssertion)
    -> Self::Output;

    fn visit_and(&mut self, node: &FilterNode, children: &[FilterNode]) -> Self::Output;

    fn visit_or(&mut self, node: &FilterNode, children: &[FilterNode]) -> Self::Output;

    fn visit_not(&mut self, node: &FilterNode, child: &FilterNode) -> Self::Output;

    fn visit_scope(&mut self, node: &FilterNode, scope: &ScopeAssertion) -> Self::Output;

    fn visit_assertion(&mut self, node: &FilterNode, assertion: &OpaqueAssertion) -> Self::Output;

    fn visit_extensible(&mut self, node: &FilterNode, extensible: &ExtensibleMatch)
    -> Self::Output;
}

impl FilterNode {
    /// Wrap a node kind, unannotated.
    #[must_use]
    pub const fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            count: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn presence(attribute: impl Into<String>) -> Self {
        Self::new(NodeKind::Presence {
            attribute: attribute.into(),
        })
    }

    #[must_use]
    pub fn equality(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(NodeKind::Equality(Comparison::new(attribute, value)))
    }

    #[must_use]
    pub fn approximate(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(NodeKind::Approximate(Comparison::new(attribute, value)))
    }

    #[must_use]
    pub fn greater_or_equal(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(NodeKind::GreaterOrEqual(Comparison::new(attribute, value)))
    }

    #[must_use]
    pub fn less_or_equal(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(NodeKind::LessOrEqual(Comparison::new(attribute, value)))
    }

    /// A substring node.
    ///
    /// # Examples
    ///
    /// ```
    /// use xdbm_search::filter::FilterNode;
    /// let node = FilterNode::substring("cn", Some("f"), &["o"], None);
    /// assert_eq!(node.to_string(), "(cn=f*o*)");
    /// ```
    #[must_use]
    pub fn substring(
        attribute: impl Into<String>,
        initial: Option<&str>,
        any: &[&str],
        final_: Option<&str>,
    ) -> Self {
        Self::new(NodeKind::Substring(SubstringAssertion {
            attribute: attribute.into(),
            initial: initial.map(str::to_owned),
            any: any.iter().map(|s| (*s).to_owned()).collect(),
            final_: final_.map(str::to_owned),
        }))
    }

    #[must_use]
    pub const fn and(children: Vec<Self>) -> Self {
        Self::new(NodeKind::And(children))
    }

    #[must_use]
    pub const fn or(children: Vec<Self>) -> Self {
        Self::new(NodeKind::Or(children))
    }

    #[must_use]
    pub fn not(child: Self) -> Self {
        Self::new(NodeKind::Not(Box::new(child)))
    }

    #[must_use]
    pub const fn scope(scope: ScopeAssertion) -> Self {
        Self::new(NodeKind::Scope(scope))
    }

    #[must_use]
    pub fn assertion(description: impl Into<String>, cost: Option<u64>) -> Self {
        Self::new(NodeKind::Assertion(OpaqueAssertion {
            description: description.into(),
            cost,
        }))
    }

    /// `(attr:rule:=value)`. Either the attribute or the rule may be absent.
    #[must_use]
    pub fn extensible(
        attribute: Option<&str>,
        matching_rule: Option<&str>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(NodeKind::Extensible(ExtensibleMatch {
            attribute: attribute.map(str::to_owned),
            matching_rule: matching_rule.map(str::to_owned),
            value: value.into(),
            dn_attributes: false,
        }))
    }

    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The scan count, if the node has been annotated.
    #[must_use]
    pub fn count(&self) -> Option<u64> {
        self.count.get().copied()
    }

    /// Write the scan count. Only the first write takes effect; the stored
    /// count is returned either way.
    pub fn set_count(&self, count: u64) -> u64 {
        *self.count.get_or_init(|| count)
    }

    /// The scan count of an annotated node.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::NotAnnotated` if the optimizer has not run.
    pub fn annotated_count(&self) -> Result<u64, SearchError> {
        self.count().ok_or(SearchError::NotAnnotated)
    }

    /// Check if this node and every descendant carry a count.
    #[must_use]
    pub fn is_annotated(&self) -> bool {
        if self.count().is_none() {
            return false;
        }
        match &self.kind {
            NodeKind::And(children) | NodeKind::Or(children) => {
                children.iter().all(Self::is_annotated)
            }
            NodeKind::Not(child) => child.is_annotated(),
            _ => true,
        }
    }

    /// Dispatch to the visitor method for this node's kind.
    pub fn accept<V: FilterVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match &self.kind {
            NodeKind::Presence { attribute } => visitor.visit_presence(self, attribute),
            NodeKind::Equality(c) => visitor.visit_comparison(self, ComparisonOp::Equality, c),
            NodeKind::GreaterOrEqual(c) => {
                visitor.visit_comparison(self, ComparisonOp::GreaterOrEqual, c)
            }
            NodeKind::LessOrEqual(c) => {
                visitor.visit_comparison(self, ComparisonOp::LessOrEqual, c)
            }
            NodeKind::Approximate(c) => {
                visitor.visit_comparison(self, ComparisonOp::Approximate, c)
            }
            NodeKind::Substring(s) => visitor.visit_substring(self, s),
            NodeKind::And(children) => visitor.visit_and(self, children),
            NodeKind::Or(children) => visitor.visit_or(self, children),
            NodeKind::Not(child) => visitor.visit_not(self, child),
            NodeKind::Scope(scope) => visitor.visit_scope(self, scope),
            NodeKind::Assertion(assertion) => visitor.visit_assertion(self, assertion),
            NodeKind::Extensible(extensible) => visitor.visit_extensible(self, extensible),
        }
    }
}

impl Comparison {
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Presence { attribute } => write!(f, "({attribute}=*)"),
            NodeKind::Equality(c) => write!(f, "({}={})", c.attribute, c.value),
            NodeKind::GreaterOrEqual(c) => write!(f, "({}>={})", c.attribute, c.value),
            NodeKind::LessOrEqual(c) => write!(f, "({}<={})", c.attribute, c.value),
            NodeKind::Approximate(c) => write!(f, "({}~={})", c.attribute, c.value),
            NodeKind::Substring(s) => {
                write!(f, "({}=", s.attribute)?;
                write!(f, "{}*", s.initial.as_deref().unwrap_or_default())?;
                for any in &s.any {
                    write!(f, "{any}*")?;
                }
                write!(f, "{})", s.final_.as_deref().unwrap_or_default())
            }
            NodeKind::And(children) => {
                write!(f, "(&")?;
                children.iter().try_for_each(|child| write!(f, "{child}"))?;
                write!(f, ")")
            }
            NodeKind::Or(children) => {
                write!(f, "(|")?;
                children.iter().try_for_each(|child| write!(f, "{child}"))?;
                write!(f, ")")
            }
            NodeKind::Not(child) => write!(f, "(!{child})"),
            NodeKind::Scope(scope) => {
                write!(f, "(scope:{}:{}={})", scope.scope, scope.deref, scope.base)
            }
            NodeKind::Assertion(assertion) => write!(f, "(assert:{})", assertion.description),
            NodeKind::Extensible(e) => {
                write!(f, "({}", e.attribute.as_deref().unwrap_or_default())?;
                if e.dn_attributes {
                    write!(f, ":dn")?;
                }
                if let Some(rule) = &e.matching_rule {
                    write!(f, ":{rule}")?;
                }
                write!(f, ":={})", e.value)
            }
        }
    }
}
