//! Matching rules and their normalizers.

use crate::types::{Dn, Value};

/// The matching rules the bootstrap schema knows about.
///
/// The equality, ordering and substring rules of one family normalize values
/// identically, so an index built with the equality normalizer is ordered the
/// way the ordering rule compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchingRule {
    /// `caseIgnoreMatch` (2.5.13.2).
    CaseIgnoreMatch,
    /// `caseIgnoreOrderingMatch` (2.5.13.3).
    CaseIgnoreOrderingMatch,
    /// `caseIgnoreSubstringsMatch` (2.5.13.4).
    CaseIgnoreSubstringsMatch,
    /// `caseExactMatch` (2.5.13.5).
    CaseExactMatch,
    /// `caseExactOrderingMatch` (2.5.13.6).
    CaseExactOrderingMatch,
    /// `caseExactSubstringsMatch` (2.5.13.7).
    CaseExactSubstringsMatch,
    /// `integerMatch` (2.5.13.14).
    IntegerMatch,
    /// `integerOrderingMatch` (2.5.13.15).
    IntegerOrderingMatch,
    /// `distinguishedNameMatch` (2.5.13.1).
    DistinguishedNameMatch,
    /// `objectIdentifierMatch` (2.5.13.0).
    ObjectIdentifierMatch,
}

impl MatchingRule {
    /// The rule's OID.
    #[must_use]
    pub const fn oid(self) -> &'static str {
        match self {
            Self::CaseIgnoreMatch => "2.5.13.2",
            Self::CaseIgnoreOrderingMatch => "2.5.13.3",
            Self::CaseIgnoreSubstringsMatch => "2.5.13.4",
            Self::CaseExactMatch => "2.5.13.5",
            Self::CaseExactOrderingMatch => "2.5.13.6",
            Self::CaseExactSubstringsMatch => "2.5.13.7",
            Self::IntegerMatch => "2.5.13.14",
            Self::IntegerOrderingMatch => "2.5.13.15",
            Self::DistinguishedNameMatch => "2.5.13.1",
            Self::ObjectIdentifierMatch => "2.5.13.0",
        }
    }

    /// Normalize a raw value.
    ///
    /// Returns `None` when the value is not valid for the rule's syntax, for
    /// example a non-numeric value under `integerMatch`.
    #[must_use]
    pub fn normalize(self, raw: &str) -> Option<Value> {
        match self {
            Self::CaseIgnoreMatch
            | Self::CaseIgnoreOrderingMatch
            | Self::CaseIgnoreSubstringsMatch
            | Self::ObjectIdentifierMatch => Some(Value::Text(collapse_spaces(raw).to_lowercase())),
            Self::CaseExactMatch
            | Self::CaseExactOrderingMatch
            | Self::CaseExactSubstringsMatch => {
                Some(Value::Text(collapse_spaces(raw)))
            }
            Self::IntegerMatch | Self::IntegerOrderingMatch => {
                raw.trim().parse::<i64>().ok().map(Value::Integer)
            }
            Self::DistinguishedNameMatch => Dn::parse(raw).map(Value::from),
        }
    }
}

/// Trim and collapse inner whitespace runs to a single space.
fn collapse_spaces(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
