//! Errors surfaced by the search subsystem.

use crate::schema::SchemaError;
use crate::store::StoreError;

/// Errors returned by the optimizer, evaluators, cursors and search engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// A store or index access failed.
    Store(StoreError),
    /// A schema lookup failed.
    Schema(SchemaError),
    /// `get` was called on a cursor that is not positioned on an element.
    InvalidCursorPosition,
    /// The cursor does not support this operation (seeks without an index).
    UnsupportedOperation(&'static str),
    /// The cursor was used after `close`.
    CursorClosed,
    /// The filter contains a construct this subsystem cannot evaluate.
    NotImplemented(String),
    /// An evaluator or cursor was built from a filter the optimizer has not
    /// annotated.
    NotAnnotated,
    /// An assertion value is not valid for the attribute's syntax.
    InvalidAssertionValue { attribute: String, value: String },
    /// A substring assertion could not be compiled.
    InvalidPattern(String),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::Schema(e) => write!(f, "schema error: {e}"),
            Self::InvalidCursorPosition => write!(f, "cursor is not positioned on an element"),
            Self::UnsupportedOperation(operation) => {
                write!(f, "operation not supported by this cursor: {operation}")
            }
            Self::CursorClosed => write!(f, "cursor is closed"),
            Self::NotImplemented(what) => write!(f, "not implemented: {what}"),
            Self::NotAnnotated => write!(f, "filter has not been annotated with scan counts"),
            Self::InvalidAssertionValue { attribute, value } => {
                write!(f, "invalid value '{value}' for attribute {attribute}")
            }
            Self::InvalidPattern(message) => write!(f, "invalid substring pattern: {message}"),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for SearchError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CursorClosed => Self::CursorClosed,
            StoreError::InvalidCursorPosition => Self::InvalidCursorPosition,
            other => Self::Store(other),
        }
    }
}

impl From<SchemaError> for SearchError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}
