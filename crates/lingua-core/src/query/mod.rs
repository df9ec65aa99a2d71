//! The translation-aware query engine.
//!
//! Layered bottom-up: `expr` is the pure predicate AST, `rewrite`
//! classifies logical paths into join steps, `resolve` evaluates
//! compiled predicates and projections against the store, `queryset`
//! is the fluent surface over translatable entities, `fallback` the
//! per-master post-pass, and `manager` the access path for
//! non-translatable entities.

pub mod expr;
pub mod fallback;
pub mod language;
pub mod manager;
pub mod queryset;
pub mod resolve;
pub mod rewrite;

use thiserror::Error as ThisError;

///
/// QueryError
///

#[derive(Debug, ThisError)]
pub enum QueryError {
    #[error("cannot resolve field '{path}': {hint}")]
    FieldDoesNotExist { path: String, hint: String },

    #[error("'{path}' reaches a translated field through a translation-unaware query; {hint}")]
    WrongAccessor { path: String, hint: String },

    #[error("{operation} is not supported here: {reason}")]
    Unsupported {
        operation: &'static str,
        reason: String,
    },

    #[error("{message}")]
    Validation { message: String },

    #[error("no '{entity}' row matches the query")]
    NotFound { entity: &'static str },

    #[error("expected one '{entity}' row, query matched {count}")]
    MultipleRows { entity: &'static str, count: usize },
}

impl QueryError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            operation,
            reason: reason.into(),
        }
    }
}
