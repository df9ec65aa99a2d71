use crate::{
    config::ConfigError,
    model::ModelError,
    query::QueryError,
    store::StoreError,
    translation::TranslationError,
    value::CoercionError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Top-level error surface of the engine. Module errors convert
/// transparently; `kind()` gives the stable classification callers
/// branch on. The engine never catches and suppresses: everything
/// propagates here unchanged.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl Error {
    /// Stable classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Model(_) => ErrorKind::Validation,
            Self::Coercion(_) => ErrorKind::Internal,
            Self::Query(err) => match err {
                QueryError::FieldDoesNotExist { .. } => ErrorKind::FieldDoesNotExist,
                QueryError::WrongAccessor { .. } => ErrorKind::WrongAccessor,
                QueryError::Unsupported { .. } => ErrorKind::Unsupported,
                QueryError::Validation { .. } | QueryError::MultipleRows { .. } => {
                    ErrorKind::Validation
                }
                QueryError::NotFound { .. } => ErrorKind::NotFound,
            },
            Self::Store(err) => match err {
                StoreError::UniqueViolation { .. } => ErrorKind::Integrity,
                StoreError::NotFound { .. } => ErrorKind::NotFound,
                StoreError::TableMissing { .. } => ErrorKind::Internal,
            },
            Self::Translation(err) => match err {
                TranslationError::NoTranslation { .. } => ErrorKind::NoTranslation,
                TranslationError::NotFound { .. } => ErrorKind::NotFound,
            },
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound)
    }
}

///
/// ErrorKind
/// Stable error taxonomy, classified by kind rather than by type.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Translated read on an instance whose language could not be resolved.
    NoTranslation,
    /// Translated path reached through a non-translation-aware accessor.
    WrongAccessor,
    /// The rewriter cannot classify a path bit.
    FieldDoesNotExist,
    /// Operation deliberately unsupported under the active mode.
    Unsupported,
    /// Structural misuse of the API.
    Validation,
    /// Constraint violation propagated from storage.
    Integrity,
    NotFound,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NoTranslation => "no_translation",
            Self::WrongAccessor => "wrong_accessor",
            Self::FieldDoesNotExist => "field_does_not_exist",
            Self::Unsupported => "unsupported",
            Self::Validation => "validation",
            Self::Integrity => "integrity",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}
