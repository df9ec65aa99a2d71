pub mod binding;
pub mod entity;
pub mod field;
pub mod index;

use thiserror::Error as ThisError;

///
/// ModelError
///
/// Declaration-time misuse detected while binding a translatable entity.
///

#[derive(Debug, ThisError)]
pub enum ModelError {
    #[error("field '{field}' is declared on both the shared and translated side")]
    SharedTranslatedClash { field: String },

    #[error("field name '{field}' is reserved on the {side} side")]
    ReservedField { field: String, side: &'static str },

    #[error("ordering may only reference shared fields, found translated field '{field}'")]
    OrderingOnTranslated { field: String },

    #[error("ordering references unknown field '{field}'")]
    OrderingUnknownField { field: String },

    #[error(
        "unique_together tuple ({fields}) mixes shared and translated fields; \
         split it into per-side tuples"
    )]
    MixedUniqueTogether { fields: String },

    #[error(
        "index_together tuple ({fields}) mixes shared and translated fields; \
         split it into per-side tuples"
    )]
    MixedIndexTogether { fields: String },

    #[error("unique_together references unknown field '{field}'")]
    UnknownTupleField { field: String },

    #[error("entity '{path}' is already registered")]
    AlreadyRegistered { path: String },

    #[error("entity '{path}' is not registered")]
    NotRegistered { path: String },
}
