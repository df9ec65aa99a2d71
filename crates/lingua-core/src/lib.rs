//! Core runtime for Lingua: entity traits, values, the translation-aware
//! query engine, and the ergonomics exported via the `prelude`.
#![warn(unreachable_pub)]

extern crate self as lingua_core;

#[macro_use]
pub mod macros;

// public exports are one module level down
pub mod combined;
pub mod config;
pub mod error;
pub mod model;
pub mod obs;
pub mod query;
pub mod registry;
pub mod store;
pub mod traits;
pub mod translation;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Field name reserved for the translation-side language tag.
pub const LANGUAGE_CODE_FIELD: &str = "language_code";

/// Field name reserved for the translation-side master foreign key.
pub const MASTER_FIELD: &str = "master";

/// Path separator used by logical field names (`rel__translations__field`).
pub const PATH_SEPARATOR: &str = "__";

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No stores, executors, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        combined::Combined,
        config::{LanguageCode, LinguaConfig},
        error::{Error, ErrorKind},
        model::{entity::EntityModel, field::FieldModel},
        query::{
            expr::FilterExpr,
            manager::{PlainQuerying, TranslationManager},
            queryset::{TranslatableQuerying, TranslationQueryset},
        },
        traits::{EntityKind, Path, TranslatableKind, TranslationKind},
        value::Value,
    };
}
