//! ## Crate layout
//! - `core`: runtime data model, the shared/translation split, the
//!   translation-aware query engine, and observability counters.
//! - `prelude`: the surface application code imports.
//!
//! Entity declaration goes through [`translatable_entity!`] and
//! [`plain_entity!`]; everything else is reached through `prelude`.

pub use lingua_core as core;

// export so the declaration macros resolve from downstream crates
extern crate self as lingua;

/// re-exports
///
/// downstream crates can use these, stops the user having to specify
/// all the dependencies in the Cargo.toml file manually
pub mod __reexports {
    pub use derive_more;
    pub use serde;
}

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// Macros
//

pub use lingua_core::{plain_entity, translatable_entity};

pub use lingua_core::error::Error;

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        combined::{Combined, RelatedEntry},
        config::{LanguageCode, LinguaConfig},
        error::{Error, ErrorKind},
        query::{
            expr::{CompareOp, FilterExpr, SortKey},
            manager::{
                DefaultManager, PlainQueryset, PlainQuerying as _, TranslationManager, manager,
            },
            queryset::{QueryRow, TranslatableQuerying as _, TranslationQueryset},
        },
        traits::{
            EntityIdentity as _, EntityKind, EntityValue as _, FieldValues as _, Path as _,
            TranslatableKind, TranslationKind as _,
        },
        value::Value,
    };
    pub use serde::{Deserialize, Serialize};
}
