//! Translation access: fetching, caching, and swapping the translation
//! attached to a shared instance.
//!
//! The attached-translation slot itself lives on [`Combined`]; this
//! module owns the storage-facing primitives and the error vocabulary.
//!
//! [`Combined`]: crate::combined::Combined

use crate::{
    LANGUAGE_CODE_FIELD, MASTER_FIELD,
    config::LanguageCode,
    error::Error,
    obs,
    store,
    traits::{FromRow, Path, TranslatableKind},
    value::Value,
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// TranslationError
///

#[derive(Debug, ThisError)]
pub enum TranslationError {
    #[error(
        "'{entity}' has no translation loaded and none could be resolved \
         for language '{language}'"
    )]
    NoTranslation { entity: &'static str, language: String },

    #[error("no '{language}' translation exists for this '{entity}' instance")]
    NotFound { entity: &'static str, language: String },
}

/// Fetch the stored translation of `master_pk` in `language`.
///
/// One storage query; raises a distinct not-found from the attribute-read
/// failure so callers can tell "no row" apart from "no attachment".
pub fn fetch<S: TranslatableKind>(
    master_pk: u64,
    language: &LanguageCode,
) -> Result<S::Translation, Error> {
    obs::metrics::record_translation_load();

    let path = <S::Translation as Path>::PATH;
    for (_, row) in store::rows(path) {
        if row.value_or_null(MASTER_FIELD) == Value::Uint(master_pk)
            && row.value_or_null(LANGUAGE_CODE_FIELD) == Value::text(language.as_str())
        {
            return Ok(S::Translation::from_row(&row)?);
        }
    }

    Err(TranslationError::NotFound {
        entity: S::ENTITY_NAME,
        language: language.as_str().to_string(),
    }
    .into())
}

/// Languages available per master, for the given master set, collected in
/// one batch query. Masters with no translations are absent from the map.
#[must_use]
pub fn available_languages<S: TranslatableKind>(
    master_pks: &[u64],
) -> BTreeMap<u64, Vec<LanguageCode>> {
    let path = <S::Translation as Path>::PATH;
    let mut out: BTreeMap<u64, Vec<LanguageCode>> = BTreeMap::new();

    for (_, row) in store::rows(path) {
        let Some(master) = row.value_or_null(MASTER_FIELD).as_uint() else {
            continue;
        };
        if !master_pks.contains(&master) {
            continue;
        }
        if let Some(code) = row.value_or_null(LANGUAGE_CODE_FIELD).as_text() {
            out.entry(master).or_default().push(LanguageCode::new(code));
        }
    }

    out
}

/// Delete every translation row of `master_pk`. Returns the number of
/// rows removed. Used by the cascade path.
pub fn delete_all_for_master<S: TranslatableKind>(master_pk: u64) -> usize {
    let path = <S::Translation as Path>::PATH;
    let doomed: Vec<u64> = store::rows(path)
        .into_iter()
        .filter(|(_, row)| row.value_or_null(MASTER_FIELD) == Value::Uint(master_pk))
        .map(|(id, _)| id)
        .collect();

    let mut removed = 0;
    for id in doomed {
        if store::delete(path, id) {
            removed += 1;
        }
    }

    removed
}
