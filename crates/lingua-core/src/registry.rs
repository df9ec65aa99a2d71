//! Schema registry: per-process map from entity path to its bound model.
//!
//! The query rewriter classifies path bits against this registry; the
//! store consults it for unique-constraint enforcement. Registration is
//! explicit (no link-time magic) and idempotent only in the negative
//! sense: double registration is a declaration error.

use crate::{
    config,
    model::{
        ModelError,
        binding::{BoundTranslation, validate_binding},
        entity::EntityModel,
        field::RelationModel,
    },
    store,
    traits::{EntityKind, TranslatableKind},
};
use std::{cell::RefCell, collections::HashMap};

///
/// RegistrationKind
///

#[derive(Clone, Debug)]
pub enum RegistrationKind {
    Plain,
    Translatable {
        translation_path: &'static str,
        translated_fields: &'static [&'static str],
        accessor: &'static str,
        bound: BoundTranslation,
    },
    Translation {
        master_path: &'static str,
    },
}

///
/// Registration
///

#[derive(Clone, Debug)]
pub struct Registration {
    pub model: &'static EntityModel,
    pub kind: RegistrationKind,
}

thread_local! {
    static REGISTRY: RefCell<HashMap<&'static str, Registration>> =
        RefCell::new(HashMap::new());
}

/// Drop every registration.
pub fn reset() {
    REGISTRY.with(|slot| slot.borrow_mut().clear());
}

/// Register a non-translatable entity.
pub fn register_plain<E: EntityKind>() -> Result<(), ModelError> {
    insert(
        E::PATH,
        Registration {
            model: E::MODEL,
            kind: RegistrationKind::Plain,
        },
    )?;
    store::ensure_table(E::PATH);

    Ok(())
}

/// Register a translatable entity and its synthesized translation,
/// running model binding validation.
pub fn register_translatable<S: TranslatableKind>() -> Result<(), ModelError> {
    let separator = config::current().table_name_separator;
    let bound = validate_binding(
        S::MODEL,
        S::TRANSLATED_FIELDS,
        S::TRANSLATION_TABLE,
        &separator,
    )?;

    insert(
        S::PATH,
        Registration {
            model: S::MODEL,
            kind: RegistrationKind::Translatable {
                translation_path: <S::Translation as crate::traits::Path>::PATH,
                translated_fields: S::TRANSLATED_FIELDS,
                accessor: S::ACCESSOR,
                bound,
            },
        },
    )?;
    insert(
        <S::Translation as crate::traits::Path>::PATH,
        Registration {
            model: S::TRANSLATION_MODEL,
            kind: RegistrationKind::Translation {
                master_path: S::PATH,
            },
        },
    )?;

    store::ensure_table(S::PATH);
    store::ensure_table(<S::Translation as crate::traits::Path>::PATH);

    Ok(())
}

fn insert(path: &'static str, registration: Registration) -> Result<(), ModelError> {
    REGISTRY.with(|slot| {
        let mut map = slot.borrow_mut();
        if map.contains_key(path) {
            return Err(ModelError::AlreadyRegistered {
                path: path.to_string(),
            });
        }
        map.insert(path, registration);

        Ok(())
    })
}

/// Clone the registration for `path`.
#[must_use]
pub fn lookup(path: &str) -> Option<Registration> {
    REGISTRY.with(|slot| slot.borrow().get(path).cloned())
}

/// Registration for `path`, or a not-registered error.
pub fn require(path: &str) -> Result<Registration, ModelError> {
    lookup(path).ok_or_else(|| ModelError::NotRegistered {
        path: path.to_string(),
    })
}

#[must_use]
pub fn is_translatable(path: &str) -> bool {
    matches!(
        lookup(path).map(|r| r.kind),
        Some(RegistrationKind::Translatable { .. })
    )
}

/// Translation entity path of a translatable entity.
#[must_use]
pub fn translation_path(path: &str) -> Option<&'static str> {
    match lookup(path)?.kind {
        RegistrationKind::Translatable {
            translation_path, ..
        } => Some(translation_path),
        _ => None,
    }
}

/// Master entity path of a translation entity.
#[must_use]
pub fn master_path(path: &str) -> Option<&'static str> {
    match lookup(path)?.kind {
        RegistrationKind::Translation { master_path } => Some(master_path),
        _ => None,
    }
}

/// Translated field names of a translatable entity.
#[must_use]
pub fn translated_fields(path: &str) -> Option<&'static [&'static str]> {
    match lookup(path)?.kind {
        RegistrationKind::Translatable {
            translated_fields, ..
        } => Some(translated_fields),
        _ => None,
    }
}

/// Relation declared under `name` on the entity at `path`, looking at
/// both the shared model and (for translatable entities) the
/// translation model's translated foreign keys.
#[must_use]
pub fn relation(path: &str, name: &str) -> Option<RelationModel> {
    let registration = lookup(path)?;
    if let Some(rel) = registration.model.relation(name) {
        return Some(*rel);
    }

    if let RegistrationKind::Translatable {
        translation_path, ..
    } = registration.kind
    {
        let translation = lookup(translation_path)?;
        return translation.model.relation(name).copied();
    }

    None
}

/// Unique index tuples enforced on inserts/updates for `path`.
#[must_use]
pub fn unique_indexes(path: &str) -> Vec<Vec<String>> {
    let Some(registration) = lookup(path) else {
        return Vec::new();
    };

    let mut out: Vec<Vec<String>> = registration
        .model
        .indexes
        .iter()
        .filter(|ix| ix.unique)
        .map(|ix| ix.fields.iter().map(ToString::to_string).collect())
        .collect();

    match registration.kind {
        RegistrationKind::Plain => {
            for tuple in registration.model.unique_together {
                out.push(tuple.iter().map(ToString::to_string).collect());
            }
        }
        RegistrationKind::Translatable { bound, .. } => {
            out.extend(bound.shared_unique);
        }
        RegistrationKind::Translation { master_path } => {
            if let Some(Registration {
                kind: RegistrationKind::Translatable { bound, .. },
                ..
            }) = lookup(master_path)
            {
                out.extend(bound.translation_unique);
            }
        }
    }

    out
}

/// The translation table name bound for a translatable entity.
#[must_use]
pub fn translation_table(path: &str) -> Option<String> {
    match lookup(path)?.kind {
        RegistrationKind::Translatable { bound, .. } => Some(bound.translation_table),
        _ => None,
    }
}
