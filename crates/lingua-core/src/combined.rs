//! The combined instance: one shared entity with at most one translation
//! attached, presented to callers as a single object.

use crate::{
    config::{self, LanguageCode},
    error::Error,
    obs, store,
    store::row::Row,
    traits::{
        EntityKind, EntityValue, FieldValues, FromRow, Path, TranslatableKind, TranslationKind,
    },
    translation::{self, TranslationError},
    value::Value,
};
use derive_more::{Deref, DerefMut};
use std::collections::BTreeMap;

///
/// RelatedEntry
///
/// A select-related prefetch result: the raw related row plus, when the
/// target is translatable, its language-matched translation row.
///

#[derive(Clone, Debug)]
pub struct RelatedEntry {
    pub entity_path: &'static str,
    pub row: Row,
    pub translation: Option<Row>,
}

///
/// Combined
///
/// A shared instance and its attached translation. Derefs to the shared
/// side, so shared attributes read as first-class; translated attributes
/// go through the attached translation with the autoload policy.
///
/// I3: at most one translation is attached at a time. Replacing it is
/// explicit, via `translate` or `set_cached_translation`.
///

#[derive(Clone, Debug, Deref, DerefMut)]
pub struct Combined<S: TranslatableKind> {
    #[deref]
    #[deref_mut]
    shared: S,
    translation: Option<S::Translation>,
    related: BTreeMap<String, RelatedEntry>,
}

impl<S: TranslatableKind> Combined<S> {
    /// Wrap a shared instance with no attachment.
    #[must_use]
    pub fn new(shared: S) -> Self {
        Self {
            shared,
            translation: None,
            related: BTreeMap::new(),
        }
    }

    /// Attach `translation` to `shared`, clearing any stale attachment.
    #[must_use]
    pub fn combine(shared: S, translation: S::Translation) -> Self {
        let mut combined = Self::new(shared);
        combined.translation = Some(translation);
        combined
    }

    #[must_use]
    pub fn into_shared(self) -> S {
        self.shared
    }

    #[must_use]
    pub const fn shared(&self) -> &S {
        &self.shared
    }

    // ------------------------------------------------------------------
    // Attached-translation slot
    // ------------------------------------------------------------------

    /// Pure lookup of the attached translation.
    #[must_use]
    pub const fn cached_translation(&self) -> Option<&S::Translation> {
        self.translation.as_ref()
    }

    pub const fn cached_translation_mut(&mut self) -> Option<&mut S::Translation> {
        self.translation.as_mut()
    }

    /// Replace the attachment; `None` clears it.
    pub fn set_cached_translation(&mut self, translation: Option<S::Translation>) {
        self.translation = translation;
    }

    /// Language of the attached translation. Read-only: a new language is
    /// entered via [`Self::translate`], never by assignment.
    pub fn language_code(&self) -> Result<&LanguageCode, Error> {
        self.translation
            .as_ref()
            .map(TranslationKind::language_code)
            .ok_or_else(|| {
                TranslationError::NoTranslation {
                    entity: S::ENTITY_NAME,
                    language: config::process_language().to_string(),
                }
                .into()
            })
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Storage lookup for `language`, preferring the attached translation
    /// when its language matches (the prefetch-first guarantee).
    pub fn get_translation(&self, language: &LanguageCode) -> Result<S::Translation, Error> {
        if let Some(attached) = &self.translation {
            if attached.language_code() == language {
                obs::metrics::record_cache_hit();
                return Ok(attached.clone());
            }
        }

        translation::fetch::<S>(self.shared.pk(), language)
    }

    /// The core resolution primitive.
    ///
    /// With a translation already attached and `enforce` false the
    /// attachment is returned unchanged. Otherwise the language is
    /// fetched from storage; on miss an unsaved translation row is
    /// constructed and attached (not persisted).
    pub fn load_translation(
        &mut self,
        language: &LanguageCode,
        enforce: bool,
    ) -> Result<&S::Translation, Error> {
        let keep = match &self.translation {
            Some(_) if !enforce => true,
            Some(attached) => attached.language_code() == language,
            None => false,
        };

        if keep {
            obs::metrics::record_cache_hit();
        } else {
            let fetched = match translation::fetch::<S>(self.shared.pk(), language) {
                Ok(t) => t,
                Err(err) if err.is_not_found() => {
                    S::Translation::new_unsaved(language.clone(), Some(self.shared.pk()))
                }
                Err(err) => return Err(err),
            };
            self.translation = Some(fetched);
        }

        Ok(self.translation.as_ref().expect("translation just attached"))
    }

    /// Force a fresh unsaved translation for `language`, detaching any
    /// prior one. The prior translation row is not deleted.
    pub fn translate(&mut self, language: LanguageCode) -> &mut S::Translation {
        let pk = self.shared.pk();
        let master = if pk == 0 { None } else { Some(pk) };
        self.translation
            .insert(S::Translation::new_unsaved(language, master))
    }

    /// The attached translation, autoloading by process language when the
    /// policy allows. With autoload off and nothing attached this is a
    /// NoTranslation error, distinct from a missing attribute.
    pub fn translated(&mut self) -> Result<&S::Translation, Error> {
        self.autoload()?;
        Ok(self
            .translation
            .as_ref()
            .expect("autoload attaches or errors"))
    }

    /// Mutable access to the attached translation under the same policy.
    pub fn translated_mut(&mut self) -> Result<&mut S::Translation, Error> {
        self.autoload()?;
        Ok(self
            .translation
            .as_mut()
            .expect("autoload attaches or errors"))
    }

    /// Read one translated field through the attachment.
    pub fn translated_value(&mut self, field: &str) -> Result<Value, Error> {
        let translation = self.translated()?;
        Ok(translation.get_value(field).unwrap_or(Value::Null))
    }

    fn autoload(&mut self) -> Result<(), Error> {
        if self.translation.is_some() {
            obs::metrics::record_cache_hit();
            return Ok(());
        }

        let language = config::process_language();
        if !config::current().autoload_translations {
            return Err(TranslationError::NoTranslation {
                entity: S::ENTITY_NAME,
                language: language.to_string(),
            }
            .into());
        }

        let fetched = translation::fetch::<S>(self.shared.pk(), &language).map_err(|err| {
            if err.is_not_found() {
                Error::from(TranslationError::NoTranslation {
                    entity: S::ENTITY_NAME,
                    language: language.to_string(),
                })
            } else {
                err
            }
        })?;
        self.translation = Some(fetched);

        Ok(())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Save the shared row and, in the same transactional unit, the
    /// attached translation if any. A unique `(master, language_code)`
    /// violation rolls the whole save back.
    pub fn save(&mut self) -> Result<(), Error> {
        store::transaction(|| {
            let row = Row::from_entity(&self.shared);
            if self.shared.pk() == 0 {
                let pk = store::insert(S::PATH, row)?;
                self.shared.set_pk(pk);
            } else {
                let patch: Vec<(String, Value)> = row
                    .iter()
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect();
                store::update(S::PATH, self.shared.pk(), &patch)?;
            }

            let master_pk = self.shared.pk();
            if let Some(translation) = &mut self.translation {
                translation.set_master(Some(master_pk));
                store::savepoint(|| persist_translation::<S>(translation))?;
            }

            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Select-related cache
    // ------------------------------------------------------------------

    pub fn set_related(&mut self, path: impl Into<String>, entry: RelatedEntry) {
        self.related.insert(path.into(), entry);
    }

    #[must_use]
    pub fn related_entry(&self, path: &str) -> Option<&RelatedEntry> {
        self.related.get(path)
    }

    /// Typed view of a prefetched translatable relation.
    pub fn related<R: TranslatableKind>(&self, path: &str) -> Result<Option<Combined<R>>, Error> {
        let Some(entry) = self.related.get(path) else {
            return Ok(None);
        };

        let shared = R::from_row(&entry.row)?;
        let mut combined = Combined::new(shared);
        if let Some(translation_row) = &entry.translation {
            combined.set_cached_translation(Some(R::Translation::from_row(translation_row)?));
        }

        Ok(Some(combined))
    }

    /// Typed view of a prefetched non-translatable relation.
    pub fn related_plain<R: EntityKind>(&self, path: &str) -> Result<Option<R>, Error> {
        match self.related.get(path) {
            Some(entry) => Ok(Some(R::from_row(&entry.row)?)),
            None => Ok(None),
        }
    }
}

fn persist_translation<S: TranslatableKind>(
    translation: &mut S::Translation,
) -> Result<(), Error> {
    let path = <S::Translation as Path>::PATH;

    // An unsaved translation for a (master, language_code) that already has
    // a persisted row adopts that row's pk and updates it in place.
    if translation.pk() == 0 {
        if let Some(master) = translation.master() {
            match translation::fetch::<S>(master, translation.language_code()) {
                Ok(existing) => translation.set_pk(existing.pk()),
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }
    }

    let row = Row::from_entity(translation);

    if translation.pk() == 0 {
        let pk = store::insert(path, row)?;
        translation.set_pk(pk);
    } else {
        let patch: Vec<(String, Value)> =
            row.iter().map(|(f, v)| (f.clone(), v.clone())).collect();
        store::update(path, translation.pk(), &patch)?;
    }

    Ok(())
}
