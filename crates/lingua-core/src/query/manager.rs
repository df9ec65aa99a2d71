//! Access paths for non-translatable entities.
//!
//! `PlainQueryset` queries an entity's own table. In its unaware form
//! any path reaching a translated field fails with a wrong-accessor
//! error; the aware form (obtained through [`TranslationManager`])
//! rewrites such paths through the target's translation table and
//! applies the language constraint there.

use crate::{
    combined::RelatedEntry,
    config::{self, LanguageCode},
    error::Error,
    query::{
        QueryError,
        expr::{FilterExpr, SortKey},
        queryset::TranslationQueryset,
        resolve::{self, CompiledExpr, EvalContext, Pair},
        rewrite::{self, RootContext},
    },
    registry,
    store::{self, row::Row},
    traits::{EntityKind, TranslatableKind},
    value::Value,
};
use std::{collections::BTreeMap, marker::PhantomData};

///
/// PlainQueryset
///
/// Fluent query over a non-translatable entity's rows.
///

#[derive(Clone, Debug)]
pub struct PlainQueryset<E: EntityKind> {
    aware: bool,
    language: Option<LanguageCode>,
    filters: Vec<FilterExpr>,
    ordering: Vec<SortKey>,
    prefetch: Vec<String>,
    _marker: PhantomData<E>,
}

impl<E: EntityKind> PlainQueryset<E> {
    pub(crate) const fn with_awareness(aware: bool) -> Self {
        Self {
            aware,
            language: None,
            filters: Vec::new(),
            ordering: Vec::new(),
            prefetch: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// An unaware queryset: translated fields are out of reach.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_awareness(false)
    }

    // ------------------------------------------------------------------
    // Builder surface
    // ------------------------------------------------------------------

    /// Language applied at translation hops. Defaults to the process
    /// language at execution time.
    pub fn language(mut self, code: impl Into<LanguageCode>) -> Result<Self, Error> {
        let code = code.into();
        config::current()
            .check(code.as_str())
            .map_err(|err| QueryError::validation(err.to_string()))?;
        self.language = Some(code);
        Ok(self)
    }

    #[must_use]
    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.filters.push(expr);
        self
    }

    /// Shorthand for an equality filter on one path.
    #[must_use]
    pub fn filter_by(self, path: impl Into<String>, value: Value) -> Self {
        self.filter(FilterExpr::cond_value(path, value))
    }

    #[must_use]
    pub fn exclude(mut self, expr: FilterExpr) -> Self {
        self.filters.push(!expr);
        self
    }

    /// Replace the ordering. Keys accept a `-` prefix for descending.
    #[must_use]
    pub fn order_by(mut self, keys: &[&str]) -> Self {
        self.ordering = keys.iter().map(|key| SortKey::parse(key)).collect();
        self
    }

    /// Prefetch related rows along the named relation paths. An empty
    /// list is refused.
    pub fn select_related(mut self, paths: &[&str]) -> Result<Self, Error> {
        if paths.is_empty() {
            return Err(QueryError::unsupported(
                "select_related",
                "an explicit relation list is required",
            )
            .into());
        }
        for path in paths {
            Self::check_relation_path(path)?;
            self.prefetch.push((*path).to_string());
        }
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Terminal reads
    // ------------------------------------------------------------------

    pub fn fetch(&self) -> Result<Vec<E>, Error> {
        self.matched()?
            .into_iter()
            .map(|(_, row)| E::from_row(&row).map_err(Error::from))
            .collect()
    }

    /// Execute, attaching prefetched related rows per entity.
    pub fn fetch_related(&self) -> Result<Vec<(E, BTreeMap<String, RelatedEntry>)>, Error> {
        let language = self.effective_language();
        let mut out = Vec::new();
        for (_, row) in self.matched()? {
            let entity = E::from_row(&row)?;
            let mut related = BTreeMap::new();
            for path in &self.prefetch {
                attach_related(E::PATH, &row, path, &language, &mut related);
            }
            out.push((entity, related));
        }

        Ok(out)
    }

    pub fn get(&self, expr: FilterExpr) -> Result<E, Error> {
        self.clone().filter(expr).get_one()
    }

    pub fn get_one(&self) -> Result<E, Error> {
        let mut rows = self.fetch()?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            0 => Err(QueryError::NotFound {
                entity: E::ENTITY_NAME,
            }
            .into()),
            count => Err(QueryError::MultipleRows {
                entity: E::ENTITY_NAME,
                count,
            }
            .into()),
        }
    }

    pub fn first(&self) -> Result<Option<E>, Error> {
        Ok(self.fetch()?.into_iter().next())
    }

    /// The row ranking highest on `field`.
    pub fn latest(&self, field: &str) -> Result<E, Error> {
        self.extreme(field, true)
    }

    /// The row ranking lowest on `field`.
    pub fn earliest(&self, field: &str) -> Result<E, Error> {
        self.extreme(field, false)
    }

    fn extreme(&self, field: &str, descending: bool) -> Result<E, Error> {
        let key = if descending {
            format!("-{field}")
        } else {
            field.to_string()
        };
        self.clone()
            .order_by(&[key.as_str()])
            .first()?
            .ok_or_else(|| {
                Error::from(QueryError::NotFound {
                    entity: E::ENTITY_NAME,
                })
            })
    }

    pub fn count(&self) -> Result<usize, Error> {
        Ok(self.matched()?.len())
    }

    pub fn exists(&self) -> Result<bool, Error> {
        Ok(!self.matched()?.is_empty())
    }

    pub fn in_bulk(&self, ids: &[u64]) -> Result<BTreeMap<u64, E>, Error> {
        let mut out = BTreeMap::new();
        for entity in self.fetch()? {
            let pk = entity.pk();
            if ids.contains(&pk) {
                out.insert(pk, entity);
            }
        }

        Ok(out)
    }

    /// Project the named paths into key/value maps, keyed by their
    /// rewritten display form.
    pub fn values(&self, paths: &[&str]) -> Result<Vec<BTreeMap<String, Value>>, Error> {
        let rewritten = self.rewrite_projections(paths)?;
        let ctx = EvalContext {
            language: Some(self.effective_language()),
        };

        let mut out = Vec::new();
        for (_, row) in self.matched()? {
            let pair = Pair::plain(row);
            out.push(
                rewritten
                    .iter()
                    .map(|path| (path.display.clone(), resolve::project(&pair, path, &ctx)))
                    .collect(),
            );
        }

        Ok(out)
    }

    pub fn values_list(&self, paths: &[&str]) -> Result<Vec<Vec<Value>>, Error> {
        let rewritten = self.rewrite_projections(paths)?;
        let ctx = EvalContext {
            language: Some(self.effective_language()),
        };

        let mut out = Vec::new();
        for (_, row) in self.matched()? {
            let pair = Pair::plain(row);
            out.push(
                rewritten
                    .iter()
                    .map(|path| resolve::project(&pair, path, &ctx))
                    .collect(),
            );
        }

        Ok(out)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn create(&self, attrs: &[(&str, Value)]) -> Result<E, Error> {
        let mut entity = E::default();
        for (field, value) in attrs {
            if !E::MODEL.has_field(field) {
                return Err(QueryError::FieldDoesNotExist {
                    path: (*field).to_string(),
                    hint: format!("'{field}' is not a field of '{}'", E::ENTITY_NAME),
                }
                .into());
            }
            entity.set_value(field, value)?;
        }

        let id = store::insert(E::PATH, Row::from_entity(&entity))?;
        entity.set_pk(id);

        Ok(entity)
    }

    pub fn update(&self, attrs: &[(&str, Value)]) -> Result<usize, Error> {
        for (field, _) in attrs {
            if !E::MODEL.has_field(field) {
                return Err(QueryError::FieldDoesNotExist {
                    path: (*field).to_string(),
                    hint: format!("'{field}' is not a field of '{}'", E::ENTITY_NAME),
                }
                .into());
            }
        }
        let patch: Vec<(String, Value)> = attrs
            .iter()
            .map(|(f, v)| ((*f).to_string(), v.clone()))
            .collect();

        let matched = self.matched()?;
        store::transaction(|| {
            for (id, _) in &matched {
                store::update(E::PATH, *id, &patch)?;
            }
            Ok::<_, Error>(())
        })?;

        Ok(matched.len())
    }

    pub fn delete(&self) -> Result<usize, Error> {
        let matched = self.matched()?;
        store::transaction(|| {
            for (id, _) in &matched {
                store::delete(E::PATH, *id);
            }
            Ok::<_, Error>(())
        })?;

        Ok(matched.len())
    }

    // ------------------------------------------------------------------
    // Explicitly unsupported operations
    // ------------------------------------------------------------------

    pub fn aggregate(&self) -> Result<(), Error> {
        Err(QueryError::unsupported(
            "aggregate",
            "aggregation is not defined through translation joins",
        )
        .into())
    }

    pub fn annotate(&self) -> Result<(), Error> {
        Err(QueryError::unsupported(
            "annotate",
            "annotation is not defined through translation joins",
        )
        .into())
    }

    pub fn dates(&self) -> Result<(), Error> {
        Err(QueryError::unsupported("dates", "not implemented").into())
    }

    pub fn reverse(&self) -> Result<(), Error> {
        Err(QueryError::unsupported(
            "reverse",
            "declare the ordering explicitly instead",
        )
        .into())
    }

    pub fn defer(&self) -> Result<(), Error> {
        Err(QueryError::unsupported(
            "defer",
            "column projection is only defined on translatable querysets",
        )
        .into())
    }

    pub fn only(&self) -> Result<(), Error> {
        Err(QueryError::unsupported(
            "only",
            "column projection is only defined on translatable querysets",
        )
        .into())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn root(&self) -> RootContext {
        RootContext::plain(E::PATH, self.aware)
    }

    fn effective_language(&self) -> LanguageCode {
        self.language
            .clone()
            .unwrap_or_else(config::process_language)
    }

    fn compiled(&self) -> Result<Option<CompiledExpr>, Error> {
        if self.filters.is_empty() {
            return Ok(None);
        }
        let expr = FilterExpr::And(self.filters.clone());
        Ok(Some(resolve::compile(self.root(), &expr)?))
    }

    fn matched(&self) -> Result<Vec<(u64, Row)>, Error> {
        let compiled = self.compiled()?;
        let ctx = EvalContext {
            language: Some(self.effective_language()),
        };

        let mut matched: Vec<(u64, Row)> = store::rows(E::PATH)
            .into_iter()
            .filter(|(_, row)| match &compiled {
                Some(expr) => resolve::matches(expr, &Pair::plain(row.clone()), &ctx),
                None => true,
            })
            .collect();

        self.sort(&mut matched, &ctx)?;

        Ok(matched)
    }

    fn sort(&self, matched: &mut [(u64, Row)], ctx: &EvalContext) -> Result<(), Error> {
        let keys: Vec<SortKey> = if self.ordering.is_empty() {
            E::MODEL
                .ordering
                .iter()
                .map(|field| SortKey::parse(field))
                .collect()
        } else {
            self.ordering.clone()
        };

        let rewritten: Vec<(rewrite::RewrittenPath, bool)> = keys
            .iter()
            .map(|key| {
                rewrite::rewrite_value_path(self.root(), &key.path)
                    .map(|path| (path, key.descending))
            })
            .collect::<Result<_, _>>()?;

        matched.sort_by(|(id_a, row_a), (id_b, row_b)| {
            let pair_a = Pair::plain(row_a.clone());
            let pair_b = Pair::plain(row_b.clone());
            for (path, descending) in &rewritten {
                let va = resolve::project(&pair_a, path, ctx);
                let vb = resolve::project(&pair_b, path, ctx);
                let ordering = va.compare(&vb);
                let ordering = if *descending { ordering.reverse() } else { ordering };
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            id_a.cmp(id_b)
        });

        Ok(())
    }

    fn rewrite_projections(&self, paths: &[&str]) -> Result<Vec<rewrite::RewrittenPath>, Error> {
        paths
            .iter()
            .map(|path| rewrite::rewrite_value_path(self.root(), path).map_err(Error::from))
            .collect()
    }

    fn check_relation_path(path: &str) -> Result<(), Error> {
        let mut entity_path: &str = E::PATH;
        for token in path.split(crate::PATH_SEPARATOR) {
            let Some(rel) = registry::relation(entity_path, token) else {
                return Err(QueryError::FieldDoesNotExist {
                    path: path.to_string(),
                    hint: format!("'{token}' is not a relation of '{entity_path}'"),
                }
                .into());
            };
            entity_path = rel.target_path;
        }
        Ok(())
    }
}

impl<E: EntityKind> Default for PlainQueryset<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk one prefetch path from a plain root, attaching an entry per
/// hop prefix.
fn attach_related(
    root_path: &'static str,
    root_row: &Row,
    path: &str,
    language: &LanguageCode,
    related: &mut BTreeMap<String, RelatedEntry>,
) {
    let mut entity_path: &'static str = root_path;
    let mut current = root_row.clone();
    let mut translation_source: Option<Row> = None;
    let mut prefix = String::new();

    for token in path.split(crate::PATH_SEPARATOR) {
        let Some(rel) = registry::relation(entity_path, token) else {
            return;
        };
        let source = if rel.on_translation {
            match &translation_source {
                Some(row) => row,
                None => return,
            }
        } else {
            &current
        };
        let Some(pk) = source.value_or_null(rel.local_field).as_uint() else {
            return;
        };
        let Some(target) = store::get(rel.target_path, pk) else {
            return;
        };

        let translation = if rel.target_translatable {
            translation_row(rel.target_path, pk, language)
        } else {
            None
        };

        if !prefix.is_empty() {
            prefix.push_str(crate::PATH_SEPARATOR);
        }
        prefix.push_str(rel.name);

        related.insert(
            prefix.clone(),
            RelatedEntry {
                entity_path: rel.target_path,
                row: target.clone(),
                translation: translation.clone(),
            },
        );

        entity_path = rel.target_path;
        current = target;
        translation_source = translation;
    }
}

fn translation_row(entity_path: &str, master: u64, language: &LanguageCode) -> Option<Row> {
    let translation_path = registry::translation_path(entity_path)?;
    store::rows(translation_path)
        .into_iter()
        .find_map(|(_, row)| {
            let same_master = row
                .value_or_null(crate::MASTER_FIELD)
                .loosely_equals(&Value::Uint(master));
            let same_language = row.value_or_null(crate::LANGUAGE_CODE_FIELD)
                == Value::Text(language.as_str().to_string());
            (same_master && same_language).then_some(row)
        })
}

///
/// TranslationManager
///
/// Query factory for entities that reference translatable ones. Its
/// querysets rewrite translated paths through the target translation
/// tables with the language constraint attached.
///

pub struct TranslationManager<E: EntityKind>(PhantomData<E>);

impl<E: EntityKind> TranslationManager<E> {
    /// A fresh translation-aware queryset.
    #[must_use]
    pub const fn queryset() -> PlainQueryset<E> {
        PlainQueryset::with_awareness(true)
    }

    /// Shorthand: aware queryset with one filter applied.
    #[must_use]
    pub fn filter(expr: FilterExpr) -> PlainQueryset<E> {
        Self::queryset().filter(expr)
    }
}

///
/// PlainQuerying
///
/// Entry point mixed into every entity for access to its own table.
///

pub trait PlainQuerying: EntityKind {
    /// An unaware queryset over this entity's rows.
    #[must_use]
    fn query() -> PlainQueryset<Self> {
        PlainQueryset::new()
    }

    /// A translation-aware queryset over this entity's rows.
    #[must_use]
    fn query_translated() -> PlainQueryset<Self> {
        TranslationManager::<Self>::queryset()
    }
}

impl<E: EntityKind> PlainQuerying for E {}

///
/// DefaultManager
///
/// The manager handed out for a translatable entity, honoring the
/// `use_default_manager` switch: the aware form is the full
/// translation queryset, the legacy form queries shared rows only.
///

pub enum DefaultManager<S: TranslatableKind> {
    Aware(TranslationQueryset<S>),
    SharedOnly(PlainQueryset<S>),
}

/// The configured default manager for a translatable entity.
#[must_use]
pub fn manager<S: TranslatableKind>() -> DefaultManager<S> {
    if config::current().use_default_manager {
        DefaultManager::Aware(TranslationQueryset::new())
    } else {
        DefaultManager::SharedOnly(PlainQueryset::new())
    }
}
