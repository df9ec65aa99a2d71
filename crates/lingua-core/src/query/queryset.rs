//! The translation-aware queryset over a translatable entity.
//!
//! A queryset is an immutable description: language mode, predicate,
//! ordering, projection and prefetch declarations accumulate through
//! the fluent builder, and nothing touches the store until a terminal
//! operation runs. Each result row pairs a translation row with its
//! shared row and materializes as a [`Combined`] instance (or, for a
//! translation whose master is gone, as a bare orphan).

use crate::{
    LANGUAGE_CODE_FIELD, MASTER_FIELD,
    combined::{Combined, RelatedEntry},
    config::{self, LanguageCode},
    error::Error,
    obs,
    query::{
        QueryError,
        expr::{FilterExpr, SortKey},
        fallback,
        language::LanguageMode,
        resolve::{self, CompiledExpr, EvalContext, Pair},
        rewrite::{self, RootContext},
    },
    registry,
    store::{self, row::Row},
    traits::{FieldWrite, FromRow, Path, TranslatableKind, TranslationKind},
    translation,
    value::Value,
};
use std::{collections::BTreeMap, marker::PhantomData};

///
/// QueryRow
///
/// One materialized result row. `Orphan` carries a translation whose
/// master row no longer exists; it only surfaces under the "all"
/// language mode and during cascade deletion.
///

#[derive(Clone, Debug)]
pub enum QueryRow<S: TranslatableKind> {
    Combined(Combined<S>),
    Orphan(S::Translation),
}

impl<S: TranslatableKind> QueryRow<S> {
    #[must_use]
    pub fn into_combined(self) -> Option<Combined<S>> {
        match self {
            Self::Combined(combined) => Some(combined),
            Self::Orphan(_) => None,
        }
    }

    #[must_use]
    pub const fn is_orphan(&self) -> bool {
        matches!(self, Self::Orphan(_))
    }
}

/// Column projection accumulated by `defer` / `only`.
#[derive(Clone, Debug, Default, PartialEq)]
enum Projection {
    #[default]
    Full,
    Defer(Vec<String>),
    Only(Vec<String>),
}

///
/// TranslationQueryset
///

#[derive(Clone, Debug)]
pub struct TranslationQueryset<S: TranslatableKind> {
    mode: LanguageMode,
    filters: Vec<FilterExpr>,
    ordering: Vec<SortKey>,
    projection: Projection,
    prefetch: Vec<String>,
    _marker: PhantomData<S>,
}

impl<S: TranslatableKind> Default for TranslationQueryset<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TranslatableKind> TranslationQueryset<S> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: LanguageMode::Unbound,
            filters: Vec::new(),
            ordering: Vec::new(),
            projection: Projection::Full,
            prefetch: Vec::new(),
            _marker: PhantomData,
        }
    }

    // ------------------------------------------------------------------
    // Builder surface
    // ------------------------------------------------------------------

    /// Constrain to one language, or pass `"all"` to lift the
    /// constraint entirely.
    pub fn language(mut self, code: impl Into<LanguageCode>) -> Result<Self, Error> {
        self.mode = LanguageMode::bind_single(code)?;
        Ok(self)
    }

    /// Attach a fallback chain after `language`. An empty list takes
    /// the configured default chain.
    pub fn fallbacks(mut self, chain: &[&str]) -> Result<Self, Error> {
        self.mode = self.mode.bind_fallbacks(chain)?;
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

    /// Defer loading of root-level columns; deferred fields read back
    /// as their defaults. Accumulates across calls.
    pub fn defer(mut self, fields: &[&str]) -> Result<Self, Error> {
        let mut deferred = match self.projection {
            Projection::Defer(existing) => existing,
            Projection::Full => Vec::new(),
            Projection::Only(_) => {
                return Err(QueryError::unsupported(
                    "defer",
                    "cannot combine defer() with only()",
                ).into());
            }
        };
        for field in fields {
            Self::check_root_column(field)?;
            deferred.push((*field).to_string());
        }
        self.projection = Projection::Defer(deferred);
        Ok(self)
    }

    /// Drop all deferrals, restoring full-column loads.
    #[must_use]
    pub fn defer_none(mut self) -> Self {
        self.projection = Projection::Full;
        self
    }

    /// Load only the named root-level columns (plus keys).
    pub fn only(mut self, fields: &[&str]) -> Result<Self, Error> {
        if matches!(self.projection, Projection::Defer(_)) {
            return Err(QueryError::unsupported(
                "only",
                "cannot combine only() with defer()",
            ).into());
        }
        let mut kept = match self.projection {
            Projection::Only(existing) => existing,
            _ => Vec::new(),
        };
        for field in fields {
            Self::check_root_column(field)?;
            kept.push((*field).to_string());
        }
        self.projection = Projection::Only(kept);
        Ok(self)
    }

    /// Prefetch related rows along the named relation paths. Paths may
    /// cross shared and translated foreign keys. An empty list is
    /// refused so rewriting stays unambiguous.
    pub fn select_related(mut self, paths: &[&str]) -> Result<Self, Error> {
        if paths.is_empty() {
            return Err(QueryError::unsupported(
                "select_related",
                "an explicit relation list is required",
            ).into());
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

    /// Execute and materialize every result row.
    pub fn fetch(&self) -> Result<Vec<QueryRow<S>>, Error> {
        let matched = self.matched()?;
        let language = self.eval_language();

        let mut out = Vec::with_capacity(matched.len());
        for hit in matched {
            out.push(self.materialize(hit, &language)?);
        }

        Ok(out)
    }

    /// Execute, keeping only rows that combine (orphans drop out).
    pub fn fetch_combined(&self) -> Result<Vec<Combined<S>>, Error> {
        Ok(self
            .fetch()?
            .into_iter()
            .filter_map(QueryRow::into_combined)
            .collect())
    }

    /// Exactly one combined row.
    pub fn get(&self, expr: FilterExpr) -> Result<Combined<S>, Error> {
        self.clone().filter(expr).get_one()
    }

    /// Exactly one combined row from the queryset as built.
    pub fn get_one(&self) -> Result<Combined<S>, Error> {
        self.check_singleton("get")?;

        let mut rows = self.fetch_combined()?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            0 => Err(QueryError::NotFound {
                entity: S::ENTITY_NAME,
            }
            .into()),
            count => Err(QueryError::MultipleRows {
                entity: S::ENTITY_NAME,
                count,
            }
            .into()),
        }
    }

    pub fn first(&self) -> Result<Option<Combined<S>>, Error> {
        Ok(self.fetch_combined()?.into_iter().next())
    }

    pub fn count(&self) -> Result<usize, Error> {
        Ok(self.matched()?.len())
    }

    pub fn exists(&self) -> Result<bool, Error> {
        Ok(!self.matched()?.is_empty())
    }

    /// Combined rows keyed by primary key. Requires per-master
    /// uniqueness, so the "all" mode is refused.
    pub fn in_bulk(&self, ids: &[u64]) -> Result<BTreeMap<u64, Combined<S>>, Error> {
        self.check_singleton("in_bulk")?;

        let mut out = BTreeMap::new();
        for combined in self.fetch_combined()? {
            let pk = combined.pk();
            if ids.contains(&pk) {
                out.insert(pk, combined);
            }
        }

        Ok(out)
    }

    /// Project the named paths into key/value maps. Keys for paths
    /// that cross a translation table include the translation hop
    /// (`rel__translations__field`).
    pub fn values(&self, paths: &[&str]) -> Result<Vec<BTreeMap<String, Value>>, Error> {
        self.check_projectable("values")?;
        let rewritten = self.rewrite_projections(paths)?;
        let ctx = EvalContext {
            language: self.eval_language(),
        };

        let mut out = Vec::new();
        for hit in self.matched()? {
            let pair = hit.pair();
            out.push(
                rewritten
                    .iter()
                    .map(|path| (path.display.clone(), resolve::project(&pair, path, &ctx)))
                    .collect(),
            );
        }

        Ok(out)
    }

    /// Project the named paths into value tuples, in path order.
    pub fn values_list(&self, paths: &[&str]) -> Result<Vec<Vec<Value>>, Error> {
        self.check_projectable("values_list")?;
        let rewritten = self.rewrite_projections(paths)?;
        let ctx = EvalContext {
            language: self.eval_language(),
        };

        let mut out = Vec::new();
        for hit in self.matched()? {
            let pair = hit.pair();
            out.push(
                rewritten
                    .iter()
                    .map(|path| resolve::project(&pair, path, &ctx))
                    .collect(),
            );
        }

        Ok(out)
    }

    /// The combined row ranking highest on `field`.
    pub fn latest(&self, field: &str) -> Result<Combined<S>, Error> {
        self.extreme(field, true)
    }

    /// The combined row ranking lowest on `field`.
    pub fn earliest(&self, field: &str) -> Result<Combined<S>, Error> {
        self.extreme(field, false)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Create a shared row and its first translation in one
    /// transaction. Attributes split by side; `master` passes a
    /// pre-existing shared row, in which case shared attributes are
    /// refused.
    pub fn create(&self, attrs: &[(&str, Value)]) -> Result<Combined<S>, Error> {
        let split = self.split_attrs(attrs)?;
        let language = split
            .language
            .clone()
            .or_else(|| self.mode.effective_single())
            .ok_or_else(|| {
                QueryError::validation("create() requires a single language, not 'all'")
            })?;

        if split.master.is_some() && !split.shared.is_empty() {
            return Err(QueryError::validation(
                "create() cannot combine an explicit master with shared attributes",
            )
            .into());
        }

        store::transaction(|| {
            let master_pk = match split.master {
                Some(pk) => {
                    store::get(S::PATH, pk).ok_or(crate::store::StoreError::NotFound {
                        path: S::PATH.to_string(),
                        id: pk,
                    })?;
                    pk
                }
                None => {
                    let mut shared = S::default();
                    for (field, value) in &split.shared {
                        shared.set_value(field, value)?;
                    }
                    store::insert(S::PATH, Row::from_entity(&shared))?
                }
            };

            let translation_pk = store::savepoint(|| {
                let mut translation =
                    S::Translation::new_unsaved(language.clone(), Some(master_pk));
                for (field, value) in &split.translated {
                    translation.set_value(field, value)?;
                }
                store::insert(
                    <S::Translation as Path>::PATH,
                    Row::from_entity(&translation),
                )
                .map_err(Error::from)
            })?;

            let shared_row = store::get(S::PATH, master_pk).ok_or_else(|| {
                Error::from(crate::store::StoreError::NotFound {
                    path: S::PATH.to_string(),
                    id: master_pk,
                })
            })?;
            let translation_row = store::get(<S::Translation as Path>::PATH, translation_pk)
                .ok_or_else(|| {
                    Error::from(crate::store::StoreError::NotFound {
                        path: <S::Translation as Path>::PATH.to_string(),
                        id: translation_pk,
                    })
                })?;

            Ok(Combined::combine(
                S::from_row(&shared_row)?,
                S::Translation::from_row(&translation_row)?,
            ))
        })
    }

    /// Look up by the given attributes; create from them on miss.
    /// Returns the row and whether it was created.
    pub fn get_or_create(&self, attrs: &[(&str, Value)]) -> Result<(Combined<S>, bool), Error> {
        let mut lookup = self.clone();
        for (field, value) in attrs {
            lookup = lookup.filter_by(*field, value.clone());
        }

        match lookup.get_one() {
            Ok(found) => Ok((found, false)),
            Err(err) if err.is_not_found() => Ok((self.create(attrs)?, true)),
            Err(err) => Err(err),
        }
    }

    /// Update matching rows in place. Translated attributes land on
    /// the matching translation rows; shared attributes land on the
    /// masters owning them. Returns the number of matched rows.
    pub fn update(&self, attrs: &[(&str, Value)]) -> Result<usize, Error> {
        if self.mode.is_fallback() {
            return Err(QueryError::unsupported(
                "update",
                "the target language is ambiguous under fallbacks",
            ).into());
        }

        let split = self.split_attrs(attrs)?;
        if split.master.is_some() || split.language.is_some() {
            return Err(QueryError::validation(
                "update() cannot reassign master or language_code",
            ).into());
        }

        let translated_patch: Vec<(String, Value)> = split
            .translated
            .iter()
            .map(|(f, v)| (f.clone(), v.clone()))
            .collect();
        let shared_patch: Vec<(String, Value)> = split
            .shared
            .iter()
            .map(|(f, v)| (f.clone(), v.clone()))
            .collect();

        let matched = self.matched()?;
        store::transaction(|| {
            let mut masters_done: Vec<u64> = Vec::new();
            for hit in &matched {
                if !translated_patch.is_empty() {
                    store::update(
                        <S::Translation as Path>::PATH,
                        hit.translation_id,
                        &translated_patch,
                    )?;
                }
                if let Some(master) = hit.master {
                    if !shared_patch.is_empty() && !masters_done.contains(&master) {
                        store::update(S::PATH, master, &shared_patch)?;
                        masters_done.push(master);
                    }
                }
            }
            Ok::<_, Error>(())
        })?;

        Ok(matched.len())
    }

    /// Delete every shared row owning a matching translation, cascading
    /// to all of its translations. Returns the number of shared rows
    /// deleted.
    pub fn delete(&self) -> Result<usize, Error> {
        let matched = self.matched()?;
        let mut masters: Vec<u64> = matched.iter().filter_map(|hit| hit.master).collect();
        masters.sort_unstable();
        masters.dedup();

        store::transaction(|| {
            for master in &masters {
                translation::delete_all_for_master::<S>(*master);
                store::delete(S::PATH, *master);
            }
            Ok::<_, Error>(())
        })?;

        Ok(masters.len())
    }

    /// Delete only the matching translation rows, leaving shared rows
    /// intact (possibly untranslated).
    pub fn delete_translations(&self) -> Result<usize, Error> {
        let matched = self.matched()?;
        store::transaction(|| {
            for hit in &matched {
                store::delete(<S::Translation as Path>::PATH, hit.translation_id);
            }
            Ok::<_, Error>(())
        })?;

        Ok(matched.len())
    }

    // ------------------------------------------------------------------
    // Explicitly unsupported operations
    // ------------------------------------------------------------------

    pub fn bulk_create(&self) -> Result<(), Error> {
        Err(QueryError::unsupported(
            "bulk_create",
            "per-row translation splitting is required; create rows individually",
        ).into())
    }

    pub fn update_or_create(&self) -> Result<(), Error> {
        Err(QueryError::unsupported(
            "update_or_create",
            "use get_or_create followed by an explicit update",
        ).into())
    }

    pub fn aggregate(&self) -> Result<(), Error> {
        Err(QueryError::unsupported(
            "aggregate",
            "aggregation across the shared/translation split is not defined",
        ).into())
    }

    pub fn annotate(&self) -> Result<(), Error> {
        Err(QueryError::unsupported(
            "annotate",
            "annotation across the shared/translation split is not defined",
        ).into())
    }

    pub fn dates(&self) -> Result<(), Error> {
        Err(QueryError::unsupported("dates", "not implemented").into())
    }

    pub fn reverse(&self) -> Result<(), Error> {
        Err(QueryError::unsupported(
            "reverse",
            "declare the ordering explicitly instead",
        ).into())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    const fn root() -> RootContext {
        RootContext::dual(S::PATH)
    }

    /// The language applied at translation hops during evaluation and
    /// prefetch. The "all" mode still resolves related translations in
    /// the process language.
    fn eval_language(&self) -> Option<LanguageCode> {
        self.mode
            .effective_single()
            .or_else(|| Some(config::process_language()))
    }

    fn compiled(&self) -> Result<Option<CompiledExpr>, Error> {
        if self.filters.is_empty() {
            return Ok(None);
        }
        let expr = FilterExpr::And(self.filters.clone());
        let compiled = resolve::compile(Self::root(), &expr)?;

        if self.mode.is_fallback() && compiled.crosses_translation() {
            return Err(QueryError::unsupported(
                "filter",
                "predicates crossing another translation table cannot run under fallbacks",
            ).into());
        }

        Ok(Some(compiled))
    }

    /// Run the query: select candidate translation rows by language
    /// mode, join masters, apply the predicate, then the fallback
    /// post-pass and ordering.
    fn matched(&self) -> Result<Vec<MatchedRow>, Error> {
        if self.mode.is_fallback() {
            if !self.prefetch.is_empty() {
                return Err(QueryError::unsupported(
                    "select_related",
                    "deep prefetch does not compose with the fallback post-pass",
                )
                .into());
            }
            if self.projection != Projection::Full {
                return Err(QueryError::unsupported(
                    "defer",
                    "column projection does not compose with the fallback post-pass",
                )
                .into());
            }
        }

        let compiled = self.compiled()?;
        let restrict = match &self.mode {
            LanguageMode::Unbound | LanguageMode::Single(_) => self.mode.effective_single(),
            LanguageMode::All | LanguageMode::Fallback { .. } => None,
        };
        let ctx = EvalContext {
            language: self.eval_language(),
        };

        let mut matched = Vec::new();
        for (translation_id, row) in store::rows(<S::Translation as Path>::PATH) {
            let language = match row.value_or_null(LANGUAGE_CODE_FIELD) {
                Value::Text(code) => LanguageCode::new(code),
                _ => continue,
            };
            if let Some(wanted) = &restrict {
                if language != *wanted {
                    continue;
                }
            }

            let master = row.value_or_null(MASTER_FIELD).as_uint();
            let shared = master.and_then(|pk| store::get(S::PATH, pk));
            let master = shared.as_ref().and(master);

            let pair = Pair::dual(shared.clone(), row.clone());
            if let Some(expr) = &compiled {
                if !resolve::matches(expr, &pair, &ctx) {
                    continue;
                }
            }

            matched.push(MatchedRow {
                master,
                language,
                translation_id,
                shared,
                translation: row,
            });
        }

        if let LanguageMode::Fallback { primary, chain } = &self.mode {
            matched = Self::resolve_fallbacks(matched, primary, chain);
        }

        self.sort(&mut matched)?;

        Ok(matched)
    }

    /// One row per master, best language first. The predicate decides
    /// which masters qualify; language selection then runs over each
    /// master's full set of stored translations, so a filter hit in a
    /// lower-ranked language never shadows a better-ranked row.
    /// Orphans drop out.
    fn resolve_fallbacks(
        matched: Vec<MatchedRow>,
        primary: &LanguageCode,
        chain: &[LanguageCode],
    ) -> Vec<MatchedRow> {
        let order = fallback::language_order(primary, chain);

        let mut grouped: BTreeMap<u64, MatchedRow> = BTreeMap::new();
        for hit in matched {
            let Some(master) = hit.master else { continue };
            grouped.entry(master).or_insert(hit);
        }

        let masters: Vec<u64> = grouped.keys().copied().collect();
        let available = translation::available_languages::<S>(&masters);

        let mut out = Vec::with_capacity(grouped.len());
        for (master, hit) in grouped {
            let Some(languages) = available.get(&master) else {
                continue;
            };
            let candidates = languages.iter().map(|code| (code.clone(), ())).collect();
            let Some((language, ())) = fallback::pick(&order, candidates) else {
                continue;
            };
            if language != *primary {
                obs::metrics::record_fallback();
            }
            if hit.language == language {
                out.push(hit);
            } else if let Some((translation_id, translation)) =
                fetch_translation_row(S::PATH, master, &language)
            {
                out.push(MatchedRow {
                    master: Some(master),
                    language,
                    translation_id,
                    shared: hit.shared,
                    translation,
                });
            }
        }

        out
    }

    fn sort(&self, matched: &mut [MatchedRow]) -> Result<(), Error> {
        let keys: Vec<SortKey> = if self.ordering.is_empty() {
            S::MODEL
                .ordering
                .iter()
                .map(|field| SortKey::parse(field))
                .collect()
        } else {
            self.ordering.clone()
        };

        let rewritten: Vec<(crate::query::rewrite::RewrittenPath, bool)> = keys
            .iter()
            .map(|key| {
                rewrite::rewrite_value_path(Self::root(), &key.path)
                    .map(|path| (path, key.descending))
            })
            .collect::<Result<_, _>>()?;

        let ctx = EvalContext {
            language: self.eval_language(),
        };

        matched.sort_by(|a, b| {
            let pair_a = a.pair();
            let pair_b = b.pair();
            for (path, descending) in &rewritten {
                let va = resolve::project(&pair_a, path, &ctx);
                let vb = resolve::project(&pair_b, path, &ctx);
                let ordering = va.compare(&vb);
                let ordering = if *descending { ordering.reverse() } else { ordering };
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            // Stable result order regardless of insertion history.
            (a.master, a.language.as_str()).cmp(&(b.master, b.language.as_str()))
        });

        Ok(())
    }

    fn materialize(
        &self,
        hit: MatchedRow,
        language: &Option<LanguageCode>,
    ) -> Result<QueryRow<S>, Error> {
        let Some(shared_row) = hit.shared else {
            obs::metrics::record_orphan();
            return Ok(QueryRow::Orphan(S::Translation::from_row(
                &hit.translation,
            )?));
        };

        let translation_full = hit.translation;
        let shared_row = self.project_shared(shared_row);
        let translation_row = self.project_translation(translation_full.clone());

        let shared = S::from_row(&shared_row)?;
        let translation = S::Translation::from_row(&translation_row)?;
        obs::metrics::record_translation_load();

        let mut combined = Combined::combine(shared, translation);
        for path in &self.prefetch {
            Self::attach_related(&mut combined, &shared_row, &translation_full, path, language);
        }

        Ok(QueryRow::Combined(combined))
    }

    fn project_shared(&self, mut row: Row) -> Row {
        match &self.projection {
            Projection::Full => row,
            Projection::Defer(fields) => {
                for field in fields {
                    if S::MODEL.has_field(field) {
                        row.remove(field);
                    }
                }
                row
            }
            Projection::Only(fields) => {
                let keep: Vec<String> = row
                    .iter()
                    .map(|(name, _)| name.clone())
                    .filter(|name| {
                        name == S::MODEL.primary_key
                            || !S::MODEL.has_field(name)
                            || fields.iter().any(|f| f == name)
                    })
                    .collect();
                let mut kept = Row::new();
                for name in keep {
                    if let Some(value) = row.remove(&name) {
                        kept.set(name, value);
                    }
                }
                kept
            }
        }
    }

    fn project_translation(&self, mut row: Row) -> Row {
        let keyed =
            |name: &str| name == "id" || name == LANGUAGE_CODE_FIELD || name == MASTER_FIELD;
        match &self.projection {
            Projection::Full => row,
            Projection::Defer(fields) => {
                for field in fields {
                    if S::TRANSLATED_FIELDS.contains(&field.as_str()) {
                        row.remove(field);
                    }
                }
                row
            }
            Projection::Only(fields) => {
                let keep: Vec<String> = row
                    .iter()
                    .map(|(name, _)| name.clone())
                    .filter(|name| {
                        keyed(name)
                            || !S::TRANSLATED_FIELDS.contains(&name.as_str())
                            || fields.iter().any(|f| f == name)
                    })
                    .collect();
                let mut kept = Row::new();
                for name in keep {
                    if let Some(value) = row.remove(&name) {
                        kept.set(name, value);
                    }
                }
                kept
            }
        }
    }

    /// Walk one prefetch path and attach an entry per hop prefix.
    fn attach_related(
        combined: &mut Combined<S>,
        shared_row: &Row,
        translation_row: &Row,
        path: &str,
        language: &Option<LanguageCode>,
    ) {
        let mut entity_path: &'static str = S::PATH;
        let mut current = shared_row.clone();
        let mut translation_source = Some(translation_row.clone());
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
                language
                    .as_ref()
                    .and_then(|lang| fetch_translation_row(rel.target_path, pk, lang))
                    .map(|(_, row)| row)
            } else {
                None
            };

            if !prefix.is_empty() {
                prefix.push_str(crate::PATH_SEPARATOR);
            }
            prefix.push_str(rel.name);

            combined.set_related(
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

    fn extreme(&self, field: &str, descending: bool) -> Result<Combined<S>, Error> {
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
                    entity: S::ENTITY_NAME,
                })
            })
    }

    fn rewrite_projections(
        &self,
        paths: &[&str],
    ) -> Result<Vec<crate::query::rewrite::RewrittenPath>, Error> {
        paths
            .iter()
            .map(|path| rewrite::rewrite_value_path(Self::root(), path).map_err(Error::from))
            .collect()
    }

    /// Singleton-expecting operations refuse the "all" mode and any
    /// `language_code='all'` filter argument.
    fn check_singleton(&self, operation: &'static str) -> Result<(), Error> {
        if self.mode.is_all() {
            return Err(QueryError::validation(format!(
                "{operation}() requires per-master uniqueness; language('all') is not allowed"
            )).into());
        }

        let mut all_filtered = false;
        for expr in &self.filters {
            expr.for_each_condition(&mut |condition| {
                let is_language = condition.path == LANGUAGE_CODE_FIELD
                    || condition
                        .path
                        .ends_with(&format!("{}{}", crate::PATH_SEPARATOR, LANGUAGE_CODE_FIELD));
                if is_language && condition.value.loosely_equals(&Value::text("all")) {
                    all_filtered = true;
                }
            });
        }
        if all_filtered {
            return Err(QueryError::validation(format!(
                "{operation}() cannot take language_code='all' as a filter argument"
            )).into());
        }

        Ok(())
    }

    /// Values-style projection cannot survive the fallback post-pass.
    fn check_projectable(&self, operation: &'static str) -> Result<(), Error> {
        if self.mode.is_fallback() {
            return Err(QueryError::unsupported(
                operation,
                "values-style projection does not compose with the fallback post-pass",
            )
            .into());
        }
        Ok(())
    }

    fn check_root_column(field: &str) -> Result<(), Error> {
        if field == "id" || field == LANGUAGE_CODE_FIELD || field == MASTER_FIELD {
            return Err(QueryError::validation(format!(
                "'{field}' is a key column and cannot be projected away"
            )).into());
        }
        if S::MODEL.has_field(field) || S::TRANSLATED_FIELDS.contains(&field) {
            return Ok(());
        }
        Err(QueryError::FieldDoesNotExist {
            path: field.to_string(),
            hint: format!(
                "projection fields must be root columns of '{}' or its translation",
                S::ENTITY_NAME
            ),
        }
        .into())
    }

    fn check_relation_path(path: &str) -> Result<(), Error> {
        let mut entity_path: &str = S::PATH;
        for token in path.split(crate::PATH_SEPARATOR) {
            let Some(rel) = registry::relation(entity_path, token) else {
                return Err(QueryError::FieldDoesNotExist {
                    path: path.to_string(),
                    hint: format!("'{token}' is not a relation of '{entity_path}'"),
                }.into());
            };
            entity_path = rel.target_path;
        }
        Ok(())
    }

    fn split_attrs(&self, attrs: &[(&str, Value)]) -> Result<SplitAttrs, Error> {
        let mut split = SplitAttrs::default();
        for (name, value) in attrs {
            if *name == MASTER_FIELD {
                split.master = value.as_uint();
                if split.master.is_none() {
                    return Err(QueryError::validation(
                        "master must be an existing primary key",
                    ).into());
                }
                continue;
            }
            if *name == LANGUAGE_CODE_FIELD {
                let Some(code) = value.as_text() else {
                    return Err(QueryError::validation("language_code must be text").into());
                };
                if code == "all" {
                    return Err(QueryError::validation(
                        "language_code='all' is not a storable language",
                    ).into());
                }
                config::current()
                    .check(code)
                    .map_err(|err| QueryError::validation(err.to_string()))?;
                split.language = Some(LanguageCode::new(code));
                continue;
            }
            if S::TRANSLATED_FIELDS.contains(name) {
                split.translated.push(((*name).to_string(), value.clone()));
            } else if S::MODEL.has_field(name) {
                split.shared.push(((*name).to_string(), value.clone()));
            } else {
                return Err(QueryError::FieldDoesNotExist {
                    path: (*name).to_string(),
                    hint: format!(
                        "'{name}' is neither a shared nor a translated field of '{}'",
                        S::ENTITY_NAME
                    ),
                }.into());
            }
        }
        Ok(split)
    }
}

/// Attribute lists split by side of the shared/translation divide.
#[derive(Debug, Default)]
struct SplitAttrs {
    shared: Vec<(String, Value)>,
    translated: Vec<(String, Value)>,
    master: Option<u64>,
    language: Option<LanguageCode>,
}

/// One translation row surviving selection, with its joined master.
#[derive(Clone, Debug)]
struct MatchedRow {
    master: Option<u64>,
    language: LanguageCode,
    translation_id: u64,
    shared: Option<Row>,
    translation: Row,
}

impl MatchedRow {
    fn pair(&self) -> Pair {
        Pair::dual(self.shared.clone(), self.translation.clone())
    }
}

/// Untyped translation-row lookup used by prefetch and the fallback
/// post-pass.
fn fetch_translation_row(
    entity_path: &str,
    master: u64,
    language: &LanguageCode,
) -> Option<(u64, Row)> {
    let translation_path = registry::translation_path(entity_path)?;
    store::rows(translation_path).into_iter().find_map(|(id, row)| {
        let matches_master = row.value_or_null(MASTER_FIELD).loosely_equals(&Value::Uint(master));
        let matches_language = row.value_or_null(LANGUAGE_CODE_FIELD)
            == Value::Text(language.as_str().to_string());
        (matches_master && matches_language).then_some((id, row))
    })
}

///
/// TranslatableQuerying
///
/// Entry point mixed into every translatable entity.
///

pub trait TranslatableQuerying: TranslatableKind {
    /// A fresh unbound queryset over this entity.
    #[must_use]
    fn objects() -> TranslationQueryset<Self> {
        TranslationQueryset::new()
    }
}

impl<S: TranslatableKind> TranslatableQuerying for S {}
