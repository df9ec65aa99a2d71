//! Logical path classification.
//!
//! A query path is a `__`-separated token sequence naming fields and
//! relations from either side of the shared/translation split. The
//! rewriter turns each path into an explicit step sequence the
//! resolver can walk mechanically: shared fields at the dual root gain
//! a `Master` hop, translated fields on related translatable entities
//! gain a `Translations` hop, relation tokens become typed joins, and
//! a trailing operator token is split off.

use crate::{
    PATH_SEPARATOR,
    model::field::RelationModel,
    query::{QueryError, expr::CompareOp},
    registry::{self, Registration, RegistrationKind},
};

///
/// Step
///
/// One hop of a rewritten path. `Master` moves from the translation
/// row to its shared row, `Translations` moves from a shared row into
/// its translation set (evaluated existentially under the query's
/// language constraint), `Relation` follows a declared foreign key,
/// and `Field` terminates the walk with a column read.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Master,
    Translations { entity_path: &'static str },
    Relation(RelationModel),
    Field(String),
}

///
/// RewrittenPath
///

#[derive(Clone, Debug)]
pub struct RewrittenPath {
    pub steps: Vec<Step>,
    pub op: CompareOp,
    /// The path as the underlying schema sees it, for diagnostics and
    /// projection keys (`rel__translations__field`).
    pub display: String,
    /// True when any step crosses into a translation table other than
    /// the root's own.
    pub crosses_translation: bool,
}

///
/// RootContext
///
/// Where a path starts. A translatable queryset is rooted at the dual
/// S/T pair; a manager over a plain entity is rooted at the shared row
/// alone. `aware` marks translation-aware access: unaware roots refuse
/// to cross into any translation table.
///

#[derive(Clone, Copy, Debug)]
pub struct RootContext {
    pub path: &'static str,
    pub dual: bool,
    pub aware: bool,
}

impl RootContext {
    #[must_use]
    pub const fn dual(path: &'static str) -> Self {
        Self {
            path,
            dual: true,
            aware: true,
        }
    }

    #[must_use]
    pub const fn plain(path: &'static str, aware: bool) -> Self {
        Self { path, dual: false, aware }
    }
}

/// Position of the classifier between tokens.
#[derive(Clone, Copy, Debug)]
enum Pos {
    /// Root of a translatable queryset: the joined S/T pair.
    Dual(&'static str),
    /// At a shared entity row (plain or translatable).
    Shared(&'static str),
    /// Inside a translation row of the entity at the given path.
    Translation(&'static str),
}

/// Rewrite a filter path. A trailing operator token is accepted.
pub fn rewrite_filter_path(root: RootContext, raw: &str) -> Result<RewrittenPath, QueryError> {
    rewrite(root, raw, true)
}

/// Rewrite an ordering or projection path. Operator tokens are not
/// field names here.
pub fn rewrite_value_path(root: RootContext, raw: &str) -> Result<RewrittenPath, QueryError> {
    rewrite(root, raw, false)
}

fn rewrite(root: RootContext, raw: &str, allow_op: bool) -> Result<RewrittenPath, QueryError> {
    let tokens: Vec<&str> = raw.split(PATH_SEPARATOR).collect();
    if tokens.is_empty() || tokens.iter().any(|t| t.is_empty()) {
        return Err(no_field(raw, "empty path segment"));
    }

    let mut out = Rewriter {
        root,
        raw,
        steps: Vec::new(),
        display: Vec::new(),
        crosses_translation: false,
    };
    let mut pos = if root.dual {
        Pos::Dual(root.path)
    } else {
        Pos::Shared(root.path)
    };

    let mut index = 0;
    let mut op = CompareOp::Eq;
    while index < tokens.len() {
        let token = tokens[index];
        let last = index == tokens.len() - 1;

        // An operator token is only legal in final position, after a
        // field has been consumed.
        if allow_op && last && index > 0 {
            if let Some(parsed) = CompareOp::from_token(token) {
                if matches!(out.steps.last(), Some(Step::Field(_))) {
                    op = parsed;
                    index += 1;
                    continue;
                }
            }
        }

        if matches!(out.steps.last(), Some(Step::Field(_))) {
            return Err(no_field(
                raw,
                format!("'{token}' follows a terminal field"),
            ));
        }

        pos = out.consume(pos, token, last)?;
        index += 1;
    }

    if !matches!(out.steps.last(), Some(Step::Field(_))) {
        return Err(no_field(raw, "path does not end in a field"));
    }

    Ok(RewrittenPath {
        steps: out.steps,
        op,
        display: out.display.join(PATH_SEPARATOR),
        crosses_translation: out.crosses_translation,
    })
}

struct Rewriter<'a> {
    root: RootContext,
    raw: &'a str,
    steps: Vec<Step>,
    display: Vec<&'static str>,
    crosses_translation: bool,
}

impl Rewriter<'_> {
    fn consume(&mut self, pos: Pos, token: &str, last: bool) -> Result<Pos, QueryError> {
        match pos {
            Pos::Dual(path) => self.consume_dual(path, token, last),
            Pos::Shared(path) => self.consume_shared(path, token, last),
            Pos::Translation(master_path) => self.consume_translation(master_path, token, last),
        }
    }

    fn consume_dual(
        &mut self,
        path: &'static str,
        token: &str,
        last: bool,
    ) -> Result<Pos, QueryError> {
        let registration = self.require(path)?;
        let RegistrationKind::Translatable {
            translation_path,
            translated_fields,
            ..
        } = registration.kind
        else {
            return Err(QueryError::validation(format!(
                "'{path}' is not a translatable entity"
            )));
        };

        // Explicit master hop: continue on the shared side.
        if token == crate::MASTER_FIELD {
            self.push_named(Step::Master, "master");
            return Ok(Pos::Shared(path));
        }

        // Primary key reads resolve against the shared row.
        if token == "pk" || token == registration.model.primary_key {
            self.push_named(Step::Master, "master");
            self.push_field(registration.model.primary_key);
            return Ok(Pos::Dual(path));
        }

        // Translated fields live on the root translation row itself.
        if translated_fields.contains(&token) || token == crate::LANGUAGE_CODE_FIELD {
            if let Some(rel) = self.translated_relation(translation_path, token) {
                if !last {
                    self.push_named(Step::Relation(rel), rel.name);
                    return Ok(Pos::Shared(rel.target_path));
                }
            }
            self.push_field(intern_field(translation_path, token, self.raw)?);
            return Ok(Pos::Dual(path));
        }

        // Shared fields and relations gain the master hop.
        if let Some(rel) = registration.model.relation(token).copied() {
            self.push_named(Step::Master, "master");
            if last {
                self.push_field(rel.local_field);
            } else {
                self.push_named(Step::Relation(rel), rel.name);
                return Ok(Pos::Shared(rel.target_path));
            }
            return Ok(Pos::Dual(path));
        }
        if registration.model.has_field(token) {
            self.push_named(Step::Master, "master");
            self.push_field(intern_field(path, token, self.raw)?);
            return Ok(Pos::Dual(path));
        }

        Err(no_field(
            self.raw,
            format!(
                "'{token}' is neither a shared nor a translated field of '{}'",
                registration.model.entity_name
            ),
        ))
    }

    fn consume_shared(
        &mut self,
        path: &'static str,
        token: &str,
        last: bool,
    ) -> Result<Pos, QueryError> {
        let registration = self.require(path)?;

        if token == "pk" {
            self.push_field(registration.model.primary_key);
            return Ok(Pos::Shared(path));
        }

        if let Some(rel) = registration.model.relation(token).copied() {
            if last {
                self.push_field(rel.local_field);
            } else {
                self.push_named(Step::Relation(rel), rel.name);
                return Ok(Pos::Shared(rel.target_path));
            }
            return Ok(Pos::Shared(path));
        }

        if registration.model.has_field(token) {
            self.push_field(intern_field(path, token, self.raw)?);
            return Ok(Pos::Shared(path));
        }

        // Translated fields of a translatable entity reached here need
        // a translation hop, which unaware access refuses.
        if let RegistrationKind::Translatable {
            translated_fields,
            accessor,
            ..
        } = registration.kind
        {
            let named_accessor = token == accessor;
            let translated = translated_fields.contains(&token) || token == crate::LANGUAGE_CODE_FIELD;
            if named_accessor || translated {
                if !self.root.aware {
                    return Err(QueryError::WrongAccessor {
                        path: self.raw.to_string(),
                        hint: format!(
                            "'{token}' belongs to the translations of '{}'; use the translation-aware manager",
                            registration.model.entity_name
                        ),
                    });
                }
                self.crosses_translation = true;
                self.push_named(
                    Step::Translations { entity_path: path },
                    accessor,
                );
                if named_accessor {
                    return Ok(Pos::Translation(path));
                }
                return self.consume_translation(path, token, last);
            }
        }

        Err(no_field(
            self.raw,
            format!(
                "'{token}' is not a field or relation of '{}'",
                registration.model.entity_name
            ),
        ))
    }

    fn consume_translation(
        &mut self,
        master_path: &'static str,
        token: &str,
        last: bool,
    ) -> Result<Pos, QueryError> {
        let translation_path = registry::translation_path(master_path)
            .ok_or_else(|| QueryError::validation(format!("'{master_path}' is not registered")))?;
        let registration = self.require(translation_path)?;

        if let Some(rel) = registration.model.relation(token).copied() {
            if last {
                self.push_field(rel.local_field);
            } else {
                self.push_named(Step::Relation(rel), rel.name);
                return Ok(Pos::Shared(rel.target_path));
            }
            return Ok(Pos::Translation(master_path));
        }

        if registration.model.has_field(token) {
            self.push_field(intern_field(translation_path, token, self.raw)?);
            return Ok(Pos::Translation(master_path));
        }

        Err(no_field(
            self.raw,
            format!(
                "'{token}' is not a field of '{}'",
                registration.model.entity_name
            ),
        ))
    }

    fn require(&self, path: &str) -> Result<Registration, QueryError> {
        registry::require(path).map_err(|err| QueryError::validation(err.to_string()))
    }

    /// Translated foreign keys are relations on the translation model.
    fn translated_relation(
        &self,
        translation_path: &'static str,
        token: &str,
    ) -> Option<RelationModel> {
        registry::lookup(translation_path)?
            .model
            .relation(token)
            .copied()
    }

    fn push_named(&mut self, step: Step, segment: &'static str) {
        self.steps.push(step);
        self.display.push(segment);
    }

    fn push_field(&mut self, name: &'static str) {
        self.steps.push(Step::Field(name.to_string()));
        self.display.push(name);
    }
}

/// Resolve a token back to the `&'static str` the model declares, so
/// display strings never allocate per segment.
fn intern_field(path: &str, token: &str, raw: &str) -> Result<&'static str, QueryError> {
    registry::lookup(path)
        .and_then(|r| r.model.fields.iter().find(|f| f.name == token).map(|f| f.name))
        .ok_or_else(|| no_field(raw, format!("'{token}' not declared on '{path}'")))
}

fn no_field(path: &str, hint: impl Into<String>) -> QueryError {
    QueryError::FieldDoesNotExist {
        path: path.to_string(),
        hint: hint.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{NORMAL, STANDARD, setup};

    #[test]
    fn shared_field_at_dual_root_gains_master_hop() {
        setup();
        let root = RootContext::dual(NORMAL);
        let rewritten = rewrite_filter_path(root, "shared_field").unwrap();
        assert_eq!(rewritten.display, "master__shared_field");
        assert_eq!(rewritten.steps[0], Step::Master);
        assert!(!rewritten.crosses_translation);
    }

    #[test]
    fn translated_field_at_dual_root_is_unchanged() {
        setup();
        let root = RootContext::dual(NORMAL);
        let rewritten = rewrite_filter_path(root, "translated_field").unwrap();
        assert_eq!(rewritten.display, "translated_field");
        assert_eq!(rewritten.steps.len(), 1);
    }

    #[test]
    fn operator_suffix_passes_through() {
        setup();
        let root = RootContext::dual(NORMAL);
        let rewritten = rewrite_filter_path(root, "translated_field__contains").unwrap();
        assert_eq!(rewritten.op, CompareOp::Contains);
        assert_eq!(rewritten.display, "translated_field");
    }

    #[test]
    fn relation_to_translated_field_gains_translations_hop() {
        setup();
        let root = RootContext::plain(STANDARD, true);
        let rewritten = rewrite_filter_path(root, "normal__translated_field").unwrap();
        assert_eq!(rewritten.display, "normal__translations__translated_field");
        assert!(rewritten.crosses_translation);
    }

    #[test]
    fn unaware_access_to_translated_field_is_wrong_accessor() {
        setup();
        let root = RootContext::plain(STANDARD, false);
        let err = rewrite_filter_path(root, "normal__translated_field").unwrap_err();
        assert!(matches!(err, QueryError::WrongAccessor { .. }));
    }

    #[test]
    fn unknown_token_is_field_does_not_exist() {
        setup();
        let root = RootContext::dual(NORMAL);
        let err = rewrite_filter_path(root, "no_such_field").unwrap_err();
        assert!(matches!(err, QueryError::FieldDoesNotExist { .. }));
    }

    #[test]
    fn ordering_path_rejects_operator_tokens() {
        setup();
        let root = RootContext::dual(NORMAL);
        let err = rewrite_value_path(root, "translated_field__contains").unwrap_err();
        assert!(matches!(err, QueryError::FieldDoesNotExist { .. }));
    }

    #[test]
    fn pk_resolves_to_shared_primary_key() {
        setup();
        let root = RootContext::dual(NORMAL);
        let rewritten = rewrite_filter_path(root, "pk").unwrap();
        assert_eq!(rewritten.display, "master__id");
    }
}
