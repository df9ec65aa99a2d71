//! Compiled predicate and projection evaluation.
//!
//! The rewriter emits step sequences; this module walks them against
//! the store. A walk can fan out (a `Translations` hop reaches every
//! translation row in the effective language), so step evaluation
//! yields a value set and comparisons hold when any reached value
//! satisfies the operator.

use crate::{
    LANGUAGE_CODE_FIELD, MASTER_FIELD,
    config::LanguageCode,
    query::{
        QueryError,
        expr::FilterExpr,
        rewrite::{self, RewrittenPath, RootContext, Step},
    },
    registry,
    store::{self, row::Row},
    value::Value,
};

///
/// EvalContext
///
/// Language constraint applied at every `Translations` hop. `None`
/// lifts the constraint (the "all" mode).
///

#[derive(Clone, Debug)]
pub struct EvalContext {
    pub language: Option<LanguageCode>,
}

///
/// Pair
///
/// The root of a walk. A dual root carries the translation row and its
/// (possibly absent) shared row; a plain root carries the shared row
/// alone.
///

#[derive(Clone, Debug)]
pub struct Pair {
    pub shared: Option<Row>,
    pub translation: Option<Row>,
}

impl Pair {
    #[must_use]
    pub const fn dual(shared: Option<Row>, translation: Row) -> Self {
        Self {
            shared,
            translation: Some(translation),
        }
    }

    #[must_use]
    pub const fn plain(shared: Row) -> Self {
        Self {
            shared: Some(shared),
            translation: None,
        }
    }
}

///
/// CompiledExpr
///

#[derive(Clone, Debug)]
pub enum CompiledExpr {
    And(Vec<CompiledExpr>),
    Or(Vec<CompiledExpr>),
    Not(Box<CompiledExpr>),
    Cond {
        rewritten: RewrittenPath,
        value: Value,
    },
}

impl CompiledExpr {
    /// True when any rewritten condition in the tree crosses a
    /// translation table.
    #[must_use]
    pub fn crosses_translation(&self) -> bool {
        match self {
            Self::And(children) | Self::Or(children) => {
                children.iter().any(Self::crosses_translation)
            }
            Self::Not(child) => child.crosses_translation(),
            Self::Cond { rewritten, .. } => rewritten.crosses_translation,
        }
    }
}

/// Rewrite every path in a logical expression.
pub fn compile(root: RootContext, expr: &FilterExpr) -> Result<CompiledExpr, QueryError> {
    match expr {
        FilterExpr::And(children) => Ok(CompiledExpr::And(
            children
                .iter()
                .map(|child| compile(root, child))
                .collect::<Result<_, _>>()?,
        )),
        FilterExpr::Or(children) => Ok(CompiledExpr::Or(
            children
                .iter()
                .map(|child| compile(root, child))
                .collect::<Result<_, _>>()?,
        )),
        FilterExpr::Not(child) => Ok(CompiledExpr::Not(Box::new(compile(root, child)?))),
        FilterExpr::Cond(condition) => {
            let rewritten = rewrite::rewrite_filter_path(root, &condition.path)?;
            Ok(CompiledExpr::Cond {
                rewritten,
                value: condition.value.clone(),
            })
        }
    }
}

/// Evaluate a compiled expression against one root pair.
#[must_use]
pub fn matches(expr: &CompiledExpr, pair: &Pair, ctx: &EvalContext) -> bool {
    match expr {
        CompiledExpr::And(children) => children.iter().all(|child| matches(child, pair, ctx)),
        CompiledExpr::Or(children) => children.iter().any(|child| matches(child, pair, ctx)),
        CompiledExpr::Not(child) => !matches(child, pair, ctx),
        CompiledExpr::Cond { rewritten, value } => {
            let reached = walk_pair(pair, &rewritten.steps, ctx);
            if reached.is_empty() {
                // Outer-join semantics: an unreachable column compares
                // as NULL.
                return rewritten.op.apply(&Value::Null, value);
            }
            reached.iter().any(|lhs| rewritten.op.apply(lhs, value))
        }
    }
}

/// Project a rewritten path to a single value, taking the first
/// reached value (NULL when none).
#[must_use]
pub fn project(pair: &Pair, rewritten: &RewrittenPath, ctx: &EvalContext) -> Value {
    walk_pair(pair, &rewritten.steps, ctx)
        .into_iter()
        .next()
        .unwrap_or(Value::Null)
}

fn walk_pair(pair: &Pair, steps: &[Step], ctx: &EvalContext) -> Vec<Value> {
    let Some((head, rest)) = steps.split_first() else {
        return Vec::new();
    };

    match head {
        Step::Master => match &pair.shared {
            Some(row) => walk_row(row, rest, ctx),
            None => Vec::new(),
        },
        Step::Field(name) => match &pair.translation {
            Some(row) => vec![row.value_or_null(name)],
            None => match &pair.shared {
                Some(row) => vec![row.value_or_null(name)],
                None => Vec::new(),
            },
        },
        Step::Relation(rel) => {
            let source = if rel.on_translation {
                pair.translation.as_ref()
            } else {
                pair.shared.as_ref()
            };
            match source {
                Some(row) => follow_relation(row, rel.local_field, rel.target_path, rest, ctx),
                None => Vec::new(),
            }
        }
        Step::Translations { entity_path } => match &pair.shared {
            Some(row) => walk_translations(row, entity_path, rest, ctx),
            None => Vec::new(),
        },
    }
}

fn walk_row(row: &Row, steps: &[Step], ctx: &EvalContext) -> Vec<Value> {
    let Some((head, rest)) = steps.split_first() else {
        return Vec::new();
    };

    match head {
        Step::Field(name) => vec![row.value_or_null(name)],
        Step::Relation(rel) => follow_relation(row, rel.local_field, rel.target_path, rest, ctx),
        Step::Translations { entity_path } => walk_translations(row, entity_path, rest, ctx),
        // The rewriter only emits Master at the dual root.
        Step::Master => Vec::new(),
    }
}

fn follow_relation(
    row: &Row,
    local_field: &str,
    target_path: &str,
    rest: &[Step],
    ctx: &EvalContext,
) -> Vec<Value> {
    let Some(pk) = row.value_or_null(local_field).as_uint() else {
        return Vec::new();
    };
    match store::get(target_path, pk) {
        Some(target) => walk_row(&target, rest, ctx),
        None => Vec::new(),
    }
}

fn walk_translations(row: &Row, entity_path: &str, rest: &[Step], ctx: &EvalContext) -> Vec<Value> {
    let Some(translation_path) = registry::translation_path(entity_path) else {
        return Vec::new();
    };
    let master = row.value_or_null("id");

    let mut out = Vec::new();
    for (_, translation) in store::rows(translation_path) {
        if !translation.value_or_null(MASTER_FIELD).loosely_equals(&master) {
            continue;
        }
        if let Some(language) = &ctx.language {
            if translation.value_or_null(LANGUAGE_CODE_FIELD)
                != Value::Text(language.as_str().to_string())
            {
                continue;
            }
        }
        out.extend(walk_row(&translation, rest, ctx));
    }

    out
}
