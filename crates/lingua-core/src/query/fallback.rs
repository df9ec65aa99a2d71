//! Fallback resolution post-pass.
//!
//! Under a fallback language mode the primary language may be missing
//! for any given master. After filtering, surviving translation rows
//! are grouped per master and exactly one survives: the one whose
//! language ranks best in the priority order. Masters with no
//! translation at all drop out of the result set.

use crate::config::{self, LanguageCode};

/// Full priority order: the primary language, then the explicit chain,
/// then every remaining configured language in table order.
#[must_use]
pub fn language_order(primary: &LanguageCode, chain: &[LanguageCode]) -> Vec<String> {
    let mut order: Vec<String> = vec![primary.as_str().to_string()];
    for code in chain {
        if !order.iter().any(|c| c == code.as_str()) {
            order.push(code.as_str().to_string());
        }
    }
    for (code, _) in config::current().languages {
        if !order.iter().any(|c| *c == code) {
            order.push(code);
        }
    }

    order
}

/// Position of a language in the priority order. Languages outside the
/// order sort last.
#[must_use]
pub fn rank(order: &[String], code: &str) -> usize {
    order.iter().position(|c| c == code).unwrap_or(usize::MAX)
}

/// Pick the best candidate for one master. Ties (and languages outside
/// the order) break lexicographically, so resolution is deterministic
/// regardless of row iteration order.
pub fn pick<T>(
    order: &[String],
    candidates: Vec<(LanguageCode, T)>,
) -> Option<(LanguageCode, T)> {
    candidates.into_iter().min_by(|a, b| {
        rank(order, a.0.as_str())
            .cmp(&rank(order, b.0.as_str()))
            .then_with(|| a.0.as_str().cmp(b.0.as_str()))
    })
}
