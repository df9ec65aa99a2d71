//! Per-query language mode: the small state machine every translation
//! query carries.

use crate::{
    config::{self, LanguageCode},
    query::QueryError,
};

///
/// LanguageMode
///
/// Unbound queries resolve the process language at iteration time
/// (deferred resolution); `All` lifts the language constraint entirely;
/// `Fallback` layers a priority chain over a bound primary language.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub enum LanguageMode {
    #[default]
    Unbound,
    Single(LanguageCode),
    All,
    Fallback {
        primary: LanguageCode,
        chain: Vec<LanguageCode>,
    },
}

impl LanguageMode {
    /// Bind a single language, validating it against the language table.
    pub fn bind_single(code: impl Into<LanguageCode>) -> Result<Self, QueryError> {
        let code = code.into();
        if code.as_str() == "all" {
            return Ok(Self::All);
        }
        config::current()
            .check(code.as_str())
            .map_err(|err| QueryError::validation(err.to_string()))?;

        Ok(Self::Single(code))
    }

    /// Attach a fallback chain. Must follow a bound single language;
    /// an empty chain takes the configured default.
    pub fn bind_fallbacks(self, chain: &[&str]) -> Result<Self, QueryError> {
        let Self::Single(primary) = self else {
            return Err(QueryError::validation(
                "fallbacks() requires a single bound language; call language(code) first",
            ));
        };

        let config = config::current();
        let codes: Vec<String> = if chain.is_empty() {
            config.fallback_languages.clone()
        } else {
            chain.iter().map(ToString::to_string).collect()
        };
        for code in &codes {
            config
                .check(code)
                .map_err(|err| QueryError::validation(err.to_string()))?;
        }

        Ok(Self::Fallback {
            primary,
            chain: codes.into_iter().map(LanguageCode::new).collect(),
        })
    }

    /// The single language in effect at iteration time, when one exists.
    /// Unbound resolves the process language; `All` has none.
    #[must_use]
    pub fn effective_single(&self) -> Option<LanguageCode> {
        match self {
            Self::Unbound => Some(config::process_language()),
            Self::Single(code) => Some(code.clone()),
            Self::Fallback { primary, .. } => Some(primary.clone()),
            Self::All => None,
        }
    }

    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_resolves_process_language_at_iteration() {
        config::reset();
        config::set_process_language("ja");
        let mode = LanguageMode::Unbound;
        assert_eq!(mode.effective_single(), Some(LanguageCode::new("ja")));
        config::reset();
    }

    #[test]
    fn all_token_lifts_constraint() {
        config::reset();
        let mode = LanguageMode::bind_single("all").unwrap();
        assert!(mode.is_all());
        assert_eq!(mode.effective_single(), None);
    }

    #[test]
    fn unknown_language_rejected() {
        config::reset();
        assert!(matches!(
            LanguageMode::bind_single("xx"),
            Err(QueryError::Validation { .. })
        ));
    }

    #[test]
    fn fallbacks_require_bound_single() {
        config::reset();
        let err = LanguageMode::All.bind_fallbacks(&["en"]).unwrap_err();
        assert!(matches!(err, QueryError::Validation { .. }));

        let mode = LanguageMode::bind_single("en")
            .unwrap()
            .bind_fallbacks(&["ja"])
            .unwrap();
        assert!(mode.is_fallback());
        assert_eq!(mode.effective_single(), Some(LanguageCode::new("en")));
    }
}
