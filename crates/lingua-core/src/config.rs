//! Process-wide configuration: the language table, fallback chain,
//! table-name separator, and autoload policy.
//!
//! The configuration is a value-typed snapshot installed explicitly; the
//! engine re-reads it on every access, so there is no hidden mutable state
//! beyond the thread-local slot itself.

use crate::value::Value;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use thiserror::Error as ThisError;

///
/// LanguageCode
///
/// Short string tag identifying a language (e.g. `en`, `ja`).
///

#[derive(
    Clone, Debug, Default, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
pub struct LanguageCode(String);

impl LanguageCode {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Text(self.0.clone())
    }
}

impl From<&str> for LanguageCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<String> for LanguageCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("language code '{code}' is not declared in the configured language table")]
    UnknownLanguage { code: String },

    #[error("the configured language table is empty")]
    EmptyLanguageTable,
}

///
/// LinguaConfig
///
/// Recognized process-wide options. Installed as a whole; partial
/// mutation goes through `install` with a fresh snapshot.
///

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinguaConfig {
    /// Ordered (code, display) pairs. Defines valid codes and the
    /// deterministic tie-break order used by the fallback resolver.
    pub languages: Vec<(String, String)>,

    /// Default fallback priority list used when a query binds fallbacks
    /// without an explicit chain.
    pub fallback_languages: Vec<String>,

    /// Separator between shared and translation table names in derived
    /// table naming.
    pub table_name_separator: String,

    /// Whether a translated-attribute read on an instance with no attached
    /// translation triggers a lazy load.
    pub autoload_translations: bool,

    /// Whether `manager::<S>()` surfaces the translation-aware queryset
    /// as the default manager for translatable entities.
    pub use_default_manager: bool,
}

impl Default for LinguaConfig {
    fn default() -> Self {
        Self {
            languages: vec![
                ("en".to_string(), "English".to_string()),
                ("ja".to_string(), "Japanese".to_string()),
            ],
            fallback_languages: Vec::new(),
            table_name_separator: "_".to_string(),
            autoload_translations: true,
            use_default_manager: true,
        }
    }
}

impl LinguaConfig {
    /// Whether `code` appears in the configured language table.
    #[must_use]
    pub fn knows(&self, code: &str) -> bool {
        self.languages.iter().any(|(c, _)| c == code)
    }

    /// Require `code` to be a declared language.
    pub fn check(&self, code: &str) -> Result<(), ConfigError> {
        if self.knows(code) {
            Ok(())
        } else {
            Err(ConfigError::UnknownLanguage {
                code: code.to_string(),
            })
        }
    }

    /// Position of `code` in the language table, used as the fallback
    /// resolver's deterministic tie-break.
    #[must_use]
    pub fn language_rank(&self, code: &str) -> usize {
        self.languages
            .iter()
            .position(|(c, _)| c == code)
            .unwrap_or(usize::MAX)
    }

    /// First declared language, the initial process language.
    pub fn first_language(&self) -> Result<LanguageCode, ConfigError> {
        self.languages
            .first()
            .map(|(c, _)| LanguageCode::new(c.clone()))
            .ok_or(ConfigError::EmptyLanguageTable)
    }
}

thread_local! {
    static CONFIG: RefCell<LinguaConfig> = RefCell::new(LinguaConfig::default());
    static PROCESS_LANGUAGE: RefCell<LanguageCode> = RefCell::new(LanguageCode::new("en"));
}

/// Install a fresh configuration snapshot.
pub fn install(config: LinguaConfig) {
    CONFIG.with(|slot| *slot.borrow_mut() = config);
}

/// Clone the current configuration snapshot.
#[must_use]
pub fn current() -> LinguaConfig {
    CONFIG.with(|slot| slot.borrow().clone())
}

/// Reset configuration and process language to defaults.
pub fn reset() {
    install(LinguaConfig::default());
    PROCESS_LANGUAGE.with(|slot| *slot.borrow_mut() = LanguageCode::new("en"));
}

/// Set the process language used by deferred-resolution queries and
/// autoloading reads.
pub fn set_process_language(code: impl Into<LanguageCode>) {
    PROCESS_LANGUAGE.with(|slot| *slot.borrow_mut() = code.into());
}

/// The process language at this moment.
#[must_use]
pub fn process_language() -> LanguageCode {
    PROCESS_LANGUAGE.with(|slot| slot.borrow().clone())
}
