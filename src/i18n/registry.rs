//! Language registry: the set of languages translations may be written in.
//!
//! The registry is built from configuration and handed to serializers, which
//! use it to validate `language_code` values and the keys of multi-language
//! payloads. It always contains its default language.

use crate::i18n::{LanguageCode, LanguageCodeError};

/// Registry of supported languages with one default (ambient fallback) language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRegistry {
    languages: Vec<LanguageCode>,
    default: LanguageCode,
}

impl LanguageRegistry {
    /// Create a registry from a default language and a list of supported ones.
    ///
    /// Duplicates are dropped; the default language is added first if missing.
    pub fn new(default: LanguageCode, languages: impl IntoIterator<Item = LanguageCode>) -> Self {
        let mut list = vec![default.clone()];
        for language in languages {
            if !list.contains(&language) {
                list.push(language);
            }
        }
        Self {
            languages: list,
            default,
        }
    }

    /// Build a registry from raw codes, e.g. `("en", ["en", "ja"])`.
    pub fn from_codes<'a>(
        default: &str,
        codes: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, LanguageCodeError> {
        let default = LanguageCode::parse(default)?;
        let languages = codes
            .into_iter()
            .map(LanguageCode::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(default, languages))
    }

    /// Get the default language.
    pub fn default_language(&self) -> &LanguageCode {
        &self.default
    }

    /// Look up a supported language by its raw code.
    ///
    /// # Returns
    /// * `Some(&LanguageCode)` if the code parses and is supported
    /// * `None` otherwise
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageCode> {
        let code = LanguageCode::parse(code).ok()?;
        self.languages.iter().find(|language| **language == code)
    }

    /// Check whether a language is supported.
    pub fn is_supported(&self, code: &LanguageCode) -> bool {
        self.languages.contains(code)
    }

    /// List all supported languages, default first.
    pub fn list(&self) -> &[LanguageCode] {
        &self.languages
    }
}

impl Default for LanguageRegistry {
    /// English-only registry.
    fn default() -> Self {
        Self {
            languages: vec![LanguageCode::english()],
            default: LanguageCode::english(),
        }
    }
}
