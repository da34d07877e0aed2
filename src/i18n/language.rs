//! Language codes: validated, normalized language tokens.
//!
//! This module provides the `LanguageCode` type used as the key of every
//! translation record. Codes are validated once at the boundary and are
//! normalized to lowercase with `-` as the subtag separator (`pt_BR` becomes
//! `pt-br`), so two spellings of the same language never produce two
//! translation rows.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors produced when parsing a language code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageCodeError {
    #[error("Language code must not be empty")]
    Empty,

    #[error("Invalid language code: '{0}'")]
    Invalid(String),
}

// Primary subtag of 2-3 letters, then optional region/script/variant subtags
static CODE_REGEX: OnceLock<Regex> = OnceLock::new();

/// A validated language code (e.g. "en", "ja", "zh-hans").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Parse and normalize a language code.
    ///
    /// # Returns
    /// * `Ok(LanguageCode)` if the code is well formed
    /// * `Err(LanguageCodeError)` if it is empty or malformed
    ///
    /// # Example
    /// ```
    /// use translatable_serializer::i18n::LanguageCode;
    ///
    /// let code = LanguageCode::parse("pt_BR").unwrap();
    /// assert_eq!(code.as_str(), "pt-br");
    /// ```
    pub fn parse(code: &str) -> Result<Self, LanguageCodeError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(LanguageCodeError::Empty);
        }

        let regex = CODE_REGEX
            .get_or_init(|| Regex::new(r"^[A-Za-z]{2,3}(?:[-_][A-Za-z0-9]{1,8})*$").unwrap());
        if !regex.is_match(trimmed) {
            return Err(LanguageCodeError::Invalid(trimmed.to_string()));
        }

        Ok(Self(trimmed.to_ascii_lowercase().replace('_', "-")))
    }

    /// English, the fallback default language.
    pub(crate) fn english() -> Self {
        Self("en".to_string())
    }

    /// Get the normalized code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LanguageCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for LanguageCode {
    type Err = LanguageCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = LanguageCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

impl PartialEq<str> for LanguageCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LanguageCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== parse Tests ====================

    #[test]
    fn test_parse_simple_code() {
        let code = LanguageCode::parse("en").expect("Should parse");
        assert_eq!(code.as_str(), "en");
    }

    #[test]
    fn test_parse_normalizes_case_and_separator() {
        let code = LanguageCode::parse("pt_BR").expect("Should parse");
        assert_eq!(code.as_str(), "pt-br");
        assert_eq!(code, LanguageCode::parse("pt-br").unwrap());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let code = LanguageCode::parse("  ja ").expect("Should parse");
        assert_eq!(code, "ja");
    }

    #[test]
    fn test_parse_script_subtag() {
        let code = LanguageCode::parse("zh-Hans").expect("Should parse");
        assert_eq!(code.as_str(), "zh-hans");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(LanguageCode::parse(""), Err(LanguageCodeError::Empty));
        assert_eq!(LanguageCode::parse("   "), Err(LanguageCodeError::Empty));
    }

    #[test]
    fn test_parse_invalid() {
        let result = LanguageCode::parse("english!");
        assert!(matches!(result, Err(LanguageCodeError::Invalid(_))));
        assert!(LanguageCode::parse("e").is_err());
        assert!(LanguageCode::parse("12").is_err());
    }

    // ==================== Trait Tests ====================

    #[test]
    fn test_display() {
        let code = LanguageCode::parse("fr").unwrap();
        assert_eq!(format!("{}", code), "fr");
    }

    #[test]
    fn test_from_str() {
        let code: LanguageCode = "es".parse().expect("Should parse");
        assert_eq!(code.as_str(), "es");
    }

    #[test]
    fn test_serde_round_trip() {
        let code = LanguageCode::parse("ja").unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"ja\"");
        let back: LanguageCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let result: Result<LanguageCode, _> = serde_json::from_str("\"not a code\"");
        assert!(result.is_err());
    }
}
