//! Operation context: the language state of one serialize/deserialize call.
//!
//! There is no process-wide "current language". Each operation owns an
//! `OperationContext` and threads it through every codec it calls. Codecs that
//! temporarily switch the ambient language (for example while walking every
//! translation of an entity) use [`OperationContext::scoped`], which puts the
//! previous language back when the closure returns, error or not.
//!
//! A context must not be shared between concurrent operations.

use crate::i18n::{LanguageCode, LanguageRegistry};
use std::collections::HashMap;

/// Request-scoped language state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Language assumed when no override is given
    ambient: LanguageCode,

    /// Explicit language requested by the caller
    language_override: Option<LanguageCode>,

    /// A single fixed language is mandated; payloads may not name another one
    enforce: bool,

    /// Write operations only touch the fields that were sent
    partial: bool,
}

impl OperationContext {
    /// Create a context that follows the given ambient language.
    pub fn new(ambient: LanguageCode) -> Self {
        Self {
            ambient,
            language_override: None,
            enforce: false,
            partial: false,
        }
    }

    /// Create a context using the registry's default language as ambient language.
    pub fn from_registry(registry: &LanguageRegistry) -> Self {
        Self::new(registry.default_language().clone())
    }

    /// Create a context in enforce mode.
    ///
    /// `None` enforces whatever the ambient language is when the operation
    /// resolves its translation.
    pub fn enforcing(ambient: LanguageCode, language: Option<LanguageCode>) -> Self {
        Self {
            ambient,
            language_override: language,
            enforce: true,
            partial: false,
        }
    }

    /// Create an enforcing context from request query parameters.
    ///
    /// The value of `key` selects the language. A missing, empty or malformed
    /// value enforces the ambient language.
    pub fn for_request(query: &HashMap<String, String>, key: &str, ambient: LanguageCode) -> Self {
        let language = query
            .get(key)
            .and_then(|raw| LanguageCode::parse(raw).ok());
        Self::enforcing(ambient, language)
    }

    /// Mark the context as a partial write.
    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Get the ambient (current) language.
    pub fn current_language(&self) -> &LanguageCode {
        &self.ambient
    }

    /// Get the explicit language override, if any.
    pub fn language_override(&self) -> Option<&LanguageCode> {
        self.language_override.as_ref()
    }

    /// Whether the operation runs in enforce mode.
    pub fn is_enforced(&self) -> bool {
        self.enforce
    }

    /// Whether the operation is a partial write.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// The language a single-language operation must use: the override if
    /// given, otherwise the ambient language.
    pub fn effective_language(&self) -> &LanguageCode {
        self.language_override.as_ref().unwrap_or(&self.ambient)
    }

    /// Switch the ambient language, returning the previous one.
    pub fn activate(&mut self, language: LanguageCode) -> LanguageCode {
        std::mem::replace(&mut self.ambient, language)
    }

    /// Run `f` with the ambient language switched to `language`.
    ///
    /// The previous ambient language is restored before returning.
    pub fn scoped<R>(&mut self, language: LanguageCode, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.activate(language);
        let result = f(self);
        self.ambient = previous;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> LanguageCode {
        LanguageCode::parse(raw).unwrap()
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_new_is_not_enforced() {
        let ctx = OperationContext::new(code("en"));
        assert!(!ctx.is_enforced());
        assert!(!ctx.is_partial());
        assert_eq!(ctx.effective_language(), &code("en"));
    }

    #[test]
    fn test_enforcing_with_language() {
        let ctx = OperationContext::enforcing(code("en"), Some(code("ja")));
        assert!(ctx.is_enforced());
        assert_eq!(ctx.effective_language(), &code("ja"));
        assert_eq!(ctx.current_language(), &code("en"));
    }

    #[test]
    fn test_enforcing_without_language_uses_ambient() {
        let ctx = OperationContext::enforcing(code("fr"), None);
        assert!(ctx.is_enforced());
        assert_eq!(ctx.effective_language(), &code("fr"));
    }

    #[test]
    fn test_from_registry() {
        let registry = LanguageRegistry::from_codes("ja", ["en"]).unwrap();
        let ctx = OperationContext::from_registry(&registry);
        assert_eq!(ctx.current_language(), &code("ja"));
    }

    // ==================== for_request Tests ====================

    #[test]
    fn test_for_request_reads_query_key() {
        let mut query = HashMap::new();
        query.insert("language".to_string(), "ja".to_string());
        let ctx = OperationContext::for_request(&query, "language", code("en"));
        assert!(ctx.is_enforced());
        assert_eq!(ctx.effective_language(), &code("ja"));
    }

    #[test]
    fn test_for_request_missing_key_enforces_ambient() {
        let query = HashMap::new();
        let ctx = OperationContext::for_request(&query, "language", code("en"));
        assert!(ctx.is_enforced());
        assert_eq!(ctx.language_override(), None);
        assert_eq!(ctx.effective_language(), &code("en"));
    }

    #[test]
    fn test_for_request_empty_value_enforces_ambient() {
        let mut query = HashMap::new();
        query.insert("language".to_string(), String::new());
        let ctx = OperationContext::for_request(&query, "language", code("en"));
        assert_eq!(ctx.effective_language(), &code("en"));
    }

    // ==================== Ambient Switching Tests ====================

    #[test]
    fn test_activate_returns_previous() {
        let mut ctx = OperationContext::new(code("en"));
        let previous = ctx.activate(code("ja"));
        assert_eq!(previous, code("en"));
        assert_eq!(ctx.current_language(), &code("ja"));
    }

    #[test]
    fn test_scoped_restores_language() {
        let mut ctx = OperationContext::new(code("en"));
        let seen = ctx.scoped(code("ja"), |ctx| ctx.current_language().clone());
        assert_eq!(seen, code("ja"));
        assert_eq!(ctx.current_language(), &code("en"));
    }

    #[test]
    fn test_scoped_restores_language_on_error() {
        let mut ctx = OperationContext::new(code("en"));
        let result: Result<(), String> = ctx.scoped(code("fr"), |_| Err("boom".to_string()));
        assert!(result.is_err());
        assert_eq!(ctx.current_language(), &code("en"));
    }

    #[test]
    fn test_scoped_nests() {
        let mut ctx = OperationContext::new(code("en"));
        ctx.scoped(code("ja"), |ctx| {
            ctx.scoped(code("fr"), |ctx| {
                assert_eq!(ctx.current_language(), &code("fr"));
            });
            assert_eq!(ctx.current_language(), &code("ja"));
        });
        assert_eq!(ctx.current_language(), &code("en"));
    }

    #[test]
    fn test_with_partial() {
        let ctx = OperationContext::new(code("en")).with_partial(true);
        assert!(ctx.is_partial());
    }
}
