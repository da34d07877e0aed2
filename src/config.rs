use crate::i18n::{LanguageCode, LanguageRegistry};
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Languages
    pub default_language: LanguageCode,
    pub languages: Vec<LanguageCode>,

    // Request handling
    pub language_query_key: String,

    // Storage
    pub database_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let default_language =
            std::env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "en".to_string());
        let languages = std::env::var("LANGUAGES").unwrap_or_else(|_| "en,ja,fr,es".to_string());

        Ok(Self {
            // Languages
            default_language: LanguageCode::parse(&default_language)
                .with_context(|| format!("DEFAULT_LANGUAGE is invalid: '{}'", default_language))?,
            languages: parse_languages(&languages).context("LANGUAGES is invalid")?,

            // Request handling - ?language=ja selects an enforced language
            language_query_key: std::env::var("LANGUAGE_QUERY_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty())
                .unwrap_or_else(|| "language".to_string()),

            // Storage
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "translations.db".to_string()),
        })
    }

    /// Registry of the configured languages, default language first.
    pub fn registry(&self) -> LanguageRegistry {
        LanguageRegistry::new(self.default_language.clone(), self.languages.iter().cloned())
    }
}

/// Parse a comma separated language list, skipping empty entries.
fn parse_languages(raw: &str) -> Result<Vec<LanguageCode>> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| {
            LanguageCode::parse(code).with_context(|| format!("invalid language code '{}'", code))
        })
        .collect()
}
