//! Internationalization (i18n) module for translation-aware serialization.
//!
//! All language-related state is contained here.
//!
//! # Architecture
//!
//! - `language`: validated, normalized `LanguageCode`
//! - `registry`: the set of supported languages and the default one
//! - `context`: per-operation language state (ambient language, override, enforce mode)
//! - `metrics`: translation resolution counters
//!
//! # Example
//!
//! ```rust
//! use translatable_serializer::i18n::{LanguageRegistry, OperationContext};
//!
//! let registry = LanguageRegistry::from_codes("en", ["en", "ja"]).unwrap();
//! let mut ctx = OperationContext::from_registry(&registry);
//!
//! let inner = ctx.scoped("ja".parse().unwrap(), |ctx| ctx.current_language().to_string());
//! assert_eq!(inner, "ja");
//! assert_eq!(ctx.current_language().as_str(), "en");
//! ```

mod context;
mod language;
mod metrics;
mod registry;

pub use context::OperationContext;
pub use language::{LanguageCode, LanguageCodeError};
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::LanguageRegistry;
