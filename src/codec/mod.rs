//! Codecs turning entities into JSON representations and back.
//!
//! - `single`: flat, one language at a time (shared and translated fields side by side)
//! - `nested`: one translation as an object of translated fields
//! - `list`: every translation of an entity, keyed by language code

mod list;
mod nested;
mod single;

pub use list::{TranslationListCodec, TranslationPayload, TranslationSet};
pub use nested::NestedTranslationCodec;
pub use single::{LanguageSelection, SingleLanguageCodec, ValidatedData};
