//! Model metadata.
//!
//! Runtime description of a translatable entity: the shared model, the
//! translation model and the accessor under which translations are nested.
//! Serializers build their field lists and routing tables from it once.

use crate::error::ConfigurationError;
use crate::field::ValueKind;

/// Name of the identity field on both models.
pub const ID_FIELD: &str = "id";

/// Back-reference from a translation to its entity.
pub const MASTER_FIELD: &str = "master";

/// Language code field of the translation model.
pub const LANGUAGE_CODE_FIELD: &str = "language_code";

/// Default accessor for nested translations.
pub const DEFAULT_TRANSLATIONS_ACCESSOR: &str = "translations";

/// How a field relates to other models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Plain value column
    None,
    OneToOne,
    /// Foreign key; `concrete` is false for generic relations
    ManyToOne { concrete: bool },
    ManyToMany,
    OneToMany,
}

impl Relation {
    pub fn is_relation(&self) -> bool {
        !matches!(self, Relation::None)
    }
}

/// One field of a model.
///
/// Contains the field's value kind, its relation to other models and the
/// flags serializers derive field declarations from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelField {
    pub name: String,
    pub relation: Relation,
    pub value: ValueKind,
    /// Must be provided on create
    pub required: bool,
    pub nullable: bool,
    pub primary_key: bool,
    /// Included in default field lists
    pub serialize: bool,
}

impl ModelField {
    /// A required, non-null, serialized value field.
    pub fn new(name: impl Into<String>, value: ValueKind) -> Self {
        Self {
            name: name.into(),
            relation: Relation::None,
            value,
            required: true,
            nullable: false,
            primary_key: false,
            serialize: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self.required = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.required = false;
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relation = relation;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.serialize = false;
        self
    }

    /// Whether the translation-only update path may write this field:
    /// plain values, one-to-one, or foreign keys to a concrete model.
    pub fn is_writable_translation_field(&self) -> bool {
        match self.relation {
            Relation::None | Relation::OneToOne => true,
            Relation::ManyToOne { concrete } => concrete,
            Relation::ManyToMany | Relation::OneToMany => false,
        }
    }
}

/// Ordered field list of one model.
///
/// Every model starts with an `id` primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    name: String,
    fields: Vec<ModelField>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![ModelField::new(ID_FIELD, ValueKind::Integer).primary_key()],
        }
    }

    /// Schema of a translation model: `id`, `master` and `language_code` are
    /// declared up front.
    pub fn translations_for(name: impl Into<String>) -> Self {
        Self::new(name)
            .field(
                ModelField::new(MASTER_FIELD, ValueKind::Integer)
                    .relation(Relation::ManyToOne { concrete: true })
                    .hidden(),
            )
            .field(ModelField::new(
                LANGUAGE_CODE_FIELD,
                ValueKind::Text {
                    max_length: Some(15),
                },
            ))
    }

    /// Add a field, replacing any field with the same name.
    ///
    /// # Arguments
    /// * `field` - The field to declare
    pub fn field(mut self, field: ModelField) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[ModelField] {
        &self.fields
    }

    pub fn get_field(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }
}

/// A shared model paired with its translation model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatableModel {
    shared: ModelSchema,
    translations: ModelSchema,
    accessor: String,
}

impl TranslatableModel {
    /// Pair a shared model with its translation model.
    ///
    /// # Arguments
    /// * `shared` - The language-independent model
    /// * `translations` - The per-language model, declaring `master` and `language_code`
    ///
    /// # Returns
    /// * `Ok(TranslatableModel)` with the default `translations` accessor
    /// * `Err(ConfigurationError)` if a required translation field is missing
    ///   or a field other than `id` exists on both models
    pub fn new(shared: ModelSchema, translations: ModelSchema) -> Result<Self, ConfigurationError> {
        for required in [MASTER_FIELD, LANGUAGE_CODE_FIELD] {
            if !translations.has_field(required) {
                return Err(ConfigurationError::MissingTranslationField {
                    model: translations.name().to_string(),
                    field: required.to_string(),
                });
            }
        }

        if let Some(field) = shared
            .fields()
            .iter()
            .find(|f| f.name != ID_FIELD && translations.has_field(&f.name))
        {
            return Err(ConfigurationError::AmbiguousField {
                field: field.name.clone(),
                shared: shared.name().to_string(),
            });
        }

        Ok(Self {
            shared,
            translations,
            accessor: DEFAULT_TRANSLATIONS_ACCESSOR.to_string(),
        })
    }

    /// Use another accessor name for nested translations.
    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = accessor.into();
        self
    }

    pub fn shared(&self) -> &ModelSchema {
        &self.shared
    }

    pub fn translations(&self) -> &ModelSchema {
        &self.translations
    }

    pub fn accessor(&self) -> &str {
        &self.accessor
    }

    /// Names of translated fields the translation-only update path may write.
    pub fn writable_translation_fields(&self) -> impl Iterator<Item = &ModelField> {
        self.translations
            .fields()
            .iter()
            .filter(|f| f.is_writable_translation_field())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text() -> ValueKind {
        ValueKind::Text { max_length: None }
    }

    fn book_model() -> TranslatableModel {
        TranslatableModel::new(
            ModelSchema::new("book").field(ModelField::new("isbn", text())),
            ModelSchema::translations_for("book_translation")
                .field(ModelField::new("title", text())),
        )
        .unwrap()
    }

    #[test]
    fn test_schema_always_has_id() {
        let schema = ModelSchema::new("book");
        let id = schema.get_field("id").unwrap();
        assert!(id.primary_key);
        assert!(!id.required);
    }

    #[test]
    fn test_translations_for_declares_reserved_fields() {
        let schema = ModelSchema::translations_for("t");
        assert!(schema.has_field("id"));
        assert!(schema.has_field("master"));
        assert!(schema.has_field("language_code"));
        assert!(!schema.get_field("master").unwrap().serialize);
    }

    #[test]
    fn test_field_replaces_same_name() {
        let schema = ModelSchema::new("m")
            .field(ModelField::new("a", text()))
            .field(ModelField::new("a", ValueKind::Integer));
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.get_field("a").unwrap().value, ValueKind::Integer);
    }

    #[test]
    fn test_new_requires_language_code() {
        let result = TranslatableModel::new(ModelSchema::new("a"), ModelSchema::new("a_t"));
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingTranslationField { .. })
        ));
    }

    #[test]
    fn test_new_rejects_ambiguous_fields() {
        let result = TranslatableModel::new(
            ModelSchema::new("a").field(ModelField::new("title", text())),
            ModelSchema::translations_for("a_t").field(ModelField::new("title", text())),
        );
        assert!(matches!(result, Err(ConfigurationError::AmbiguousField { .. })));
    }

    #[test]
    fn test_default_accessor() {
        let model = book_model();
        assert_eq!(model.accessor(), "translations");
        assert_eq!(model.with_accessor("i18n").accessor(), "i18n");
    }

    #[test]
    fn test_writable_translation_fields() {
        let model = TranslatableModel::new(
            ModelSchema::new("a"),
            ModelSchema::translations_for("a_t")
                .field(ModelField::new("title", text()))
                .field(
                    ModelField::new("tags", ValueKind::Json).relation(Relation::ManyToMany),
                )
                .field(
                    ModelField::new("target", ValueKind::Integer)
                        .relation(Relation::ManyToOne { concrete: false }),
                )
                .field(
                    ModelField::new("cover", ValueKind::Integer).relation(Relation::OneToOne),
                ),
        )
        .unwrap();

        let names: Vec<&str> = model
            .writable_translation_fields()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "master", "language_code", "title", "cover"]);
    }
}
