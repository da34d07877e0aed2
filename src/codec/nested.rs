use crate::error::{invalid_data_message, ErrorDetail};
use crate::field::{validate_fields, FieldSpec, Lookup};
use crate::model::{TranslatableModel, LANGUAGE_CODE_FIELD};
use crate::record::{Entity, Fields, Translation};
use crate::router::{lookup_on_entity, VETO_FIELDS};
use serde_json::Value;

/// Codec for one translation rendered as a flat object of translated fields.
///
/// The language is not part of the object: the enclosing multi-language map
/// keys each object by its language.
#[derive(Debug, Clone)]
pub struct NestedTranslationCodec {
    fields: Vec<FieldSpec>,
}

impl NestedTranslationCodec {
    /// Fields of the translation model, minus the vetoed ones,
    /// `language_code` and anything in `exclude`.
    pub fn new(model: &TranslatableModel, exclude: &[String]) -> Self {
        let fields = model
            .translations()
            .fields()
            .iter()
            .filter(|field| field.serialize)
            .filter(|field| {
                let name = field.name.as_str();
                !VETO_FIELDS.contains(&name)
                    && name != LANGUAGE_CODE_FIELD
                    && !exclude.iter().any(|excluded| excluded == name)
            })
            .map(FieldSpec::from_model_field)
            .collect();
        Self { fields }
    }

    pub fn with_fields(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Render the entity's active translation.
    ///
    /// Each field is read from the entity first and from the cached
    /// translation second. Write-only fields are left out; declared fields
    /// that neither record holds render as `null`.
    pub fn to_representation(&self, entity: &Entity) -> Fields {
        let mut out = Fields::new();
        for field in &self.fields {
            match lookup_on_entity(field, entity) {
                Lookup::Skip => continue,
                Lookup::Found(value) => {
                    out.insert(field.name.clone(), field.to_representation(&value));
                }
                Lookup::NotFound => {
                    out.insert(field.name.clone(), Value::Null);
                }
            }
        }
        out
    }

    /// Validate one language's payload.
    ///
    /// `existing` is the stored translation for that language, if any.
    /// Missing required fields are only reported when the payload creates a
    /// translation or the write is not partial.
    pub fn run_validation(
        &self,
        raw: &Value,
        existing: Option<&Translation>,
        partial: bool,
    ) -> Result<Fields, ErrorDetail> {
        let Value::Object(data) = raw else {
            return Err(ErrorDetail::non_field(invalid_data_message(raw)));
        };

        let require_missing = !partial || existing.is_none();
        validate_fields(&self.fields, data, require_missing).map_err(ErrorDetail::Nested)
    }
}
