//! Template applier
//!
//! Populates field values by shallow merge and attaches advisory validation
//! feedback. Pure over its inputs; resolution (NotFound / Inactive) happens
//! in the service before this runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::definition::TemplateDefinition;
use crate::validation::{validate, ValidationResult};

/// Result of applying a template: populated values plus advisory validation
/// feedback. Validation never blocks; the caller decides whether to proceed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedTemplate {
    pub template_id: Uuid,
    pub template_name: String,
    pub populated_fields: Map<String, Value>,
    /// Present only when validation found errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<ValidationResult>,
}

/// Merge values lowest to highest precedence: per-field `FieldSpec.default`
/// (top-level fields only), then `template.default_values`, then
/// `custom_values`. The merge is shallow: nested object/array values are
/// replaced wholesale, never merged key by key.
pub fn populate_fields(
    template: &TemplateDefinition,
    custom_values: &Map<String, Value>,
) -> Map<String, Value> {
    let mut populated = Map::new();
    for (name, spec) in &template.fields {
        if let Some(default) = spec.default.as_ref() {
            populated.insert(name.clone(), default.clone());
        }
    }
    for (name, value) in &template.default_values {
        populated.insert(name.clone(), value.clone());
    }
    for (name, value) in custom_values {
        populated.insert(name.clone(), value.clone());
    }
    populated
}

/// Apply a template to caller-supplied values. Deterministic: identical
/// inputs yield identical `populated_fields`.
pub fn apply(template: &TemplateDefinition, custom_values: &Map<String, Value>) -> AppliedTemplate {
    let populated = populate_fields(template, custom_values);
    let result = validate(template, &Value::Object(populated.clone()));
    AppliedTemplate {
        template_id: template.id,
        template_name: template.name.clone(),
        populated_fields: populated,
        validation_errors: if result.is_valid { None } else { Some(result) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{FieldSpec, FieldType, TemplateType};
    use chrono::Utc;
    use indexmap::IndexMap;
    use serde_json::json;

    fn template() -> TemplateDefinition {
        let actor = Uuid::new_v4();
        let mut fields = IndexMap::new();
        let mut status = FieldSpec::new(FieldType::Text);
        status.default = Some(json!("unset"));
        fields.insert("status".to_string(), status);
        let mut severity = FieldSpec::new(FieldType::Text);
        severity.default = Some(json!("routine"));
        fields.insert("severity".to_string(), severity);
        fields.insert("vitals".to_string(), FieldSpec::new(FieldType::Object));

        let mut default_values = Map::new();
        default_values.insert("status".to_string(), json!("draft"));
        default_values.insert("vitals".to_string(), json!({"bp": "120/80", "hr": 70}));

        TemplateDefinition {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            parent_template_id: None,
            name: "consult".to_string(),
            description: None,
            template_type: TemplateType::Consultation,
            specialty: None,
            fields,
            default_values,
            validation_rules: Default::default(),
            is_default: false,
            is_active: true,
            version: 1,
            created_by: actor,
            updated_by: actor,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn custom_values_override_defaults() {
        let applied = apply(&template(), &map(json!({"status": "final"})));
        assert_eq!(applied.populated_fields["status"], json!("final"));
    }

    #[test]
    fn field_defaults_sit_below_template_defaults() {
        let applied = apply(&template(), &Map::new());
        // default_values wins over the per-field default for status.
        assert_eq!(applied.populated_fields["status"], json!("draft"));
        // severity only has the per-field default.
        assert_eq!(applied.populated_fields["severity"], json!("routine"));
    }

    #[test]
    fn nested_values_replace_wholesale() {
        let applied = apply(&template(), &map(json!({"vitals": {"bp": "140/90"}})));
        // Shallow merge: hr from the default is gone, not merged in.
        assert_eq!(applied.populated_fields["vitals"], json!({"bp": "140/90"}));
    }

    #[test]
    fn apply_is_idempotent() {
        let t = template();
        let custom = map(json!({"status": "final", "severity": "urgent"}));
        let first = apply(&t, &custom);
        let second = apply(&t, &custom);
        assert_eq!(first.populated_fields, second.populated_fields);
    }

    #[test]
    fn validation_feedback_is_attached_but_never_blocks() {
        let mut t = template();
        t.fields.get_mut("status").unwrap().required = true;
        let custom = map(json!({"status": ""}));
        let applied = apply(&t, &custom);
        // The empty string counts as absent, so validation flags it, yet the
        // populated data still comes back.
        assert!(applied.validation_errors.is_some());
        assert_eq!(applied.populated_fields["status"], json!(""));
    }
}
