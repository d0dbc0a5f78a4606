//! Seed bundles
//!
//! YAML-declared sets of standard templates installed per tenant at
//! bootstrap. Installation is idempotent: a seed whose name already exists
//! for the tenant is skipped.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::definition::{CreateTemplate, FieldSpec, FieldValidation, TemplateType};

/// A named set of seed templates.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedBundle {
    pub name: String,
    pub templates: Vec<SeedTemplate>,
}

/// One template declaration within a bundle.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub template_type: TemplateType,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,
    #[serde(default)]
    pub default_values: Map<String, Value>,
    #[serde(default)]
    pub validation_rules: HashMap<String, FieldValidation>,
    #[serde(default)]
    pub is_default: bool,
}

impl SeedTemplate {
    pub fn into_create(self) -> CreateTemplate {
        CreateTemplate {
            name: self.name,
            description: self.description,
            template_type: self.template_type,
            specialty: self.specialty,
            fields: self.fields,
            default_values: self.default_values,
            validation_rules: self.validation_rules,
            is_default: self.is_default,
            version: None,
        }
    }
}

impl SeedBundle {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// The bundle shipped with the crate: a general consultation note and a
    /// discharge summary.
    pub fn builtin() -> Self {
        Self::from_yaml(include_str!("seeds/builtin.yaml"))
            .expect("builtin seed bundle is valid YAML")
    }
}

/// Counts returned by `bootstrap_seed_bundle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    pub created: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FieldType;

    #[test]
    fn builtin_bundle_parses() {
        let bundle = SeedBundle::builtin();
        assert_eq!(bundle.templates.len(), 2);
        let consult = &bundle.templates[0];
        assert_eq!(consult.template_type, TemplateType::Consultation);
        assert!(consult.fields.contains_key("chief_complaint"));
        assert_eq!(
            consult.fields["chief_complaint"].field_type,
            FieldType::Text
        );
    }

    #[test]
    fn bundle_yaml_supports_conditionals_and_validation() {
        let bundle = SeedBundle::from_yaml(
            r#"
name: test
templates:
  - name: Minimal
    template_type: emergency
    fields:
      triage_level:
        type: select
        required: true
        options: [red, yellow, green]
      escalation_reason:
        type: textarea
        conditional:
          required_if:
            field: triage_level
            operator: equals
            value: red
"#,
        )
        .unwrap();
        let t = &bundle.templates[0];
        let cond = t.fields["escalation_reason"]
            .conditional
            .as_ref()
            .unwrap()
            .required_if
            .as_ref()
            .unwrap();
        assert_eq!(cond.field, "triage_level");
    }
}
