//! Validation engine
//!
//! Validates a loosely-typed data object against a template's field schema.
//! Pure: no side effects, no I/O. Validation failures are data, never errors;
//! the applier attaches them as advisory feedback.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::definition::{
    Condition, ConditionOperator, FieldSpec, FieldType, FieldValidation, TemplateDefinition,
};
use crate::value::{as_number, is_absent, loose_contains, loose_eq};

/// Outcome of validating one data object against a template schema.
///
/// Keys are field paths: dotted for nested objects (`vitals.bp`), indexed for
/// array elements (`medications[2]`). A field may accumulate more than one
/// message. `is_valid` is true exactly when `errors` is empty; warnings never
/// affect it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: BTreeMap<String, Vec<String>>,
    pub warnings: BTreeMap<String, Vec<String>>,
}

impl ValidationResult {
    fn error(&mut self, path: &str, message: String) {
        self.errors.entry(path.to_string()).or_default().push(message);
    }

    fn warning(&mut self, path: &str, message: String) {
        self.warnings
            .entry(path.to_string())
            .or_default()
            .push(message);
    }

    fn finish(mut self) -> Self {
        self.is_valid = self.errors.is_empty();
        self
    }
}

/// Validate `data` against the template's field schema.
///
/// Fields are checked in schema (insertion) order. The effective constraints
/// for a top-level field are its inline `FieldSpec.validation` overlaid by the
/// template's supplementary `validation_rules` entry for that field name.
/// Non-object `data` is treated as an empty object, so every required field
/// reports missing.
pub fn validate(template: &TemplateDefinition, data: &Value) -> ValidationResult {
    let empty = Map::new();
    let scope = data.as_object().unwrap_or(&empty);
    let mut result = ValidationResult::default();
    validate_scope(&template.fields, scope, "", Some(template), &mut result);
    result.finish()
}

fn validate_scope(
    fields: &IndexMap<String, FieldSpec>,
    scope: &Map<String, Value>,
    prefix: &str,
    template: Option<&TemplateDefinition>,
    result: &mut ValidationResult,
) {
    for (name, spec) in fields {
        let path = join_path(prefix, name);
        let value = scope.get(name);
        let label = spec.label_or(name);

        if is_absent(value) {
            if spec.required {
                result.error(&path, format!("{} is required", label));
            } else if let Some(cond) = spec
                .conditional
                .as_ref()
                .and_then(|c| c.required_if.as_ref())
            {
                // The condition is evaluated against the referenced field's
                // value in the same scope, not this field's own value.
                if evaluate_condition(cond, scope) {
                    result.error(
                        &path,
                        format!(
                            "{} is required when {} is {}",
                            label,
                            cond.field,
                            display_value(&cond.value)
                        ),
                    );
                }
            }
            continue;
        }

        if let Some(value) = value {
            // Supplementary validation_rules are keyed by top-level field name.
            let effective = effective_validation(spec, name, prefix, template);
            check_typed(spec, &effective, value, &path, label, result);
        }
    }

    // Keys the schema does not declare are advisory warnings.
    for key in scope.keys() {
        if !fields.contains_key(key) {
            let path = join_path(prefix, key);
            result.warning(&path, "field is not defined in the template schema".to_string());
        }
    }
}

fn effective_validation(
    spec: &FieldSpec,
    name: &str,
    prefix: &str,
    template: Option<&TemplateDefinition>,
) -> FieldValidation {
    let inline = spec.validation.clone().unwrap_or_default();
    if !prefix.is_empty() {
        return inline;
    }
    match template.and_then(|t| t.validation_rules.get(name)) {
        Some(rules) => inline.overlaid(rules),
        None => inline,
    }
}

fn check_typed(
    spec: &FieldSpec,
    validation: &FieldValidation,
    value: &Value,
    path: &str,
    label: &str,
    result: &mut ValidationResult,
) {
    match spec.field_type {
        FieldType::Text | FieldType::Textarea => {
            let Some(text) = value.as_str() else {
                result.error(path, format!("{} must be text", label));
                return;
            };
            let len = text.chars().count();
            if let Some(min) = validation.min_length {
                if len < min {
                    result.error(path, format!("{} must be at least {} characters", label, min));
                }
            }
            if let Some(max) = validation.max_length {
                if len > max {
                    result.error(path, format!("{} must be at most {} characters", label, max));
                }
            }
            if let Some(pattern) = validation.pattern.as_deref() {
                // A malformed pattern in the schema is ignored, not a crash.
                if let Ok(re) = Regex::new(pattern) {
                    if !re.is_match(text) {
                        result.error(path, format!("{} does not match the required pattern", label));
                    }
                }
            }
        }
        FieldType::Number => {
            let Some(number) = as_number(value) else {
                result.error(path, format!("{} must be a number", label));
                return;
            };
            if let Some(min) = validation.min {
                if number < min {
                    result.error(path, format!("{} must be at least {}", label, min));
                }
            }
            if let Some(max) = validation.max {
                if number > max {
                    result.error(path, format!("{} must be at most {}", label, max));
                }
            }
        }
        FieldType::Select | FieldType::Radio => {
            if let Some(options) = spec.options.as_deref() {
                if !options.iter().any(|opt| loose_eq(opt, value)) {
                    result.error(path, format!("{} must be one of the allowed values", label));
                }
            }
        }
        FieldType::Multiselect => {
            let Some(items) = value.as_array() else {
                result.error(path, format!("{} must be a list", label));
                return;
            };
            if let Some(options) = spec.options.as_deref() {
                for item in items {
                    if !options.iter().any(|opt| loose_eq(opt, item)) {
                        result.error(path, format!("{} must be one of the allowed values", label));
                    }
                }
            }
        }
        FieldType::Checkbox => {}
        FieldType::Date => {
            if !is_valid_date(value) {
                result.error(path, format!("{} must be a valid date", label));
            }
        }
        FieldType::Datetime => {
            if !is_valid_datetime(value) {
                result.error(path, format!("{} must be a valid datetime", label));
            }
        }
        FieldType::Time => {
            if !is_valid_time(value) {
                result.error(path, format!("{} must be a valid time", label));
            }
        }
        FieldType::Object => {
            let Some(child_scope) = value.as_object() else {
                result.error(path, format!("{} must be an object", label));
                return;
            };
            if let Some(children) = spec.fields.as_ref() {
                validate_scope(children, child_scope, path, None, result);
            }
        }
        FieldType::Array => {
            let Some(elements) = value.as_array() else {
                result.error(path, format!("{} must be a list", label));
                return;
            };
            if let Some(item_spec) = spec.items.as_deref() {
                for (i, element) in elements.iter().enumerate() {
                    let element_path = format!("{}[{}]", path, i);
                    let element_label = item_spec.label_or(&element_path);
                    if is_absent(Some(element)) {
                        if item_spec.required {
                            result.error(&element_path, format!("{} is required", element_label));
                        }
                        continue;
                    }
                    let element_validation = item_spec.validation.clone().unwrap_or_default();
                    check_typed(
                        item_spec,
                        &element_validation,
                        element,
                        &element_path,
                        element_label,
                        result,
                    );
                }
            }
        }
    }
}

/// Evaluate a conditional rule against the referenced field's current value.
/// An absent referenced field, or an operator/value type mismatch, evaluates
/// to "condition not met".
pub fn evaluate_condition(cond: &Condition, scope: &Map<String, Value>) -> bool {
    let Some(actual) = scope.get(&cond.field) else {
        return false;
    };
    match cond.operator {
        ConditionOperator::Equals => loose_eq(actual, &cond.value),
        ConditionOperator::NotEquals => !loose_eq(actual, &cond.value),
        ConditionOperator::Contains => loose_contains(actual, &cond.value),
        ConditionOperator::GreaterThan => match (as_number(actual), as_number(&cond.value)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        ConditionOperator::LessThan => match (as_number(actual), as_number(&cond.value)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_valid_date(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
        .unwrap_or(false)
}

fn is_valid_datetime(value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
}

fn is_valid_time(value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    chrono::NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
        || chrono::NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}
