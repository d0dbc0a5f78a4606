//! Template definition model
//!
//! Pure data: a template is a named, versioned schema of typed fields plus
//! default values and supplementary validation rules. All behavior lives in
//! the validation engine, the applier and the promotion manager.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Closed set of template classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Consultation,
    FollowUp,
    Emergency,
    Procedure,
    Discharge,
    Admission,
    ProgressNote,
    OperativeNote,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Consultation => "consultation",
            TemplateType::FollowUp => "follow_up",
            TemplateType::Emergency => "emergency",
            TemplateType::Procedure => "procedure",
            TemplateType::Discharge => "discharge",
            TemplateType::Admission => "admission",
            TemplateType::ProgressNote => "progress_note",
            TemplateType::OperativeNote => "operative_note",
        }
    }
}

/// Closed set of field types. The type decides which validation constraints
/// are interpretable; inapplicable constraints are ignored, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Select,
    Multiselect,
    Checkbox,
    Radio,
    Date,
    Datetime,
    Time,
    Object,
    Array,
}

/// Constraint block for a field. `min_length`/`max_length` apply to text
/// kinds, `min`/`max` to numbers, `pattern` is a regex over text values.
/// `custom` is carried opaquely for downstream consumers and never evaluated
/// here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
}

impl FieldValidation {
    /// Overlay `over` on top of `self`, constraint by constraint. Used to
    /// apply a template's supplementary `validation_rules` over the
    /// constraints declared inline on the field.
    pub fn overlaid(&self, over: &FieldValidation) -> FieldValidation {
        FieldValidation {
            min_length: over.min_length.or(self.min_length),
            max_length: over.max_length.or(self.max_length),
            min: over.min.or(self.min),
            max: over.max.or(self.max),
            pattern: over.pattern.clone().or_else(|| self.pattern.clone()),
            custom: over.custom.clone().or_else(|| self.custom.clone()),
        }
    }
}

/// Comparison operators usable in conditional rules. Closed enum: an unknown
/// operator string fails deserialization of the schema up front rather than
/// silently evaluating to false at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

/// A single condition against another field's current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Name of the referenced field, resolved in the same data scope.
    pub field: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

/// Conditional presentation/validation rules. `show_if` is presentation-only
/// and never validated here; `required_if` makes the field required when the
/// condition holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_if: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_if: Option<Condition>,
}

/// Declared shape and constraints of one field within a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Display label; error messages fall back to the field name when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    /// UI grouping only, never validated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Per-field fallback value, lowest precedence in the applier's merge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values for select/multiselect/radio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    /// Child schema for `type = object`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<IndexMap<String, FieldSpec>>,
    /// Element schema for `type = array`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalRules>,
}

impl FieldSpec {
    /// Bare field of the given type, everything else defaulted.
    pub fn new(field_type: FieldType) -> Self {
        FieldSpec {
            field_type,
            label: None,
            placeholder: None,
            help_text: None,
            section: None,
            required: false,
            default: None,
            options: None,
            fields: None,
            items: None,
            validation: None,
            conditional: None,
        }
    }

    /// Label for error messages, falling back to the field name.
    pub fn label_or<'a>(&'a self, name: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(name)
    }
}

/// A full template definition as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Lineage back-reference set when this template was cloned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_template_id: Option<Uuid>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub template_type: TemplateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    /// Insertion-ordered field schema; validation walks it in this order.
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,
    #[serde(default)]
    pub default_values: serde_json::Map<String, Value>,
    /// Supplementary constraint overrides keyed by top-level field name.
    /// Kept separate from inline `FieldSpec.validation`; both are consulted,
    /// with these winning per constraint key.
    #[serde(default)]
    pub validation_rules: HashMap<String, FieldValidation>,
    pub is_default: bool,
    pub is_active: bool,
    /// Caller-managed; the engine stores it opaquely and never increments it.
    pub version: i32,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to `create_template`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub template_type: TemplateType,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,
    #[serde(default)]
    pub default_values: serde_json::Map<String, Value>,
    #[serde(default)]
    pub validation_rules: HashMap<String, FieldValidation>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub version: Option<i32>,
}

impl Default for TemplateType {
    fn default() -> Self {
        TemplateType::Consultation
    }
}

/// Input to `update_template`. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub specialty: Option<Option<String>>,
    #[serde(default)]
    pub fields: Option<IndexMap<String, FieldSpec>>,
    #[serde(default)]
    pub default_values: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub validation_rules: Option<HashMap<String, FieldValidation>>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub version: Option<i32>,
}

/// Input to `clone_template`: per-part overrides on top of the source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloneTemplate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub template_type: Option<TemplateType>,
    #[serde(default)]
    pub specialty: Option<Option<String>>,
    #[serde(default)]
    pub fields: Option<IndexMap<String, FieldSpec>>,
    #[serde(default)]
    pub default_values: Option<serde_json::Map<String, Value>>,
}
