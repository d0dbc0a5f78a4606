//! Validation and application scenario tests
//!
//! Behavioral contracts for the validation engine and the applier, driven
//! through plain schema values rather than a store.

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use medrec_templates::{
    apply, validate, Condition, ConditionOperator, ConditionalRules, FieldSpec, FieldType,
    FieldValidation, TemplateDefinition, TemplateType,
};

fn template(fields: IndexMap<String, FieldSpec>) -> TemplateDefinition {
    let actor = Uuid::new_v4();
    TemplateDefinition {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        parent_template_id: None,
        name: "scenario".to_string(),
        description: None,
        template_type: TemplateType::Consultation,
        specialty: None,
        fields,
        default_values: Map::new(),
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

fn fields(entries: Vec<(&str, FieldSpec)>) -> IndexMap<String, FieldSpec> {
    entries
        .into_iter()
        .map(|(name, spec)| (name.to_string(), spec))
        .collect()
}

#[test]
fn required_text_field_missing() {
    let mut diagnosis = FieldSpec::new(FieldType::Text);
    diagnosis.required = true;
    let t = template(fields(vec![("diagnosis", diagnosis)]));

    let result = validate(&t, &json!({}));
    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors["diagnosis"],
        vec!["diagnosis is required".to_string()]
    );
}

#[test]
fn custom_values_win_over_defaults() {
    let mut t = template(fields(vec![("status", FieldSpec::new(FieldType::Text))]));
    t.default_values
        .insert("status".to_string(), json!("draft"));

    let custom: Map<String, Value> =
        json!({"status": "final"}).as_object().cloned().unwrap();
    let applied = apply(&t, &custom);
    assert_eq!(applied.populated_fields["status"], json!("final"));
}

#[test]
fn number_over_max_is_flagged() {
    let mut dose = FieldSpec::new(FieldType::Number);
    dose.validation = Some(FieldValidation {
        max: Some(10.0),
        ..Default::default()
    });
    let t = template(fields(vec![("dose", dose)]));

    let result = validate(&t, &json!({"dose": 15}));
    assert!(result.errors["dose"][0].contains("at most 10"));
}

#[test]
fn conditional_requirement_triggers_on_referenced_value() {
    let mut a = FieldSpec::new(FieldType::Text);
    a.conditional = Some(ConditionalRules {
        show_if: None,
        required_if: Some(Condition {
            field: "b".to_string(),
            operator: ConditionOperator::Equals,
            value: json!("X"),
        }),
    });
    let t = template(fields(vec![
        ("b", FieldSpec::new(FieldType::Text)),
        ("a", a),
    ]));

    let triggered = validate(&t, &json!({"b": "X"}));
    assert_eq!(
        triggered.errors["a"],
        vec!["a is required when b is X".to_string()]
    );

    let not_triggered = validate(&t, &json!({"b": "Y"}));
    assert!(not_triggered.is_valid);

    // A present value satisfies the conditional requirement.
    let satisfied = validate(&t, &json!({"b": "X", "a": "value"}));
    assert!(satisfied.is_valid);
}

#[test]
fn is_valid_always_mirrors_errors() {
    let mut required = FieldSpec::new(FieldType::Text);
    required.required = true;
    let t = template(fields(vec![
        ("note", required),
        ("count", FieldSpec::new(FieldType::Number)),
    ]));

    for data in [
        json!({}),
        json!({"note": "x"}),
        json!({"note": "x", "count": "many"}),
        json!({"note": null, "count": 3}),
        json!({"unknown": true}),
    ] {
        let result = validate(&t, &data);
        assert_eq!(result.is_valid, result.errors.is_empty(), "data: {}", data);
    }
}

#[test]
fn show_if_is_never_validated() {
    let mut hidden = FieldSpec::new(FieldType::Text);
    hidden.conditional = Some(ConditionalRules {
        show_if: Some(Condition {
            field: "mode".to_string(),
            operator: ConditionOperator::Equals,
            value: json!("advanced"),
        }),
        required_if: None,
    });
    let t = template(fields(vec![
        ("mode", FieldSpec::new(FieldType::Text)),
        ("detail", hidden),
    ]));

    // show_if affects presentation only; absence is fine either way.
    assert!(validate(&t, &json!({"mode": "advanced"})).is_valid);
    assert!(validate(&t, &json!({"mode": "basic"})).is_valid);
}

#[test]
fn greater_than_condition_compares_numerically() {
    let mut escalation = FieldSpec::new(FieldType::Text);
    escalation.conditional = Some(ConditionalRules {
        show_if: None,
        required_if: Some(Condition {
            field: "pain_score".to_string(),
            operator: ConditionOperator::GreaterThan,
            value: json!(7),
        }),
    });
    let t = template(fields(vec![
        ("pain_score", FieldSpec::new(FieldType::Number)),
        ("escalation", escalation),
    ]));

    assert!(!validate(&t, &json!({"pain_score": 9})).is_valid);
    assert!(validate(&t, &json!({"pain_score": 5})).is_valid);
    // Numeric strings coerce for comparison.
    assert!(!validate(&t, &json!({"pain_score": "8"})).is_valid);
}

#[test]
fn contains_condition_works_on_lists() {
    let mut reaction = FieldSpec::new(FieldType::Text);
    reaction.conditional = Some(ConditionalRules {
        show_if: None,
        required_if: Some(Condition {
            field: "allergies".to_string(),
            operator: ConditionOperator::Contains,
            value: json!("penicillin"),
        }),
    });
    let t = template(fields(vec![
        ("allergies", FieldSpec::new(FieldType::Multiselect)),
        ("reaction", reaction),
    ]));

    assert!(!validate(&t, &json!({"allergies": ["latex", "penicillin"]})).is_valid);
    assert!(validate(&t, &json!({"allergies": ["latex"]})).is_valid);
}

#[test]
fn nested_structures_validate_recursively() {
    let mut med_name = FieldSpec::new(FieldType::Text);
    med_name.required = true;
    let mut med = FieldSpec::new(FieldType::Object);
    med.fields = Some(fields(vec![
        ("name", med_name),
        ("dose_mg", {
            let mut d = FieldSpec::new(FieldType::Number);
            d.validation = Some(FieldValidation {
                min: Some(0.0),
                ..Default::default()
            });
            d
        }),
    ]));
    let mut meds = FieldSpec::new(FieldType::Array);
    meds.items = Some(Box::new(med));
    let t = template(fields(vec![("medications", meds)]));

    let result = validate(
        &t,
        &json!({
            "medications": [
                {"name": "aspirin", "dose_mg": 75},
                {"dose_mg": -5}
            ]
        }),
    );
    assert!(result.errors.contains_key("medications[1].name"));
    assert!(result.errors.contains_key("medications[1].dose_mg"));
    assert!(!result.errors.contains_key("medications[0].name"));
}

#[test]
fn shallow_merge_replaces_nested_values_wholesale() {
    let mut t = template(fields(vec![("vitals", FieldSpec::new(FieldType::Object))]));
    t.default_values.insert(
        "vitals".to_string(),
        json!({"bp": "120/80", "hr": 70, "temp": 36.6}),
    );

    let custom: Map<String, Value> = json!({"vitals": {"bp": "150/95"}})
        .as_object()
        .cloned()
        .unwrap();
    let applied = apply(&t, &custom);
    assert_eq!(applied.populated_fields["vitals"], json!({"bp": "150/95"}));
}

#[test]
fn apply_attaches_errors_without_blocking() {
    let mut diagnosis = FieldSpec::new(FieldType::Text);
    diagnosis.required = true;
    let mut t = template(fields(vec![
        ("diagnosis", diagnosis),
        ("status", FieldSpec::new(FieldType::Text)),
    ]));
    t.default_values
        .insert("status".to_string(), json!("draft"));

    let applied = apply(&t, &Map::new());
    assert_eq!(applied.populated_fields["status"], json!("draft"));
    let errors = applied.validation_errors.expect("diagnosis missing");
    assert!(errors.errors.contains_key("diagnosis"));
}
