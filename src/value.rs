//! Helpers over loosely-typed field values
//!
//! Field values travel as `serde_json::Value` (Null | Bool | Number | String |
//! List | Map). These helpers centralize absence, numeric coercion and loose
//! comparison so the validation engine never duck-types.

use serde_json::Value;

/// A value is absent when the key is missing, explicitly null, or an empty
/// string. Empty lists/maps are present values.
pub fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Coerce a value to f64. Numbers pass through; numeric strings parse; all
/// else is non-numeric.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Loose equality: numbers compare by numeric value even across number and
/// numeric-string representations; everything else compares structurally.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Containment check for the `contains` operator: substring over strings,
/// membership over lists. Anything else does not contain.
pub fn loose_contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => match needle {
            Value::String(n) => s.contains(n.as_str()),
            other => s.contains(&other.to_string()),
        },
        Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absence_covers_missing_null_and_empty_string() {
        assert!(is_absent(None));
        assert!(is_absent(Some(&Value::Null)));
        assert!(is_absent(Some(&json!(""))));
        assert!(!is_absent(Some(&json!("x"))));
        assert!(!is_absent(Some(&json!(0))));
        assert!(!is_absent(Some(&json!(false))));
        assert!(!is_absent(Some(&json!([]))));
    }

    #[test]
    fn numeric_coercion_accepts_numeric_strings() {
        assert_eq!(as_number(&json!(15)), Some(15.0));
        assert_eq!(as_number(&json!("15.5")), Some(15.5));
        assert_eq!(as_number(&json!(" 7 ")), Some(7.0));
        assert_eq!(as_number(&json!("abc")), None);
        assert_eq!(as_number(&json!(true)), None);
    }

    #[test]
    fn loose_equality_crosses_number_representations() {
        assert!(loose_eq(&json!(5), &json!("5")));
        assert!(loose_eq(&json!(5.0), &json!(5)));
        assert!(!loose_eq(&json!("five"), &json!(5)));
        assert!(loose_eq(&json!("abc"), &json!("abc")));
    }

    #[test]
    fn contains_handles_strings_and_lists() {
        assert!(loose_contains(&json!("chest pain"), &json!("pain")));
        assert!(loose_contains(&json!(["a", "b"]), &json!("b")));
        assert!(loose_contains(&json!([1, 2, 3]), &json!("2")));
        assert!(!loose_contains(&json!(42), &json!("4")));
    }
}
