//! Loose value comparison shared by step conditions and the script sandbox.
//!
//! Conditions compare whatever the author typed against whatever the state
//! holds, so the rules follow the scripting-language conventions editors
//! expect: `"18" == 18` holds, `true == 1` holds, a missing value only equals
//! `null`. Relational operators compare two strings lexically and everything
//! else numerically; anything that has no numeric reading makes the
//! comparison false.

use serde_json::Value;
use std::cmp::Ordering;

fn string_to_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Numeric reading of a present value
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => string_to_number(s),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Loose equality. `None` is a missing value.
pub fn loose_eq(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None, None) => true,
        (None, Some(v)) | (Some(v), None) => v.is_null(),
        (Some(a), Some(b)) => values_loose_eq(a, b),
    }
}

fn values_loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match (n.as_f64(), string_to_number(s)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Bool(flag), other) | (other, Value::Bool(flag)) => {
            let as_number = Value::from(if *flag { 1 } else { 0 });
            values_loose_eq(&as_number, other)
        }
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => a == b,
        _ => false,
    }
}

/// Relational ordering, `None` when the pair is not comparable
pub fn loose_cmp(left: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
    let (a, b) = (left?, right?);
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return Some(x.cmp(y));
    }
    to_number(a)?.partial_cmp(&to_number(b)?)
}

/// Truthiness used by `if`/`while`/`&&`/`||` in scripts
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|x| x != 0.0 && !x.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_string_equals_number() {
        assert!(loose_eq(Some(&json!("18")), Some(&json!(18))));
        assert!(loose_eq(Some(&json!(18.0)), Some(&json!(18))));
        assert!(!loose_eq(Some(&json!("18a")), Some(&json!(18))));
    }

    #[test]
    fn test_booleans_compare_as_numbers() {
        assert!(loose_eq(Some(&json!(true)), Some(&json!(1))));
        assert!(loose_eq(Some(&json!(false)), Some(&json!("0"))));
        assert!(!loose_eq(Some(&json!(true)), Some(&json!("true"))));
    }

    #[test]
    fn test_missing_only_equals_null() {
        assert!(loose_eq(None, Some(&Value::Null)));
        assert!(!loose_eq(None, Some(&json!(0))));
        assert!(!loose_eq(Some(&Value::Null), Some(&json!(0))));
    }

    #[test]
    fn test_relational_comparisons() {
        assert_eq!(loose_cmp(Some(&json!(19)), Some(&json!(18))), Some(Ordering::Greater));
        assert_eq!(loose_cmp(Some(&json!("19")), Some(&json!(18))), Some(Ordering::Greater));
        assert_eq!(loose_cmp(Some(&json!("b")), Some(&json!("a"))), Some(Ordering::Greater));
        assert_eq!(loose_cmp(Some(&json!("abc")), Some(&json!(1))), None);
        assert_eq!(loose_cmp(None, Some(&json!(1))), None);
        assert_eq!(loose_cmp(Some(&Value::Null), Some(&json!(1))), Some(Ordering::Less));
    }
}
