//! Loose value semantics shared by the rule evaluator and the dependency resolver.
//!
//! Form values are untyped JSON at this layer. Absence (`None`) is distinct
//! from an explicit `null`, which matters for `equals` comparisons.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde_json::Value;

/// The full value-mapping of a form, in insertion order.
pub type Values = IndexMap<String, Value>;

/// Whether a value counts as "empty" for the required check.
///
/// Empty means absent, `null`, the empty string, or `false`. Zero and empty
/// arrays are not empty.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(_) => false,
    }
}

/// Whether a value is truthy: defined, non-null, non-false, non-zero, non-empty string.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Coerce a value to a number.
///
/// Numbers pass through, numeric strings are parsed after trimming and
/// booleans become 1 or 0. Everything else is not a number.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Length of a sequence-like value: characters of a string, elements of an array.
pub fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Textual representation used for pattern matching and lookups.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Strict equality between an optional value and an optional comparison value.
///
/// Numbers compare numerically (`1` equals `1.0`), everything else
/// structurally. Absent equals only absent.
pub fn strict_equals(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (None, None) => true,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.as_f64() == b.as_f64(),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Numeric ordering of two optional values; `None` when either side is not a number.
pub fn compare_numeric(actual: Option<&Value>, expected: Option<&Value>) -> Option<Ordering> {
    let a = as_number(actual?)?;
    let b = as_number(expected?)?;
    a.partial_cmp(&b)
}
