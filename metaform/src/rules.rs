//! Rule evaluation for a single field value.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. required
//! 2. `min_length`
//! 3. `max_length`
//! 4. `pattern`
//! 5. `greater_than`
//! 6. `less_than`
//! 7. custom predicate
//!
//! An absent or null value skips checks 2 to 6. Any other value, including
//! an empty string on an optional field, goes through them. The custom
//! predicate always runs and receives null for an absent value.

use serde_json::Value;

use crate::error::{FormError, Result};
use crate::field::{FieldSpec, ValidationRules, Verdict};
use crate::value::{self, Values};
use crate::visibility;

/// Validate `value` for `field` against the full current values.
///
/// Returns `Ok(None)` when the value passes and `Ok(Some(message))` on the
/// first failing check. `Err` only when a custom predicate fails outright.
pub fn validate(
    field: &FieldSpec,
    value: Option<&Value>,
    values: &Values,
) -> Result<Option<String>> {
    if value::is_empty(value) && visibility::is_required(field, values) {
        return Ok(Some(format!("{} is required.", field.label)));
    }

    let rules = &field.rules;

    if let Some(value) = value.filter(|v| !v.is_null()) {
        if let Some(message) = check_constraints(&field.label, rules, value) {
            return Ok(Some(message));
        }
    }

    if let Some(custom) = &rules.custom {
        let verdict = custom
            .check(value.unwrap_or(&Value::Null), values)
            .map_err(|source| FormError::PredicateFailed {
                field: field.id.clone(),
                source,
            })?;
        if let Verdict::Fail(message) = verdict {
            return Ok(Some(message));
        }
    }

    Ok(None)
}

/// Length, pattern and range checks on a present value.
fn check_constraints(label: &str, rules: &ValidationRules, value: &Value) -> Option<String> {
    let length = value::length(value);

    if let (Some(min), Some(len)) = (rules.min_length, length) {
        if len < min {
            return Some(format!("{label} must be at least {min} characters."));
        }
    }

    if let (Some(max), Some(len)) = (rules.max_length, length) {
        if len > max {
            return Some(format!("{label} must be at most {max} characters."));
        }
    }

    if let Some(pattern) = &rules.pattern {
        if !pattern.is_match(&value::to_text(value)) {
            return Some(format!("{label} is not valid."));
        }
    }

    let number = value::as_number(value);

    if let Some(bound) = rules.greater_than {
        if !number.is_some_and(|n| n > bound) {
            return Some(format!("{label} must be greater than {bound}."));
        }
    }

    if let Some(bound) = rules.less_than {
        if !number.is_some_and(|n| n < bound) {
            return Some(format!("{label} must be less than {bound}."));
        }
    }

    None
}
