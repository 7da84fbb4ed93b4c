//! Dependency resolution: field visibility and the effective required flag.
//!
//! Both are recomputed from scratch against the current values on every
//! change. Nothing here is cached.

use std::cmp::Ordering;

use crate::field::{Condition, Dependency, FieldSpec};
use crate::value::{self, Values};

impl Dependency {
    /// Whether this condition holds for the current values.
    pub fn is_met(&self, values: &Values) -> bool {
        let actual = values.get(&self.field);
        let expected = self.value.as_ref();
        match self.condition {
            Condition::Equals => value::strict_equals(actual, expected),
            Condition::NotEquals => !value::strict_equals(actual, expected),
            Condition::GreaterThan => {
                value::compare_numeric(actual, expected) == Some(Ordering::Greater)
            }
            Condition::LessThan => value::compare_numeric(actual, expected) == Some(Ordering::Less),
            Condition::Exists => value::is_truthy(actual),
        }
    }
}

/// Logical AND over all conditions; vacuously true when empty.
pub fn conditions_met(dependencies: &[Dependency], values: &Values) -> bool {
    dependencies.iter().all(|dep| dep.is_met(values))
}

/// Whether `field` is visible for the current values.
///
/// Fields without dependencies are always visible.
pub fn is_visible(field: &FieldSpec, values: &Values) -> bool {
    match &field.dependencies {
        None => true,
        Some(dependencies) => conditions_met(&dependencies.resolve(values), values),
    }
}

/// The effective required flag of `field` for the current values.
pub fn is_required(field: &FieldSpec, values: &Values) -> bool {
    *field.required.resolve(values)
}
