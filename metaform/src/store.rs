//! Form state store: the single source of truth for one session.
//!
//! Holds values, errors, resolved options, the last computed visibility and
//! the per-field validation status. The store does no evaluation itself; the
//! session drives it.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::SelectOption;
use crate::value::Values;

/// Validation state of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    /// Never validated
    Untouched,
    /// Validation in progress
    Validating,
    Valid,
    Invalid,
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldStatus::Untouched => write!(f, "untouched"),
            FieldStatus::Validating => write!(f, "validating"),
            FieldStatus::Valid => write!(f, "valid"),
            FieldStatus::Invalid => write!(f, "invalid"),
        }
    }
}

/// Error messages keyed by field id. Absent means valid.
pub type ErrorMap = IndexMap<String, String>;

/// Resolved options keyed by field id.
pub type OptionMap = IndexMap<String, Vec<SelectOption>>;

/// Owned copy of everything the presentation layer renders from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub values: Values,
    pub errors: ErrorMap,
    pub options: OptionMap,
    pub visibility: IndexMap<String, bool>,
    pub status: IndexMap<String, FieldStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct FormStore {
    values: Values,
    errors: ErrorMap,
    options: OptionMap,
    visibility: IndexMap<String, bool>,
    status: IndexMap<String, FieldStatus>,
}

impl FormStore {
    pub fn new(values: Values) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    // --- Values ---

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn value(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    /// Store a value. Returns `true` when the stored value actually changed.
    pub fn set_value(&mut self, id: &str, value: Value) -> bool {
        match self.values.get(id) {
            Some(existing) if *existing == value => false,
            _ => {
                self.values.insert(id.to_string(), value);
                true
            }
        }
    }

    /// Insert only the keys that are not present yet; returns the keys filled.
    pub fn fill_absent(&mut self, patch: Values) -> Vec<String> {
        let mut filled = Vec::new();
        for (key, value) in patch {
            if !self.values.contains_key(&key) {
                self.values.insert(key.clone(), value);
                filled.push(key);
            }
        }
        filled
    }

    // --- Errors ---

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn error(&self, id: &str) -> Option<&str> {
        self.errors.get(id).map(String::as_str)
    }

    /// Record or clear the error for one field.
    pub fn set_error(&mut self, id: &str, message: Option<String>) {
        match message {
            Some(message) => {
                self.errors.insert(id.to_string(), message);
            }
            None => {
                self.errors.shift_remove(id);
            }
        }
    }

    /// Overwrite the whole error map.
    pub fn replace_errors(&mut self, errors: ErrorMap) {
        self.errors = errors;
    }

    // --- Options ---

    pub fn options(&self) -> &OptionMap {
        &self.options
    }

    pub fn options_for(&self, id: &str) -> &[SelectOption] {
        self.options.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_options(&mut self, id: &str, options: Vec<SelectOption>) {
        self.options.insert(id.to_string(), options);
    }

    // --- Visibility ---

    /// Last computed visibility. Unknown ids are not visible.
    pub fn is_visible(&self, id: &str) -> bool {
        self.visibility.get(id).copied().unwrap_or(false)
    }

    pub fn replace_visibility(&mut self, visibility: IndexMap<String, bool>) {
        self.visibility = visibility;
    }

    // --- Status ---

    pub fn status(&self, id: &str) -> FieldStatus {
        self.status
            .get(id)
            .copied()
            .unwrap_or(FieldStatus::Untouched)
    }

    pub fn set_status(&mut self, id: &str, status: FieldStatus) {
        self.status.insert(id.to_string(), status);
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            values: self.values.clone(),
            errors: self.errors.clone(),
            options: self.options.clone(),
            visibility: self.visibility.clone(),
            status: self.status.clone(),
        }
    }
}
