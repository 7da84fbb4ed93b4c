//! Declarative form metadata.
//!
//! These types serialize to/from YAML and cover everything about a field
//! except host closures. Conditional requirements, lookup-table providers and
//! same-as checks have declarative forms here; anything more dynamic is
//! attached in code via [`crate::FormMetadata::update_field`].

use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FormError, Result};
use crate::field::{CustomControl, Dependency, FieldKind, FieldSpec, SelectOption, Verdict};
use crate::metadata::FormMetadata;
use crate::options::LookupProvider;
use crate::value;
use crate::visibility;

/// A whole form: fields in display order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormDef {
    pub fields: Vec<FieldDef>,
}

impl FormDef {
    /// Convert into runtime metadata, compiling patterns and checking ids.
    pub fn into_metadata(self) -> Result<FormMetadata> {
        let fields = self
            .fields
            .into_iter()
            .map(FieldDef::into_spec)
            .collect::<Result<Vec<_>>>()?;
        FormMetadata::new(fields)
    }
}

/// Field kind as written in YAML.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum KindDef {
    Text,
    Number,
    Checkbox,
    Select,
    File,
    Date,
    Custom,
}

/// `required: true` or `required: { when: [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequiredDef {
    Always(bool),
    When { when: Vec<Dependency> },
}

impl Default for RequiredDef {
    fn default() -> Self {
        Self::Always(false)
    }
}

/// Options looked up from a table keyed by another field's value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupDef {
    pub field: String,
    #[serde(default)]
    pub table: IndexMap<String, Vec<SelectOption>>,
}

/// Value must equal another field's value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SameAsDef {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RulesDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greater_than: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub less_than: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_as: Option<SameAsDef>,
}

/// A field definition as written in YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: KindDef,
    /// Component name for `custom` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default)]
    pub required: RequiredDef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_from: Option<LookupDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_inputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<Dependency>>,
    #[serde(default)]
    pub rules: RulesDef,
}

impl FieldDef {
    /// Convert into a runtime [`FieldSpec`].
    pub fn into_spec(self) -> Result<FieldSpec> {
        let kind = match self.kind {
            KindDef::Text => FieldKind::Text,
            KindDef::Number => FieldKind::Number,
            KindDef::Checkbox => FieldKind::Checkbox,
            KindDef::Select => FieldKind::Select,
            KindDef::File => FieldKind::File,
            KindDef::Date => FieldKind::Date,
            KindDef::Custom => FieldKind::Custom(CustomControl::named(
                self.component.clone().unwrap_or_else(|| self.id.clone()),
            )),
        };

        let mut spec = FieldSpec::new(self.id, kind);
        if let Some(label) = self.label {
            spec = spec.label(label);
        }

        spec = match self.required {
            RequiredDef::Always(required) => spec.required(required),
            RequiredDef::When { when } => {
                spec.required_when(move |values| visibility::conditions_met(&when, values))
            }
        };

        spec = spec.options(self.options);

        if let Some(dependencies) = self.depends_on {
            spec = spec.depends_on(dependencies);
        }

        // A lookup reads exactly one field, which is its declared input unless overridden.
        if let Some(lookup) = self.options_from {
            let source = lookup.field.clone();
            spec = spec
                .provider(Arc::new(LookupProvider::new(lookup.field, lookup.table)))
                .option_inputs([source]);
        }
        if let Some(inputs) = self.option_inputs {
            spec = spec.option_inputs(inputs);
        }

        let rules = self.rules;
        if let Some(n) = rules.min_length {
            spec = spec.min_length(n);
        }
        if let Some(n) = rules.max_length {
            spec = spec.max_length(n);
        }
        if let Some(pattern) = rules.pattern {
            let regex = Regex::new(&pattern).map_err(|source| FormError::InvalidPattern {
                field: spec.id.clone(),
                source,
            })?;
            spec = spec.pattern(regex);
        }
        if let Some(n) = rules.greater_than {
            spec = spec.greater_than(n);
        }
        if let Some(n) = rules.less_than {
            spec = spec.less_than(n);
        }
        if let Some(same_as) = rules.same_as {
            let message = same_as
                .message
                .unwrap_or_else(|| format!("{} must match.", spec.label));
            let other = same_as.field;
            spec = spec.custom(move |value, values| {
                let theirs = values.get(&other).unwrap_or(&Value::Null);
                Ok(Verdict::check(
                    value::strict_equals(Some(value), Some(theirs)),
                    message.clone(),
                ))
            });
        }

        Ok(spec)
    }
}
