//! Runtime field descriptors.
//!
//! A [`FieldSpec`] is the immutable description of one form field for the
//! lifetime of a session. Parts of it may be host closures (computed required
//! rules, computed dependencies, custom predicates, option providers), so it
//! is built in code through its builder methods or converted from the
//! declarative YAML schema in [`crate::schema`].

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::options::{FnProvider, OptionProvider};
use crate::value::{self, Values};

/// A single option in a select field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Comparison applied by a visibility dependency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Exists,
}

/// One visibility condition relating this field to another field's value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dependency {
    /// Id of the field whose value is inspected
    pub field: String,
    pub condition: Condition,
    /// Comparison value; unused by `exists`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Dependency {
    pub fn new(field: impl Into<String>, condition: Condition, value: Option<Value>) -> Self {
        Self {
            field: field.into(),
            condition,
            value,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Condition::Equals, Some(value.into()))
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::new(field, Condition::Exists, None)
    }
}

/// A setting that is either a constant or computed from the current values.
///
/// Both `required` and `dependencies` take this shape; [`Resolvable::resolve`]
/// is the single place where the two forms are told apart.
pub enum Resolvable<T> {
    Constant(T),
    Computed(Arc<dyn Fn(&Values) -> T + Send + Sync>),
}

impl<T: Clone> Resolvable<T> {
    pub fn computed(f: impl Fn(&Values) -> T + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(f))
    }

    /// Resolve against the current values.
    pub fn resolve(&self, values: &Values) -> Cow<'_, T> {
        match self {
            Self::Constant(value) => Cow::Borrowed(value),
            Self::Computed(f) => Cow::Owned(f(values)),
        }
    }
}

impl<T: Clone> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Constant(value) => Self::Constant(value.clone()),
            Self::Computed(f) => Self::Computed(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Outcome of a custom predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
}

impl Verdict {
    /// `Pass` when `ok`, otherwise `Fail` with the given message.
    pub fn check(ok: bool, message: impl Into<String>) -> Self {
        if ok {
            Self::Pass
        } else {
            Self::Fail(message.into())
        }
    }
}

type PredicateFn = dyn Fn(&Value, &Values) -> anyhow::Result<Verdict> + Send + Sync;

/// Host-supplied cross-field check.
///
/// Returning `Err` is a host defect, not a validation failure: it surfaces
/// as [`crate::FormError::PredicateFailed`].
#[derive(Clone)]
pub struct CustomPredicate(Arc<PredicateFn>);

impl CustomPredicate {
    pub fn new(
        f: impl Fn(&Value, &Values) -> anyhow::Result<Verdict> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    pub fn check(&self, value: &Value, values: &Values) -> anyhow::Result<Verdict> {
        (self.0)(value, values)
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomPredicate(..)")
    }
}

/// Constraint checks applied after the required check, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub greater_than: Option<f64>,
    pub less_than: Option<f64>,
    pub custom: Option<CustomPredicate>,
}

type ExtractFn = dyn Fn(Value) -> Value + Send + Sync;

/// Opaque capability behind a `custom` field.
///
/// The engine never renders anything; the only thing it asks of a custom
/// control is how to turn a raw input into the stored value.
#[derive(Clone)]
pub struct CustomControl {
    name: String,
    extract: Option<Arc<ExtractFn>>,
}

impl CustomControl {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extract: None,
        }
    }

    pub fn with_extractor(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.extract = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extract(&self, raw: Value) -> Value {
        match &self.extract {
            Some(f) => f(raw),
            None => raw,
        }
    }
}

impl fmt::Debug for CustomControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomControl")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The kind of a field: determines how raw input becomes a stored value.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Text,
    Number,
    Checkbox,
    Select,
    /// Carries an opaque file handle the engine never inspects
    File,
    Date,
    Custom(CustomControl),
}

impl FieldKind {
    /// Turn a raw input into the value stored for this kind.
    pub fn normalize(&self, raw: Value) -> Value {
        match self {
            Self::Checkbox => Value::Bool(value::is_truthy(Some(&raw))),
            Self::Custom(control) => control.extract(raw),
            Self::Text | Self::Number | Self::Select | Self::File | Self::Date => raw,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Checkbox => "checkbox",
            Self::Select => "select",
            Self::File => "file",
            Self::Date => "date",
            Self::Custom(_) => "custom",
        }
    }
}

/// A field descriptor, immutable for the lifetime of a session.
#[derive(Clone)]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: Resolvable<bool>,
    /// Options used when no provider has resolved anything
    pub options: Vec<SelectOption>,
    pub provider: Option<Arc<dyn OptionProvider>>,
    /// Field ids the provider reads; `None` means it may read anything
    pub option_inputs: Option<Vec<String>>,
    pub dependencies: Option<Resolvable<Vec<Dependency>>>,
    pub rules: ValidationRules,
}

impl FieldSpec {
    /// A visible, optional field with no rules. The label defaults to the id.
    pub fn new(id: impl Into<String>, kind: FieldKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            kind,
            required: Resolvable::Constant(false),
            options: Vec::new(),
            provider: None,
            option_inputs: None,
            dependencies: None,
            rules: ValidationRules::default(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Resolvable::Constant(required);
        self
    }

    /// Required only while `f` holds for the current values.
    pub fn required_when(mut self, f: impl Fn(&Values) -> bool + Send + Sync + 'static) -> Self {
        self.required = Resolvable::computed(f);
        self
    }

    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn OptionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Attach an async closure as the option provider.
    pub fn provider_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Values) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<SelectOption>>> + Send + 'static,
    {
        self.provider(Arc::new(FnProvider::new(f)))
    }

    pub fn option_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.option_inputs = Some(inputs.into_iter().map(Into::into).collect());
        self
    }

    pub fn depends_on(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = Some(Resolvable::Constant(dependencies));
        self
    }

    pub fn depends_on_fn(
        mut self,
        f: impl Fn(&Values) -> Vec<Dependency> + Send + Sync + 'static,
    ) -> Self {
        self.dependencies = Some(Resolvable::computed(f));
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.rules.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.rules.max_length = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.rules.pattern = Some(pattern);
        self
    }

    pub fn greater_than(mut self, n: f64) -> Self {
        self.rules.greater_than = Some(n);
        self
    }

    pub fn less_than(mut self, n: f64) -> Self {
        self.rules.less_than = Some(n);
        self
    }

    pub fn custom(
        mut self,
        f: impl Fn(&Value, &Values) -> anyhow::Result<Verdict> + Send + Sync + 'static,
    ) -> Self {
        self.rules.custom = Some(CustomPredicate::new(f));
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("options", &self.options)
            .field("provider", &self.provider.is_some())
            .field("option_inputs", &self.option_inputs)
            .field("dependencies", &self.dependencies)
            .field("rules", &self.rules)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_defaults_to_id() {
        let field = FieldSpec::new("email", FieldKind::Text);
        assert_eq!(field.label, "email");
        let field = field.label("Email");
        assert_eq!(field.label, "Email");
    }

    #[test]
    fn resolvable_constant_and_computed() {
        let values: Values = [("country".to_string(), json!("US"))].into_iter().collect();

        let constant = Resolvable::Constant(true);
        assert!(*constant.resolve(&values));

        let computed = Resolvable::computed(|v: &Values| v.get("country") == Some(&json!("US")));
        assert!(*computed.resolve(&values));
        assert!(!*computed.resolve(&Values::new()));
    }

    #[test]
    fn checkbox_normalizes_to_bool() {
        assert_eq!(FieldKind::Checkbox.normalize(json!("on")), json!(true));
        assert_eq!(FieldKind::Checkbox.normalize(json!(null)), json!(false));
        assert_eq!(FieldKind::Text.normalize(json!("x")), json!("x"));
    }

    #[test]
    fn custom_control_extracts() {
        let kind = FieldKind::Custom(
            CustomControl::named("color-picker")
                .with_extractor(|raw| json!(raw.as_str().unwrap_or("#000000").to_lowercase())),
        );
        assert_eq!(kind.normalize(json!("#FF0000")), json!("#ff0000"));
        assert_eq!(kind.name(), "custom");
    }

    #[test]
    fn file_handles_pass_through() {
        let handle = json!({ "handle": 7, "name": "resume.pdf" });
        assert_eq!(FieldKind::File.normalize(handle.clone()), handle);
    }

    #[test]
    fn condition_serializes_kebab_case() {
        let dep = Dependency::new("age", Condition::GreaterThan, Some(json!(18)));
        let yaml = serde_yaml_ng::to_string(&dep).unwrap();
        assert!(yaml.contains("greater-than"));
    }

    #[test]
    fn verdict_check() {
        assert_eq!(Verdict::check(true, "nope"), Verdict::Pass);
        assert_eq!(
            Verdict::check(false, "Passwords must match."),
            Verdict::Fail("Passwords must match.".into())
        );
    }
}
