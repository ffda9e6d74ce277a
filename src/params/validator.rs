//! Schema-driven input validation
//!
//! [`validate_input`] walks the schema's input parameters in declaration
//! order, substitutes defaults, and collects every violation instead of
//! stopping at the first one. Keys not declared by the schema never reach the
//! built map.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{ItemSpec, ModelSchema, ParameterType, ValidationRule, json_type_name, option_listed};

/// Which side of a numeric interval was violated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeBound {
    Min(f64),
    Max(f64),
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Min(min) => write!(f, "minimum is {min}"),
            Self::Max(max) => write!(f, "maximum is {max}"),
        }
    }
}

/// One field-level validation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("`{key}` is required")]
    MissingRequiredField { key: String },

    #[error("`{key}` expected {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: ParameterType,
        actual: &'static str,
    },

    #[error("`{key}` must be one of {}", join_values(.allowed))]
    InvalidEnumValue {
        key: String,
        value: Value,
        allowed: Vec<Value>,
    },

    #[error("`{key}` is out of range: {value} ({bound})")]
    OutOfRange {
        key: String,
        value: f64,
        bound: RangeBound,
    },

    #[error("`{key}` does not match pattern `{pattern}`")]
    PatternMismatch { key: String, pattern: String },

    #[error("`{key}` failed custom validation")]
    CustomRuleFailed { key: String },
}

impl Violation {
    /// Field the violation refers to; array elements are index-qualified
    /// (`loras[0].scale`).
    pub fn key(&self) -> &str {
        match self {
            Self::MissingRequiredField { key }
            | Self::TypeMismatch { key, .. }
            | Self::InvalidEnumValue { key, .. }
            | Self::OutOfRange { key, .. }
            | Self::PatternMismatch { key, .. }
            | Self::CustomRuleFailed { key } => key,
        }
    }
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every violation found in one validation pass.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", summarize(.0))]
pub struct ValidationErrors(Vec<Violation>);

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<Violation> {
        self.0
    }

    /// Violations for one field.
    pub fn for_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.0.iter().filter(move |v| v.key() == key)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// What a single value is checked against: a top-level parameter or a
/// property of an array element.
struct FieldCheck<'a> {
    param_type: ParameterType,
    options: Option<&'a [Value]>,
    rule: &'a ValidationRule,
    items: Option<&'a ItemSpec>,
}

/// Validate raw input against a schema and build the provider parameter map.
///
/// Absent keys (or explicit `null`) take the declared default; required keys
/// without a default are reported missing. Unknown keys are dropped.
pub fn validate_input(
    schema: &ModelSchema,
    raw: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationErrors> {
    let mut built = Map::new();
    let mut violations = Vec::new();

    for spec in schema.input_schema() {
        let key = spec.key();
        match raw.get(key).filter(|v| !v.is_null()) {
            None => {
                if let Some(default) = spec.default_value() {
                    built.insert(key.to_string(), default.clone());
                } else if spec.is_required() {
                    violations.push(Violation::MissingRequiredField {
                        key: key.to_string(),
                    });
                }
            }
            Some(value) => {
                let field = FieldCheck {
                    param_type: spec.param_type(),
                    options: spec.options(),
                    rule: spec.rule(),
                    items: spec.items(),
                };
                let before = violations.len();
                let normalized = check_value(key, &field, value, &mut violations);
                if violations.len() == before {
                    built.insert(key.to_string(), normalized);
                }
            }
        }
    }

    if violations.is_empty() {
        tracing::debug!(model = schema.id(), params = built.len(), "input validated");
        Ok(built)
    } else {
        tracing::debug!(model = schema.id(), violations = violations.len(), "input rejected");
        Err(ValidationErrors(violations))
    }
}

fn check_value(key: &str, field: &FieldCheck<'_>, value: &Value, out: &mut Vec<Violation>) -> Value {
    if !field.param_type.accepts(value) {
        out.push(Violation::TypeMismatch {
            key: key.to_string(),
            expected: field.param_type,
            actual: json_type_name(value),
        });
        return value.clone();
    }

    if let Some(options) = field.options
        && !option_listed(options, value)
    {
        out.push(Violation::InvalidEnumValue {
            key: key.to_string(),
            value: value.clone(),
            allowed: options.to_vec(),
        });
    }

    if field.param_type == ParameterType::Number
        && let Some(n) = value.as_f64()
    {
        let failed = match (field.rule.min, field.rule.max) {
            (Some(min), _) if n < min => Some(RangeBound::Min(min)),
            (_, Some(max)) if n > max => Some(RangeBound::Max(max)),
            _ => None,
        };
        if let Some(bound) = failed {
            out.push(Violation::OutOfRange {
                key: key.to_string(),
                value: n,
                bound,
            });
        }
    }

    if field.param_type.is_textual()
        && let (Some(pattern), Some(text)) = (&field.rule.pattern, value.as_str())
        && !pattern.is_match(text)
    {
        out.push(Violation::PatternMismatch {
            key: key.to_string(),
            pattern: pattern.as_str().to_string(),
        });
    }

    if let Some(custom) = &field.rule.custom
        && !custom.check(value)
    {
        out.push(Violation::CustomRuleFailed {
            key: key.to_string(),
        });
    }

    match (field.items, value.as_array()) {
        (Some(items), Some(elements)) => Value::Array(check_elements(key, items, elements, out)),
        _ => value.clone(),
    }
}

fn check_elements(key: &str, items: &ItemSpec, elements: &[Value], out: &mut Vec<Violation>) -> Vec<Value> {
    let no_rule = ValidationRule::default();
    let mut normalized = Vec::with_capacity(elements.len());

    for (idx, element) in elements.iter().enumerate() {
        let element_key = format!("{key}[{idx}]");
        let Some(properties) = &items.properties else {
            let field = FieldCheck {
                param_type: items.item_type,
                options: None,
                rule: &no_rule,
                items: None,
            };
            normalized.push(check_value(&element_key, &field, element, out));
            continue;
        };

        let Some(object) = element.as_object() else {
            out.push(Violation::TypeMismatch {
                key: element_key,
                expected: ParameterType::Object,
                actual: json_type_name(element),
            });
            normalized.push(element.clone());
            continue;
        };

        let mut built = Map::new();
        for (name, prop) in properties {
            match object.get(name).filter(|v| !v.is_null()) {
                None => {
                    if let Some(default) = &prop.default {
                        built.insert(name.clone(), default.clone());
                    }
                }
                Some(v) => {
                    let field = FieldCheck {
                        param_type: prop.prop_type,
                        options: None,
                        rule: &prop.validation,
                        items: None,
                    };
                    let prop_key = format!("{element_key}.{name}");
                    built.insert(name.clone(), check_value(&prop_key, &field, v, out));
                }
            }
        }
        normalized.push(Value::Object(built));
    }
    normalized
}
