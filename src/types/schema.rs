//! Declarative model parameter schemas
//!
//! A [`ModelSchema`] lists the input and output fields of one provider model.
//! Each field is a [`ParameterSpec`] whose [`ParameterKind`] carries only the
//! data legal for its type (enum options, array item shapes). Specs are built
//! through [`ParameterSpecBuilder::build`] or deserialized from JSON; both
//! paths run the same invariant checks, so a `ParameterSpec` value is always
//! well-formed.
//!
//! ```rust,ignore
//! let size = ParameterSpec::enumeration("image_size", ["square", "square_hd"])
//!     .default("square")
//!     .build()?;
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::SchemaError;

/// Runtime shape discriminant of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Enum,
    /// Image reference (URL or data URI)
    Image,
    /// File reference (URL or data URI)
    File,
    /// Arbitrary structured JSON
    Json,
}

impl ParameterType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Enum => "enum",
            Self::Image => "image",
            Self::File => "file",
            Self::Json => "json",
        }
    }

    /// Parse a lowercase type name as used in schema files.
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name {
            "string" => Self::String,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            "enum" => Self::Enum,
            "image" => Self::Image,
            "file" => Self::File,
            "json" => Self::Json,
            _ => return None,
        };
        Some(ty)
    }

    /// Whether `value` has the runtime shape this type expects.
    ///
    /// Enum membership is checked separately; `json` accepts anything.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String | Self::Image | Self::File => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Enum | Self::Json => true,
        }
    }

    /// Types whose values are strings and can be matched against a pattern.
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::Image | Self::File)
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON type name of a value, as reported in type mismatches.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Enum membership; numeric options match by value, so `2.0` equals `2`.
pub fn option_listed(options: &[Value], value: &Value) -> bool {
    options.iter().any(|option| match (option.as_f64(), value.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => option == value,
    })
}

/// Compiled regular expression used by `ValidationRule::pattern`.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pattern::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Caller-supplied predicate over a parameter value.
///
/// Not serializable: schemas loaded from JSON never carry one.
#[derive(Clone)]
pub struct CustomRule(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl CustomRule {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomRule(..)")
    }
}

/// Optional bounds and checks attached to a parameter or property.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Inclusive lower bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Pattern string-like values must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    #[serde(skip)]
    pub custom: Option<CustomRule>,
}

impl ValidationRule {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.pattern.is_none() && self.custom.is_none()
    }

    fn check_bounds(&self, key: &str) -> Result<(), SchemaError> {
        if let (Some(min), Some(max)) = (self.min, self.max)
            && min > max
        {
            return Err(SchemaError::InvertedBounds {
                key: key.to_string(),
                min,
                max,
            });
        }
        Ok(())
    }
}

/// Shape of one property of an object element inside an array parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDefinition {
    #[serde(rename = "type")]
    pub prop_type: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "ValidationRule::is_empty")]
    pub validation: ValidationRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl PropertyDefinition {
    pub fn new(prop_type: ParameterType) -> Self {
        Self {
            prop_type,
            description: None,
            validation: ValidationRule::default(),
            default: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.validation.min = Some(min);
        self.validation.max = Some(max);
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Element shape of an array parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSpec {
    #[serde(rename = "type")]
    pub item_type: ParameterType,
    /// Declared properties when elements are objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertyDefinition>>,
}

impl ItemSpec {
    pub fn of(item_type: ParameterType) -> Self {
        Self {
            item_type,
            properties: None,
        }
    }

    pub fn objects<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, PropertyDefinition)>,
        K: Into<String>,
    {
        Self {
            item_type: ParameterType::Object,
            properties: Some(
                properties
                    .into_iter()
                    .map(|(name, def)| (name.into(), def))
                    .collect(),
            ),
        }
    }
}

/// Type-specific part of a parameter.
#[derive(Debug, Clone)]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
    Array { items: Option<ItemSpec> },
    Object,
    Enum { options: Vec<Value> },
    Image,
    File,
    Json,
}

impl ParameterKind {
    pub fn param_type(&self) -> ParameterType {
        match self {
            Self::String => ParameterType::String,
            Self::Number => ParameterType::Number,
            Self::Boolean => ParameterType::Boolean,
            Self::Array { .. } => ParameterType::Array,
            Self::Object => ParameterType::Object,
            Self::Enum { .. } => ParameterType::Enum,
            Self::Image => ParameterType::Image,
            Self::File => ParameterType::File,
            Self::Json => ParameterType::Json,
        }
    }
}

/// One input or output field of a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawParameterSpec", into = "RawParameterSpec")]
pub struct ParameterSpec {
    key: String,
    kind: ParameterKind,
    description: Option<String>,
    required: bool,
    default: Option<Value>,
    rule: ValidationRule,
}

impl ParameterSpec {
    pub fn builder(key: impl Into<String>, kind: ParameterKind) -> ParameterSpecBuilder {
        ParameterSpecBuilder {
            spec: ParameterSpec {
                key: key.into(),
                kind,
                description: None,
                required: false,
                default: None,
                rule: ValidationRule::default(),
            },
        }
    }

    pub fn string(key: impl Into<String>) -> ParameterSpecBuilder {
        Self::builder(key, ParameterKind::String)
    }

    pub fn number(key: impl Into<String>) -> ParameterSpecBuilder {
        Self::builder(key, ParameterKind::Number)
    }

    pub fn boolean(key: impl Into<String>) -> ParameterSpecBuilder {
        Self::builder(key, ParameterKind::Boolean)
    }

    pub fn object(key: impl Into<String>) -> ParameterSpecBuilder {
        Self::builder(key, ParameterKind::Object)
    }

    pub fn image(key: impl Into<String>) -> ParameterSpecBuilder {
        Self::builder(key, ParameterKind::Image)
    }

    pub fn file(key: impl Into<String>) -> ParameterSpecBuilder {
        Self::builder(key, ParameterKind::File)
    }

    pub fn json(key: impl Into<String>) -> ParameterSpecBuilder {
        Self::builder(key, ParameterKind::Json)
    }

    pub fn array(key: impl Into<String>, items: ItemSpec) -> ParameterSpecBuilder {
        Self::builder(key, ParameterKind::Array { items: Some(items) })
    }

    pub fn enumeration<I, V>(key: impl Into<String>, options: I) -> ParameterSpecBuilder
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let options = options.into_iter().map(Into::into).collect();
        Self::builder(key, ParameterKind::Enum { options })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    pub fn param_type(&self) -> ParameterType {
        self.kind.param_type()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn rule(&self) -> &ValidationRule {
        &self.rule
    }

    /// Allowed literals for enum parameters.
    pub fn options(&self) -> Option<&[Value]> {
        match &self.kind {
            ParameterKind::Enum { options } => Some(options),
            _ => None,
        }
    }

    /// Element shape for array parameters.
    pub fn items(&self) -> Option<&ItemSpec> {
        match &self.kind {
            ParameterKind::Array { items } => items.as_ref(),
            _ => None,
        }
    }

    fn check(&self) -> Result<(), SchemaError> {
        let key = self.key.as_str();
        self.rule.check_bounds(key)?;

        match &self.kind {
            ParameterKind::Enum { options } => {
                if options.is_empty() {
                    return Err(SchemaError::EmptyOptions {
                        key: key.to_string(),
                    });
                }
                if let Some(default) = &self.default
                    && !option_listed(options, default)
                {
                    return Err(SchemaError::DefaultNotInOptions {
                        key: key.to_string(),
                        default: default.clone(),
                    });
                }
            }
            kind => {
                if let Some(default) = &self.default
                    && !kind.param_type().accepts(default)
                {
                    return Err(SchemaError::DefaultTypeMismatch {
                        key: key.to_string(),
                        expected: kind.param_type().to_string(),
                        default: default.clone(),
                    });
                }
            }
        }

        if let Some(properties) = self.items().and_then(|items| items.properties.as_ref()) {
            for (name, prop) in properties {
                let qualified = format!("{key}[].{name}");
                prop.validation.check_bounds(&qualified)?;
                if let Some(default) = &prop.default
                    && !prop.prop_type.accepts(default)
                {
                    return Err(SchemaError::DefaultTypeMismatch {
                        key: qualified,
                        expected: prop.prop_type.to_string(),
                        default: default.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`ParameterSpec`]; invariants are checked by [`Self::build`].
#[derive(Debug, Clone)]
pub struct ParameterSpecBuilder {
    spec: ParameterSpec,
}

impl ParameterSpecBuilder {
    pub fn required(mut self) -> Self {
        self.spec.required = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.spec.default = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.spec.rule.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.spec.rule.max = Some(max);
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn pattern(mut self, pattern: &str) -> Result<Self, SchemaError> {
        let compiled = Pattern::new(pattern).map_err(|e| SchemaError::InvalidPattern {
            key: self.spec.key.clone(),
            reason: e.to_string(),
        })?;
        self.spec.rule.pattern = Some(compiled);
        Ok(self)
    }

    pub fn custom<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.spec.rule.custom = Some(CustomRule::new(check));
        self
    }

    pub fn build(self) -> Result<ParameterSpec, SchemaError> {
        self.spec.check()?;
        Ok(self.spec)
    }
}

/// Wire form of a parameter, matching the JSON schema files.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawParameterSpec {
    key: String,
    #[serde(rename = "type")]
    param_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    items: Option<ItemSpec>,
    #[serde(default, skip_serializing_if = "ValidationRule::is_empty")]
    validation: ValidationRule,
}

impl TryFrom<RawParameterSpec> for ParameterSpec {
    type Error = SchemaError;

    fn try_from(raw: RawParameterSpec) -> Result<Self, Self::Error> {
        let param_type = ParameterType::from_name(&raw.param_type).ok_or_else(|| SchemaError::UnknownType {
            key: raw.key.clone(),
            type_name: raw.param_type.clone(),
        })?;
        let kind = match param_type {
            ParameterType::String => ParameterKind::String,
            ParameterType::Number => ParameterKind::Number,
            ParameterType::Boolean => ParameterKind::Boolean,
            ParameterType::Array => ParameterKind::Array { items: raw.items },
            ParameterType::Object => ParameterKind::Object,
            ParameterType::Enum => ParameterKind::Enum {
                options: raw.options.unwrap_or_default(),
            },
            ParameterType::Image => ParameterKind::Image,
            ParameterType::File => ParameterKind::File,
            ParameterType::Json => ParameterKind::Json,
        };
        let spec = ParameterSpec {
            key: raw.key,
            kind,
            description: raw.description,
            required: raw.required,
            default: raw.default,
            rule: raw.validation,
        };
        spec.check()?;
        Ok(spec)
    }
}

impl From<ParameterSpec> for RawParameterSpec {
    fn from(spec: ParameterSpec) -> Self {
        let param_type = spec.param_type().as_str().to_string();
        let (options, items) = match spec.kind {
            ParameterKind::Enum { options } => (Some(options), None),
            ParameterKind::Array { items } => (None, items),
            _ => (None, None),
        };
        Self {
            key: spec.key,
            param_type,
            description: spec.description,
            required: spec.required,
            default: spec.default,
            options,
            items,
            validation: spec.rule,
        }
    }
}

/// Input/output declaration of one provider model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawModelSchema", into = "RawModelSchema")]
pub struct ModelSchema {
    name: String,
    id: String,
    input_schema: Vec<ParameterSpec>,
    output_schema: Vec<ParameterSpec>,
}

impl ModelSchema {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        input_schema: Vec<ParameterSpec>,
        output_schema: Vec<ParameterSpec>,
    ) -> Result<Self, SchemaError> {
        let schema = Self {
            name: name.into(),
            id: id.into(),
            input_schema,
            output_schema,
        };
        schema.check_unique_keys()?;
        Ok(schema)
    }

    /// Display label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provider model identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Input parameters in presentation and validation order
    pub fn input_schema(&self) -> &[ParameterSpec] {
        &self.input_schema
    }

    pub fn output_schema(&self) -> &[ParameterSpec] {
        &self.output_schema
    }

    pub fn input(&self, key: &str) -> Option<&ParameterSpec> {
        self.input_schema.iter().find(|p| p.key() == key)
    }

    fn check_unique_keys(&self) -> Result<(), SchemaError> {
        for params in [&self.input_schema, &self.output_schema] {
            let mut seen = HashSet::new();
            for param in params {
                if !seen.insert(param.key()) {
                    return Err(SchemaError::DuplicateKey {
                        schema: self.id.clone(),
                        key: param.key().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModelSchema {
    name: String,
    id: String,
    input_schema: Vec<ParameterSpec>,
    #[serde(default)]
    output_schema: Vec<ParameterSpec>,
}

impl TryFrom<RawModelSchema> for ModelSchema {
    type Error = SchemaError;

    fn try_from(raw: RawModelSchema) -> Result<Self, Self::Error> {
        ModelSchema::new(raw.name, raw.id, raw.input_schema, raw.output_schema)
    }
}

impl From<ModelSchema> for RawModelSchema {
    fn from(schema: ModelSchema) -> Self {
        Self {
            name: schema.name,
            id: schema.id,
            input_schema: schema.input_schema,
            output_schema: schema.output_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enum_requires_options() {
        let err = ParameterSpec::enumeration("format", Vec::<Value>::new())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::EmptyOptions {
                key: "format".into()
            }
        );
    }

    #[test]
    fn enum_default_must_be_an_option() {
        let err = ParameterSpec::enumeration("format", ["jpeg", "png"])
            .default("gif")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DefaultNotInOptions { .. }));

        let ok = ParameterSpec::enumeration("format", ["jpeg", "png"])
            .default("png")
            .build()
            .unwrap();
        assert_eq!(ok.default_value(), Some(&json!("png")));
        assert_eq!(ok.options().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn bounds_must_be_ordered() {
        let err = ParameterSpec::number("steps").range(50.0, 1.0).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvertedBounds { min, max, .. } if min == 50.0 && max == 1.0));
    }

    #[test]
    fn default_must_match_type() {
        let err = ParameterSpec::boolean("sync_mode")
            .default("yes")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DefaultTypeMismatch { .. }));
    }

    #[test]
    fn nested_property_bounds_are_checked() {
        let items = ItemSpec::objects([(
            "scale",
            PropertyDefinition::new(ParameterType::Number).with_range(2.0, 0.0),
        )]);
        let err = ParameterSpec::array("loras", items).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvertedBounds { key, .. } if key == "loras[].scale"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = ParameterSpec::string("prompt").pattern("(").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let a = ParameterSpec::string("prompt").build().unwrap();
        let b = ParameterSpec::string("prompt").build().unwrap();
        let err = ModelSchema::new("Dup", "x/dup", vec![a, b], vec![]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateKey { .. }));
    }

    #[test]
    fn json_form_goes_through_the_same_checks() {
        let ok: ParameterSpec = serde_json::from_value(json!({
            "key": "output_format",
            "type": "enum",
            "default": "jpeg",
            "options": ["jpeg", "png"]
        }))
        .unwrap();
        assert_eq!(ok.param_type(), ParameterType::Enum);

        let bad = serde_json::from_value::<ParameterSpec>(json!({
            "key": "output_format",
            "type": "enum",
            "default": "gif",
            "options": ["jpeg", "png"]
        }));
        assert!(bad.is_err());

        let bad_bounds = serde_json::from_value::<ParameterSpec>(json!({
            "key": "steps",
            "type": "number",
            "validation": { "min": 10, "max": 1 }
        }));
        assert!(bad_bounds.is_err());

        let err = serde_json::from_value::<ParameterSpec>(json!({"key": "mask", "type": "video"})).unwrap_err();
        assert!(err.to_string().contains("unknown type `video`"));
    }

    #[test]
    fn serializes_to_wire_shape() {
        let spec = ParameterSpec::number("num_inference_steps")
            .default(35)
            .range(1.0, 50.0)
            .build()
            .unwrap();
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({
                "key": "num_inference_steps",
                "type": "number",
                "default": 35,
                "validation": { "min": 1.0, "max": 50.0 }
            })
        );
    }

    #[test]
    fn accepts_matches_runtime_shape() {
        assert!(ParameterType::Image.accepts(&json!("https://x/y.png")));
        assert!(!ParameterType::Number.accepts(&json!("4")));
        assert!(ParameterType::Json.accepts(&json!(null)));
        assert_eq!(json_type_name(&json!([1])), "array");
    }
}
