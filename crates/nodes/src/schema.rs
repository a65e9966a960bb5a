//! Parameter schemas for generator instance properties.
//!
//! Generator specs describe their instance properties with a subset of JSON
//! Schema: `properties` (each with optional `type`, `items`, `default`),
//! `required`, and `additionalProperties`. Keywords outside that subset are
//! accepted and ignored, as JSON Schema prescribes for unknown keywords.

use std::collections::BTreeMap;

use pipeline::{is_code_identifier, CompileError, PropertyMap};
use serde::Deserialize;
use serde_json::Value;

/// The primitive types a property schema can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl JsonType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Null => value.is_null(),
        }
    }

    fn of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_f64() => "number",
            Value::Number(_) => "integer",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum TypeKeyword {
    One(JsonType),
    Many(Vec<JsonType>),
}

/// Schema of a single property value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    type_keyword: Option<TypeKeyword>,

    /// Schema every array element must satisfy.
    #[serde(default)]
    items: Option<Box<PropertySchema>>,

    /// Value used when an instance does not set this property.
    #[serde(default)]
    default: Option<Value>,
}

impl PropertySchema {
    /// Declared default, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn allowed_types(&self) -> &[JsonType] {
        match &self.type_keyword {
            None => &[],
            Some(TypeKeyword::One(t)) => std::slice::from_ref(t),
            Some(TypeKeyword::Many(ts)) => ts,
        }
    }

    fn check(&self, node: &str, path: &str, value: &Value) -> Result<(), CompileError> {
        let allowed = self.allowed_types();
        if !allowed.is_empty() && !allowed.iter().any(|t| t.matches(value)) {
            let expected = allowed
                .iter()
                .map(JsonType::to_string)
                .collect::<Vec<_>>()
                .join(" or ");
            return Err(CompileError::schema(
                node,
                path,
                format!("expected {expected}, found {}", JsonType::of(value)),
            ));
        }

        if let (Some(items), Value::Array(elements)) = (&self.items, value) {
            for (index, element) in elements.iter().enumerate() {
                items.check(node, &format!("{path}[{index}]"), element)?;
            }
        }
        Ok(())
    }
}

/// The `parameters_jsonschema` block of a generator spec.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParameterSchema {
    #[serde(default)]
    properties: BTreeMap<String, PropertySchema>,

    #[serde(default)]
    required: Vec<String>,

    #[serde(rename = "additionalProperties", default = "default_true")]
    additional_properties: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: true,
        }
    }
}

impl ParameterSchema {
    /// Checks the schema itself. `spec` names the generator type for errors.
    ///
    /// Property names become keyword arguments in emitted code, so every
    /// declared property must be a code identifier; declared defaults must
    /// satisfy their own property schema.
    pub fn validate(&self, spec: &str) -> Result<(), CompileError> {
        for (key, property) in &self.properties {
            let path = format!("parameters_jsonschema.properties.{key}");
            if !is_code_identifier(key) {
                return Err(CompileError::schema(
                    spec,
                    path,
                    "property names must be valid identifiers",
                ));
            }
            if let Some(default) = &property.default {
                property.check(spec, &format!("{path}.default"), default)?;
            }
        }
        Ok(())
    }

    /// Declared property schemas, ordered by name.
    pub fn properties(&self) -> &BTreeMap<String, PropertySchema> {
        &self.properties
    }

    /// Names every valid instance must set.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Whether keys not listed in `properties` are accepted.
    pub fn allows_additional_properties(&self) -> bool {
        self.additional_properties
    }

    /// Returns `true` if `key` is declared in `properties`.
    pub fn declares(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Declared defaults, ordered by property name.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties
            .iter()
            .filter_map(|(key, property)| property.default_value().map(|v| (key.as_str(), v)))
    }

    /// Validates instance `properties` of node `node`.
    ///
    /// Unknown keys are rejected when additional properties are disallowed,
    /// declared types are enforced, and every required key must be present.
    pub fn validate_instance(&self, node: &str, properties: &PropertyMap) -> Result<(), CompileError> {
        for (key, value) in properties {
            let path = format!("properties.{key}");
            match self.properties.get(key) {
                Some(property) => property.check(node, &path, value)?,
                None if self.additional_properties => {}
                None => {
                    return Err(CompileError::schema(
                        node,
                        path,
                        "unknown property (additional properties are not allowed)",
                    ))
                }
            }
        }

        if let Some(missing) = self.required.iter().find(|key| !properties.contains_key(*key)) {
            return Err(CompileError::schema(
                node,
                format!("properties.{missing}"),
                "required property is missing",
            ));
        }
        Ok(())
    }
}
