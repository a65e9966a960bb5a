//! Generator specifications.
//!
//! A [`GeneratorSpec`] defines a generator *type*: the code that enumerates
//! items, the code that names an item, optionally the code that names a
//! batch, and the schema instance properties must satisfy. Specs are loaded
//! once (see [`crate::SpecRegistry`]), shared behind an `Arc`, and never
//! mutated.

use pipeline::{CapabilityName, CompileError, GeneratorType, PropertyMap};
use serde::Deserialize;

use crate::schema::ParameterSchema;

/// Applies the capability named `capability` to each listed property during
/// resolution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreprocessorBinding {
    /// Capability to look up through the node's [`pipeline::CapabilityLoader`].
    #[serde(rename = "type")]
    pub capability: CapabilityName,

    /// Properties whose resolved values are passed through the capability.
    pub properties: Vec<String>,

    /// Per-binding configuration handed to the capability.
    #[serde(default)]
    pub arguments: PropertyMap,
}

/// Immutable definition of a generator type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSpec {
    name: GeneratorType,
    iterator_builder_method_code: String,
    item_name_builder_code: String,
    #[serde(default)]
    batch_name_builder_code: Option<String>,
    #[serde(default)]
    parameters_jsonschema: ParameterSchema,
    #[serde(default)]
    property_preprocessors: Vec<PreprocessorBinding>,
}

impl GeneratorSpec {
    /// Parses and validates a spec from YAML.
    ///
    /// `label` identifies the source (type name or file path) in errors raised
    /// before the spec's own name is known.
    pub fn from_yaml(label: &str, source: &str) -> Result<Self, CompileError> {
        let spec: Self = serde_yaml::from_str(source).map_err(|err| CompileError::SpecLoad {
            spec: label.to_string(),
            message: err.to_string(),
        })?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), CompileError> {
        let name = self.name.as_str();

        for (field, code) in [
            ("iterator_builder_method_code", &self.iterator_builder_method_code),
            ("item_name_builder_code", &self.item_name_builder_code),
        ] {
            if code.trim().is_empty() {
                return Err(CompileError::schema(name, field, "code must not be empty"));
            }
        }
        if self
            .batch_name_builder_code
            .as_deref()
            .is_some_and(|code| code.trim().is_empty())
        {
            return Err(CompileError::schema(
                name,
                "batch_name_builder_code",
                "code must not be empty when present",
            ));
        }

        self.parameters_jsonschema.validate(name)?;

        for (index, binding) in self.property_preprocessors.iter().enumerate() {
            for property in &binding.properties {
                if !self.parameters_jsonschema.allows_additional_properties()
                    && !self.parameters_jsonschema.declares(property)
                {
                    return Err(CompileError::schema(
                        name,
                        format!("property_preprocessors[{index}].properties"),
                        format!("'{property}' is not a declared parameter"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Registered type name.
    pub fn name(&self) -> &GeneratorType {
        &self.name
    }

    /// Body of the function returning the sequence to expand over. The
    /// resolved properties are in scope as parameters.
    pub fn iterator_builder_method_code(&self) -> &str {
        &self.iterator_builder_method_code
    }

    /// Body of the function naming one item; `index` and `item` are in scope.
    pub fn item_name_builder_code(&self) -> &str {
        &self.item_name_builder_code
    }

    /// Body of the function naming one batch; `index` and `items` are in
    /// scope. `None` when the spec relies on the fallback batch name.
    pub fn batch_name_builder_code(&self) -> Option<&str> {
        self.batch_name_builder_code.as_deref()
    }

    /// Schema instance properties must satisfy.
    pub fn parameters(&self) -> &ParameterSchema {
        &self.parameters_jsonschema
    }

    /// Capabilities applied to properties during resolution, in declaration
    /// order.
    pub fn property_preprocessors(&self) -> &[PreprocessorBinding] {
        &self.property_preprocessors
    }
}
