//! Generator nodes.
//!
//! A [`GeneratorNode`] is one use of a generator type in a workflow graph: a
//! shared [`GeneratorSpec`] plus per-use configuration. Construction
//! validates the configuration against the spec; [`GeneratorNode::resolve_properties`]
//! then computes the node's final property mapping exactly once. After that
//! the node is read-only and can be rendered.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use pipeline::{
    is_code_identifier, CapabilityLoader, CompileError, ExecutionContext, GeneratorType, NodeName,
    PropertyMap, ResourceName, TargetName,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::batching::{Batching, BatchingConfig, BatchingDecision};
use crate::helpers::Blocklist;
use crate::spec::GeneratorSpec;

/// A generator node instance, as written in a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorNodeConfig {
    /// Node name, unique in the graph.
    pub name: NodeName,

    /// Registered generator type.
    #[serde(rename = "type")]
    pub generator_type: GeneratorType,

    /// Downstream builder invoked per item or batch.
    pub target: TargetName,

    /// Resources that must be bound in the execution context.
    #[serde(default)]
    pub requires_resources: Vec<ResourceName>,

    /// Instance properties, validated against the spec's parameter schema.
    #[serde(default)]
    pub properties: PropertyMap,

    /// Batching options; absent means unbatched.
    #[serde(default)]
    pub batching: Option<BatchingConfig>,

    /// Patterns; items whose names match one are skipped.
    #[serde(default)]
    pub regex_blocklist: Vec<String>,
}

impl GeneratorNodeConfig {
    /// Parses a node instance from YAML. `label` names the source in errors.
    pub fn from_yaml(label: &str, source: &str) -> Result<Self, CompileError> {
        serde_yaml::from_str(source)
            .map_err(|err| CompileError::schema(label, "(document)", err.to_string()))
    }
}

/// The final, schema-complete property mapping of a resolved node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedProperties {
    values: PropertyMap,
}

impl ResolvedProperties {
    /// All resolved values, ordered by key.
    pub fn values(&self) -> &PropertyMap {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// One generator instance in a workflow graph.
#[derive(Debug, Clone)]
pub struct GeneratorNode {
    spec: Arc<GeneratorSpec>,
    name: NodeName,
    target: TargetName,
    requires_resources: BTreeSet<ResourceName>,
    properties: PropertyMap,
    batching: Option<Batching>,
    blocklist: Blocklist,
    resolved: Option<ResolvedProperties>,
}

impl GeneratorNode {
    /// Builds a node of type `spec` from its instance configuration.
    ///
    /// # Errors
    ///
    /// [`CompileError::SchemaValidation`] when the config names a different
    /// type, `name` or `target` is not a code identifier, properties violate
    /// the parameter schema, `batch_size` is not positive, or a blocklist
    /// pattern does not compile.
    pub fn new(spec: Arc<GeneratorSpec>, config: GeneratorNodeConfig) -> Result<Self, CompileError> {
        let node = config.name.as_str();

        if config.generator_type != *spec.name() {
            return Err(CompileError::schema(
                node,
                "type",
                format!(
                    "node is of type '{}' but was built from spec '{}'",
                    config.generator_type,
                    spec.name()
                ),
            ));
        }
        for (field, value) in [("name", node), ("target", config.target.as_str())] {
            if !is_code_identifier(value) {
                return Err(CompileError::schema(
                    node,
                    field,
                    format!("'{value}' is not a valid identifier"),
                ));
            }
        }

        spec.parameters().validate_instance(node, &config.properties)?;

        let batching = config
            .batching
            .as_ref()
            .map(|batching| Batching::from_config(node, batching))
            .transpose()?;

        let blocklist = Blocklist::new(&config.regex_blocklist).map_err(|(index, err)| {
            CompileError::schema(node, format!("regex_blocklist[{index}]"), err.to_string())
        })?;

        tracing::debug!(
            node,
            generator_type = %spec.name(),
            batching_enabled = BatchingDecision::decide(batching.as_ref()).is_enabled(),
            "generator node constructed"
        );

        Ok(Self {
            spec,
            name: config.name,
            target: config.target,
            requires_resources: config.requires_resources.into_iter().collect(),
            properties: config.properties,
            batching,
            blocklist,
            resolved: None,
        })
    }

    pub fn name(&self) -> &NodeName {
        &self.name
    }

    pub fn generator_type(&self) -> &GeneratorType {
        self.spec.name()
    }

    pub fn target(&self) -> &TargetName {
        &self.target
    }

    pub fn spec(&self) -> &GeneratorSpec {
        &self.spec
    }

    pub fn requires_resources(&self) -> &BTreeSet<ResourceName> {
        &self.requires_resources
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    /// Expansion mode derived from the batching options.
    pub fn batching_decision(&self) -> BatchingDecision {
        BatchingDecision::decide(self.batching.as_ref())
    }

    /// `true` iff batching options are present, `batch_size` is set, and
    /// `disabled` is not `true`.
    pub fn batching_enabled(&self) -> bool {
        self.batching_decision().is_enabled()
    }

    /// Resolved properties, once [`Self::resolve_properties`] has succeeded.
    pub fn resolved_properties(&self) -> Option<&ResolvedProperties> {
        self.resolved.as_ref()
    }

    /// Computes the node's final property mapping.
    ///
    /// Layers, lowest precedence first: `default_task_args` (only keys the
    /// schema declares when it is closed), schema defaults, then the
    /// instance's explicit properties. Property preprocessors declared by the
    /// spec are then applied through `capabilities`, and every required
    /// resource must be bound in `context`.
    ///
    /// Must be called exactly once. Nothing but the node's resolved state is
    /// modified, and only on success.
    ///
    /// # Errors
    ///
    /// - [`CompileError::DuplicateResolution`] on a second call.
    /// - [`CompileError::CapabilityNotFound`] for an unregistered preprocessor.
    /// - [`CompileError::PreprocessorFailed`] when a preprocessor rejects a value.
    /// - [`CompileError::MissingResource`] naming the first unbound resource.
    /// - [`CompileError::SchemaValidation`] when a resolved key cannot be
    ///   passed as a keyword argument.
    #[tracing::instrument(level = "debug", skip_all, fields(node = %self.name))]
    pub fn resolve_properties(
        &mut self,
        context: &ExecutionContext,
        default_task_args: &PropertyMap,
        capabilities: &dyn CapabilityLoader,
    ) -> Result<&ResolvedProperties, CompileError> {
        let node = self.name.as_str();
        if self.resolved.is_some() {
            return Err(CompileError::DuplicateResolution {
                node: node.to_string(),
            });
        }

        let schema = self.spec.parameters();

        let mut values: BTreeMap<String, Value> = default_task_args
            .iter()
            .filter(|(key, _)| schema.allows_additional_properties() || schema.declares(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (key, default) in schema.defaults() {
            values.insert(key.to_string(), default.clone());
        }
        for (key, value) in &self.properties {
            values.insert(key.clone(), value.clone());
        }

        for binding in self.spec.property_preprocessors() {
            let preprocessor = capabilities.resolve(&binding.capability).map_err(|err| {
                CompileError::CapabilityNotFound {
                    node: node.to_string(),
                    capability: err.0.to_string(),
                }
            })?;
            for property in &binding.properties {
                let Some(value) = values.get_mut(property) else {
                    continue;
                };
                *value = preprocessor.process(value, &binding.arguments).map_err(|err| {
                    CompileError::PreprocessorFailed {
                        node: node.to_string(),
                        capability: binding.capability.to_string(),
                        path: format!("properties.{property}"),
                        message: err.0,
                    }
                })?;
                tracing::debug!(capability = %binding.capability, property, "applied preprocessor");
            }
        }

        if let Some(missing) = self
            .requires_resources
            .iter()
            .find(|resource| context.resource(resource.as_str()).is_none())
        {
            return Err(CompileError::MissingResource {
                node: node.to_string(),
                resource: missing.to_string(),
            });
        }

        if let Some(key) = values.keys().find(|key| !is_code_identifier(key)) {
            return Err(CompileError::schema(
                node,
                format!("properties.{key}"),
                "resolved property names must be valid identifiers",
            ));
        }

        tracing::debug!(
            referrer = context.referrer().map(NodeName::as_str),
            keys = values.len(),
            "properties resolved"
        );
        Ok(&*self.resolved.insert(ResolvedProperties {
            values: values.into_iter().collect(),
        }))
    }
}
