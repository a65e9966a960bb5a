//! Top-level error type for generator compilation.
//!
//! [`CompileError`] covers every condition that aborts compilation of a node.
//! None of them are recoverable locally: the caller aborts the whole run and
//! no partial artifact is emitted.
//!
//! Every variant names the node (or, for spec loading, the generator type)
//! that failed and, where applicable, the offending property path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort compilation of a generator node.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum CompileError {
    /// A generator spec or node instance does not satisfy its schema.
    ///
    /// Produced by: spec loading, node construction, and the identifier check
    /// at the end of resolution.
    #[error("Schema validation failed for '{node}' at '{path}': {message}")]
    SchemaValidation {
        /// Node name (or generator type name when validating a spec).
        node: String,
        /// Dotted path of the offending value (e.g. `properties.items[2]`).
        path: String,
        /// Description of the violated constraint.
        message: String,
    },

    /// A resource named in `requires_resources` is not bound in the execution
    /// context.
    #[error("Node '{node}' requires resource '{resource}', which is not available in this context")]
    MissingResource {
        /// Node being resolved.
        node: String,
        /// The missing resource name.
        resource: String,
    },

    /// A property refers to a capability name that the loader does not know.
    #[error("Node '{node}' references unknown capability '{capability}'")]
    CapabilityNotFound {
        /// Node being resolved.
        node: String,
        /// The unregistered capability name.
        capability: String,
    },

    /// A registered capability rejected the property value it was given.
    #[error("Capability '{capability}' rejected '{path}' of node '{node}': {message}")]
    PreprocessorFailed {
        /// Node being resolved.
        node: String,
        /// Capability that failed.
        capability: String,
        /// Property path that was being processed.
        path: String,
        /// Description from the capability.
        message: String,
    },

    /// `resolve_properties` was invoked on a node that is already resolved.
    #[error("Properties of node '{node}' have already been resolved")]
    DuplicateResolution {
        /// Node that was resolved twice.
        node: String,
    },

    /// A template could not be rendered for a node, typically because it
    /// references an attribute the node does not expose (yet).
    #[error("Rendering template '{template}' for node '{node}' failed: {message}")]
    TemplateRender {
        /// Node being rendered.
        node: String,
        /// Template name (e.g. `generator_operator.j2`).
        template: String,
        /// Engine error description.
        message: String,
    },

    /// A node names a generator type for which no spec is registered.
    #[error("Node '{node}' has unknown generator type '{generator_type}'")]
    UnknownGeneratorType {
        /// Node being constructed.
        node: String,
        /// The unregistered type name.
        generator_type: String,
    },

    /// A generator spec file exists but could not be read or parsed.
    #[error("Generator spec '{spec}' could not be loaded: {message}")]
    SpecLoad {
        /// Generator type name being loaded.
        spec: String,
        /// I/O or parse error description.
        message: String,
    },
}

impl CompileError {
    /// Shorthand for [`CompileError::SchemaValidation`].
    pub fn schema(
        node: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::SchemaValidation {
            node: node.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_node_and_path() {
        let err = CompileError::schema("test_generator", "properties.items[2]", "expected string");
        let message = err.to_string();
        assert!(message.contains("test_generator"));
        assert!(message.contains("properties.items[2]"));
    }

    #[test]
    fn missing_resource_names_the_resource() {
        let err = CompileError::MissingResource {
            node: "do_snapshot_copiers".into(),
            resource: "dataproc-cluster".into(),
        };
        assert!(err.to_string().contains("'dataproc-cluster'"));
    }
}
