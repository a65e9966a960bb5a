//! The execution context a node is resolved against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{NodeName, Resource, ResourceName};

/// Immutable bundle of the referring node (if any) and the resources bound in
/// the scope where a node is being compiled.
///
/// The referrer is held by name only; the context never owns upstream nodes.
/// A context is read-only for the duration of one resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    referrer: Option<NodeName>,
    resources: BTreeMap<ResourceName, Resource>,
}

impl ExecutionContext {
    /// Creates a context from its parts.
    pub fn new(referrer: Option<NodeName>, resources: BTreeMap<ResourceName, Resource>) -> Self {
        Self {
            referrer,
            resources,
        }
    }

    /// Returns a copy of this context with one more resource bound.
    #[must_use]
    pub fn with_resource(mut self, name: ResourceName, resource: Resource) -> Self {
        self.resources.insert(name, resource);
        self
    }

    /// The node that referred to the one being resolved, if any.
    pub fn referrer(&self) -> Option<&NodeName> {
        self.referrer.as_ref()
    }

    /// Looks up a bound resource by name.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// All bound resources, ordered by name.
    pub fn resources(&self) -> &BTreeMap<ResourceName, Resource> {
        &self.resources
    }
}
