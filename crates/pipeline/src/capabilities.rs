//! Capability port traits.
//!
//! A capability is a named, value-producing object that node properties can
//! refer to. The only kind the generator compiler needs is a
//! [`PropertyPreprocessor`], which rewrites one property value during
//! resolution.
//!
//! Lookup goes through [`CapabilityLoader`]: a single-method trait that maps a
//! name to a capability and fails explicitly on unknown names. Callers own the
//! loader and inject it, so tests can resolve nodes against an isolated set of
//! capabilities.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::{CapabilityName, PropertyMap};

/// A preprocessor rejected its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PreprocessError(pub String);

/// A capability lookup named something the loader does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown capability '{0}'")]
pub struct UnknownCapability(pub CapabilityName);

/// Rewrites a single property value during resolution.
///
/// Implementations must be deterministic: the same value and arguments always
/// produce the same output.
pub trait PropertyPreprocessor: Send + Sync {
    /// Transforms `value`. `arguments` carries the per-binding configuration
    /// declared next to the preprocessor in the generator spec.
    fn process(
        &self,
        value: &serde_json::Value,
        arguments: &PropertyMap,
    ) -> Result<serde_json::Value, PreprocessError>;
}

/// Maps a capability name to the capability registered under it.
pub trait CapabilityLoader {
    /// Returns the preprocessor registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownCapability`] if nothing is registered under `name`.
    /// Implementations must never substitute a stand-in.
    fn resolve(&self, name: &CapabilityName)
        -> Result<Arc<dyn PropertyPreprocessor>, UnknownCapability>;
}

/// In-memory [`CapabilityLoader`] backed by a name → preprocessor map.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    preprocessors: HashMap<CapabilityName, Arc<dyn PropertyPreprocessor>>,
}

impl CapabilityRegistry {
    /// Creates an empty registry. Resolving any name against it fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `preprocessor` under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: CapabilityName,
        preprocessor: Arc<dyn PropertyPreprocessor>,
    ) -> &mut Self {
        tracing::debug!(capability = %name, "registered property preprocessor");
        self.preprocessors.insert(name, preprocessor);
        self
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&CapabilityName> {
        let mut names: Vec<_> = self.preprocessors.keys().collect();
        names.sort();
        names
    }
}

impl CapabilityLoader for CapabilityRegistry {
    fn resolve(
        &self,
        name: &CapabilityName,
    ) -> Result<Arc<dyn PropertyPreprocessor>, UnknownCapability> {
        self.preprocessors
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownCapability(name.clone()))
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("preprocessors", &self.names())
            .finish()
    }
}
