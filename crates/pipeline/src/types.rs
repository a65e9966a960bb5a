//! Shared value types for the generator compiler domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. batch sizes are strictly positive)
//! and participate in domain computations.

use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered property mapping, as written in node instances and produced by
/// resolution.
///
/// `serde_json::Map` is ordered by key, which keeps emitted code stable across
/// runs.
pub type PropertyMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Batching
// ---------------------------------------------------------------------------

/// Maximum number of items handed to one downstream invocation when a
/// generator runs in batched mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    /// Creates a [`BatchSize`], returning `None` if `size` is zero.
    #[must_use]
    pub fn new(size: usize) -> Option<Self> {
        NonZeroUsize::new(size).map(Self)
    }

    /// Returns the size as a plain integer (always `>= 1`).
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl std::fmt::Display for BatchSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A resource bound into an execution context (e.g. a compute cluster the
/// generated tasks run on).
///
/// The compiler only checks presence; the resource's own properties are
/// carried through for collaborators that need them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource type name as registered with the workflow tool.
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Resource configuration.
    #[serde(default)]
    pub properties: PropertyMap,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(BatchSize::new(0).is_none());
        assert_eq!(BatchSize::new(3).unwrap().get(), 3);
    }

    #[test]
    fn resource_reads_type_key() {
        let resource: Resource =
            serde_json::from_str(r#"{"type": "dataproc_cluster", "properties": {"zone": "a"}}"#)
                .unwrap();
        assert_eq!(resource.resource_type, "dataproc_cluster");
        assert_eq!(resource.properties["zone"], "a");
    }
}
