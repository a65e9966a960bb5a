//! Batching policy.
//!
//! Decides whether a generator expands once per item or once per group of
//! items, and which names the emitted code binds in each mode. Everything
//! here is pure: no I/O and no logging.

use pipeline::{BatchSize, CompileError};
use serde::{Deserialize, Serialize};

/// Batch-name body used when a spec defines no `batch_name_builder_code`:
/// the zero-based group index, prefixed so it reads as a name.
pub const FALLBACK_BATCH_NAME_BUILDER_CODE: &str = "return 'batch_{}'.format(index)";

/// `batching` block of a node instance, as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchingConfig {
    #[serde(default)]
    pub batch_size: Option<i64>,
    #[serde(default)]
    pub disabled: bool,
}

/// Validated batching options of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batching {
    batch_size: Option<BatchSize>,
    disabled: bool,
}

impl Batching {
    /// Validates `config` for node `node`. A present `batch_size` must be
    /// strictly positive, even when batching is disabled.
    pub fn from_config(node: &str, config: &BatchingConfig) -> Result<Self, CompileError> {
        let batch_size = match config.batch_size {
            None => None,
            Some(size) => Some(
                usize::try_from(size)
                    .ok()
                    .and_then(BatchSize::new)
                    .ok_or_else(|| {
                        CompileError::schema(
                            node,
                            "batching.batch_size",
                            format!("batch size must be a positive integer, got {size}"),
                        )
                    })?,
            ),
        };
        Ok(Self {
            batch_size,
            disabled: config.disabled,
        })
    }

}

/// Variable names the emitted code binds for each downstream invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bindings {
    /// Name of the value argument (`item` or `items`).
    pub value: &'static str,
    /// Name of the name argument (`item_name` or `batch_name`).
    pub name: &'static str,
}

/// How a generator node expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchingDecision {
    /// One downstream invocation per item.
    Unbatched,
    /// One downstream invocation per consecutive group of at most
    /// `batch_size` items.
    Batched { batch_size: BatchSize },
}

impl BatchingDecision {
    /// Batched iff options are present, a size is set, and batching is not
    /// disabled. Anything else is unbatched.
    pub fn decide(batching: Option<&Batching>) -> Self {
        match batching {
            Some(Batching {
                batch_size: Some(batch_size),
                disabled: false,
            }) => Self::Batched {
                batch_size: *batch_size,
            },
            _ => Self::Unbatched,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Batched { .. })
    }

    /// Effective batch size; `None` when unbatched.
    pub fn batch_size(&self) -> Option<BatchSize> {
        match self {
            Self::Batched { batch_size } => Some(*batch_size),
            Self::Unbatched => None,
        }
    }

    /// The argument pair the preamble declares and the operator passes to
    /// the target builder in this mode.
    pub fn bindings(&self) -> Bindings {
        match self {
            Self::Unbatched => Bindings {
                value: "item",
                name: "item_name",
            },
            Self::Batched { .. } => Bindings {
                value: "items",
                name: "batch_name",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batching(batch_size: Option<i64>, disabled: bool) -> Batching {
        Batching::from_config(
            "test_generator",
            &BatchingConfig {
                batch_size,
                disabled,
            },
        )
        .unwrap()
    }

    #[test]
    fn enabled_with_size_and_not_disabled() {
        let decision = BatchingDecision::decide(Some(&batching(Some(3), false)));
        assert!(decision.is_enabled());
        assert_eq!(decision.batch_size().map(BatchSize::get), Some(3));
    }

    #[test]
    fn disabled_wins_over_batch_size() {
        let decision = BatchingDecision::decide(Some(&batching(Some(3), true)));
        assert_eq!(decision, BatchingDecision::Unbatched);
        assert!(decision.batch_size().is_none());
    }

    #[test]
    fn absent_config_or_size_is_unbatched() {
        assert!(!BatchingDecision::decide(None).is_enabled());
        assert!(!BatchingDecision::decide(Some(&batching(None, false))).is_enabled());
    }

    #[test]
    fn non_positive_sizes_are_rejected() {
        for size in [0, -2] {
            let err = Batching::from_config(
                "test_generator",
                &BatchingConfig {
                    batch_size: Some(size),
                    disabled: true,
                },
            )
            .unwrap_err();
            assert!(matches!(
                err,
                CompileError::SchemaValidation { ref path, .. } if path == "batching.batch_size"
            ));
        }
    }

    #[test]
    fn bindings_follow_the_mode() {
        assert_eq!(BatchingDecision::Unbatched.bindings().value, "item");
        let batched = BatchingDecision::decide(Some(&batching(Some(2), false)));
        assert_eq!(batched.bindings().name, "batch_name");
    }
}
