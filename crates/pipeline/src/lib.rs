//! Core domain for the generator compiler.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and error type used while compiling generator nodes. Implementation
//! crates build on the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Domain types + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a compilation needs (an [`ExecutionContext`], a
//! [`CapabilityLoader`]); the `nodes` crate defines *how* generator nodes use
//! them.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`NodeName`, `GeneratorType`, etc.) |
//! | [`types`] | Shared value types (`BatchSize`, `Resource`, `Timestamp`) |
//! | [`context`] | [`ExecutionContext`] |
//! | [`capabilities`] | Capability loader and preprocessor traits |
//! | [`errors`] | [`CompileError`] |

pub mod capabilities;
pub mod context;
pub mod errors;
pub mod identifiers;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use capabilities::{
    CapabilityLoader, CapabilityRegistry, PreprocessError, PropertyPreprocessor, UnknownCapability,
};
pub use context::ExecutionContext;
pub use errors::CompileError;
pub use identifiers::{
    is_code_identifier, CapabilityName, CompilationRunId, EmptyIdentifier, GeneratorType,
    NodeName, ResourceName, TargetName,
};
pub use types::{BatchSize, PropertyMap, Resource, Timestamp};
