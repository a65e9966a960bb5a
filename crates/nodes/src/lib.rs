//! Generator node implementation.
//!
//! A generator node is a single fan-out point in a workflow: one definition
//! that expands into one downstream invocation per enumerated item, or per
//! batch of items. This crate loads generator specs, builds and resolves
//! generator nodes, decides their batching mode, and renders the two code
//! fragments each node contributes to the generated workflow.
//!
//! ## Architectural Layer
//!
//! **Implementation layer.** Domain types, errors and capability ports come
//! from the [`pipeline`] crate; this crate adds the behaviour.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`schema`] | Parameter schema subset and instance validation |
//! | [`spec`] | [`GeneratorSpec`] |
//! | [`registry`] | [`SpecRegistry`], lazily populated spec cache |
//! | [`generator`] | [`GeneratorNode`] and property resolution |
//! | [`batching`] | Batching policy |
//! | [`helpers`] | Helper function library |
//! | [`render`] | [`TemplateLibrary`], preamble/operator rendering |
//! | [`preprocessors`] | Built-in property preprocessors |
//! | [`compile`] | [`Compiler`], the per-node driver |

pub mod batching;
pub mod compile;
pub mod generator;
pub mod helpers;
pub mod preprocessors;
pub mod registry;
pub mod render;
pub mod schema;
pub mod spec;

pub use batching::{Batching, BatchingConfig, BatchingDecision, Bindings};
pub use compile::Compiler;
pub use generator::{GeneratorNode, GeneratorNodeConfig, ResolvedProperties};
pub use helpers::{Blocklist, HelperFunction};
pub use preprocessors::builtin_capabilities;
pub use registry::SpecRegistry;
pub use render::{NodeFragments, RenderInputs, TemplateLibrary};
pub use spec::{GeneratorSpec, PreprocessorBinding};
