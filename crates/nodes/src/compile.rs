//! Single-node compilation: instantiate, resolve, render.

use pipeline::{CapabilityLoader, CompileError, ExecutionContext, PropertyMap};

use crate::generator::GeneratorNodeConfig;
use crate::registry::SpecRegistry;
use crate::render::{NodeFragments, RenderInputs, TemplateLibrary};

/// Everything a generator compilation reads but does not own.
///
/// The graph builder creates one of these per run and compiles nodes in
/// dependency order. Nothing here is mutated by compilation apart from the
/// lazily filled spec and template caches.
pub struct Compiler<'a> {
    pub specs: &'a SpecRegistry,
    pub templates: &'a TemplateLibrary,
    pub capabilities: &'a dyn CapabilityLoader,
    pub default_task_args: &'a PropertyMap,
}

impl Compiler<'_> {
    /// Builds the node described by `config`, resolves it against `context`,
    /// and renders its preamble and operator fragments.
    ///
    /// Fails fast: the first error is returned and no fragment is produced.
    pub fn compile(
        &self,
        config: GeneratorNodeConfig,
        context: &ExecutionContext,
        inputs: &RenderInputs,
    ) -> Result<NodeFragments, CompileError> {
        let span = tracing::info_span!(
            "compile_generator",
            node = %config.name,
            generator_type = %config.generator_type,
        );
        let _enter = span.enter();

        let mut node = self.specs.instantiate(config)?;
        node.resolve_properties(context, self.default_task_args, self.capabilities)?;
        let fragments = self.templates.render_fragments(&node, inputs)?;

        tracing::info!(
            batching_enabled = node.batching_enabled(),
            preamble_bytes = fragments.preamble.len(),
            operator_bytes = fragments.operator.len(),
            "generator compiled"
        );
        Ok(fragments)
    }
}
