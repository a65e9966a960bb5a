//! Fragment rendering.
//!
//! A generator node produces two text fragments:
//!
//! - the **preamble** (`generator_preamble.j2`): the signature of the
//!   `{target}_builder` function, binding `item, item_name` or
//!   `items, batch_name` depending on the batching mode;
//! - the **operator** (`generator_operator.j2`): the item-name builder, the
//!   batch-name builder and helper library when batching, and the loop that
//!   invokes `{target}_builder` once per item or batch.
//!
//! Templates are rendered with minijinja in strict-undefined mode, so a
//! template that touches an attribute the node does not expose fails with
//! [`CompileError::TemplateRender`] instead of emitting partial code.
//! Built-in templates are embedded; a template directory can shadow them by
//! file name. Either way templates are loaded lazily and cached by the engine.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use minijinja::{context, AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use pipeline::{CompileError, PropertyMap};
use serde::Serialize;
use serde_json::Value;

use crate::batching::{Bindings, FALLBACK_BATCH_NAME_BUILDER_CODE};
use crate::generator::GeneratorNode;
use crate::helpers::helper_views;

/// Template producing the preamble fragment.
pub const PREAMBLE_TEMPLATE: &str = "generator_preamble.j2";

/// Template producing the operator fragment.
pub const OPERATOR_TEMPLATE: &str = "generator_operator.j2";

const BUILTIN_TEMPLATES: [(&str, &str); 2] = [
    (
        PREAMBLE_TEMPLATE,
        include_str!("../templates/generator_preamble.j2"),
    ),
    (
        OPERATOR_TEMPLATE,
        include_str!("../templates/generator_operator.j2"),
    ),
];

/// Render variables supplied alongside the node.
///
/// None of these are part of the node's own state; the graph builder threads
/// them through from its view of the surrounding workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderInputs {
    /// Display name of the operator the generator becomes.
    pub operator_name: String,
    /// Names of tasks the expanded tasks depend on.
    pub upstream_dependencies: Vec<String>,
    /// Names of tasks depending on the expanded tasks.
    pub downstream_dependencies: Vec<String>,
}

/// The two fragments of one generator node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFragments {
    pub preamble: String,
    pub operator: String,
}

/// What templates see as `node`.
#[derive(Debug, Serialize)]
struct NodeView<'a> {
    name: &'a str,
    generator_type: &'a str,
    target: &'a str,
    batching_enabled: bool,
    batch_size: Option<usize>,
    bindings: Bindings,
    iterator_builder_method_code: &'a str,
    item_name_builder_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_name_builder_code: Option<&'a str>,
    regex_blocklist: Vec<&'a str>,
    requires_resources: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_properties: Option<&'a PropertyMap>,
}

impl<'a> NodeView<'a> {
    fn of(node: &'a GeneratorNode) -> Self {
        let decision = node.batching_decision();
        let spec = node.spec();
        Self {
            name: node.name().as_str(),
            generator_type: node.generator_type().as_str(),
            target: node.target().as_str(),
            batching_enabled: decision.is_enabled(),
            batch_size: decision.batch_size().map(|size| size.get()),
            bindings: decision.bindings(),
            iterator_builder_method_code: spec.iterator_builder_method_code(),
            item_name_builder_code: spec.item_name_builder_code(),
            batch_name_builder_code: decision.is_enabled().then(|| {
                spec.batch_name_builder_code()
                    .unwrap_or(FALLBACK_BATCH_NAME_BUILDER_CODE)
            }),
            regex_blocklist: node.blocklist().patterns(),
            requires_resources: node.requires_resources().iter().map(|r| r.as_str()).collect(),
            resolved_properties: node.resolved_properties().map(|resolved| resolved.values()),
        }
    }
}

/// The preamble and operator templates plus the engine that renders them.
#[derive(Debug)]
pub struct TemplateLibrary {
    env: Environment<'static>,
}

impl TemplateLibrary {
    /// Library using only the embedded templates.
    pub fn builtin() -> Self {
        Self::build(None)
    }

    /// Library where files in `dir` shadow embedded templates of the same name.
    pub fn with_override_dir(dir: PathBuf) -> Self {
        Self::build(Some(dir))
    }

    fn build(dir: Option<PathBuf>) -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_filter("pyrepr", pyrepr);
        env.set_loader(move |name| load_template(dir.as_deref(), name));
        Self { env }
    }

    /// Renders the preamble fragment. Does not require resolved properties.
    pub fn render_preamble(
        &self,
        node: &GeneratorNode,
        inputs: &RenderInputs,
    ) -> Result<String, CompileError> {
        self.render(PREAMBLE_TEMPLATE, node, inputs)
    }

    /// Renders the operator fragment.
    ///
    /// # Errors
    ///
    /// [`CompileError::TemplateRender`] if the node has not been resolved:
    /// the operator passes resolved properties to the iterator builder.
    pub fn render_operator(
        &self,
        node: &GeneratorNode,
        inputs: &RenderInputs,
    ) -> Result<String, CompileError> {
        if node.resolved_properties().is_none() {
            return Err(CompileError::TemplateRender {
                node: node.name().to_string(),
                template: OPERATOR_TEMPLATE.to_string(),
                message: "attribute 'resolved_properties' is only exposed after properties are resolved"
                    .to_string(),
            });
        }
        self.render(OPERATOR_TEMPLATE, node, inputs)
    }

    /// Renders the preamble, then the operator.
    pub fn render_fragments(
        &self,
        node: &GeneratorNode,
        inputs: &RenderInputs,
    ) -> Result<NodeFragments, CompileError> {
        let preamble = self.render_preamble(node, inputs)?;
        let operator = self.render_operator(node, inputs)?;
        Ok(NodeFragments { preamble, operator })
    }

    fn render(
        &self,
        template: &str,
        node: &GeneratorNode,
        inputs: &RenderInputs,
    ) -> Result<String, CompileError> {
        let render_error = |err: minijinja::Error| CompileError::TemplateRender {
            node: node.name().to_string(),
            template: template.to_string(),
            message: err.to_string(),
        };

        let rendered = self
            .env
            .get_template(template)
            .and_then(|tmpl| {
                tmpl.render(context! {
                    node => NodeView::of(node),
                    generator_operator_name => inputs.operator_name,
                    upstream_dependencies => inputs.upstream_dependencies,
                    downstream_dependencies => inputs.downstream_dependencies,
                    helpers => helper_views(),
                })
            })
            .map_err(render_error)?;

        tracing::debug!(node = %node.name(), template, bytes = rendered.len(), "rendered fragment");
        Ok(rendered)
    }
}

fn load_template(dir: Option<&Path>, name: &str) -> Result<Option<String>, minijinja::Error> {
    if let Some(dir) = dir {
        if !name.contains(['/', '\\']) && name != ".." {
            let path = dir.join(name);
            if path.is_file() {
                return std::fs::read_to_string(&path).map(Some).map_err(|err| {
                    minijinja::Error::new(
                        ErrorKind::InvalidOperation,
                        format!("could not read template {}", path.display()),
                    )
                    .with_source(err)
                });
            }
        }
    }
    Ok(BUILTIN_TEMPLATES
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, source)| source.to_string()))
}

// ---------------------------------------------------------------------------
// Literal emission
// ---------------------------------------------------------------------------

/// `pyrepr` filter: renders a value as a Python literal.
fn pyrepr(value: minijinja::Value) -> Result<String, minijinja::Error> {
    if value.is_undefined() {
        return Err(minijinja::Error::new(
            ErrorKind::UndefinedError,
            "cannot emit an undefined value",
        ));
    }
    let json = serde_json::to_value(&value).map_err(|err| {
        minijinja::Error::new(ErrorKind::InvalidOperation, "value cannot be emitted as a literal")
            .with_source(err)
    })?;
    Ok(python_literal(&json))
}

/// Renders `value` as Python source text. Object keys keep the map's order.
pub fn python_literal(value: &Value) -> String {
    let mut out = String::new();
    write_literal(&mut out, value);
    out
}

fn write_literal(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_str(out, s),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                write_literal(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (index, (key, item)) in map.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                write_str(out, key);
                out.push_str(": ");
                write_literal(out, item);
            }
            out.push('}');
        }
    }
}

fn write_str(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
}
