//! Shape of the preamble and operator fragments under each batching mode.
//!
//! The downstream assembler keys off textual patterns (function names and
//! argument bindings), so these tests check the rendered text with regexes.

use std::sync::Arc;

use nodes::{
    builtin_capabilities, BatchingConfig, Compiler, GeneratorNode, GeneratorNodeConfig,
    GeneratorSpec, RenderInputs, SpecRegistry, TemplateLibrary,
};
use pipeline::{CapabilityRegistry, CompileError, ExecutionContext, PropertyMap};
use proptest::prelude::*;
use regex::Regex;
use serde_json::json;

const GENERATOR_CONFIG_YAML: &str = r#"
name: list_generator
iterator_builder_method_code: return items
item_name_builder_code: return item
parameters_jsonschema:
    properties:
        items:
            type: array
            items:
                type: string
    additionalProperties: false
    required:
        - items
"#;

struct Harness {
    spec: Arc<GeneratorSpec>,
    templates: TemplateLibrary,
}

struct PreambleMatches {
    items_batch_name: bool,
    item_item_name: bool,
}

struct OperatorMatches {
    item_name_builder: bool,
    batch_name_builder: bool,
    filter_helper: bool,
    grouped_helper: bool,
    items_batch_name: bool,
    item_item_name: bool,
}

impl Harness {
    fn new() -> Self {
        Self {
            spec: Arc::new(GeneratorSpec::from_yaml("list_generator", GENERATOR_CONFIG_YAML).unwrap()),
            templates: TemplateLibrary::builtin(),
        }
    }

    fn build_node(&self, batching: Option<BatchingConfig>) -> GeneratorNode {
        let mut config: GeneratorNodeConfig = serde_json::from_value(json!({
            "name": "test_generator",
            "type": "list_generator",
            "target": "some_target",
            "properties": { "items": ["a", "b", "c", "d", "e", "f", "g"] },
        }))
        .unwrap();
        config.batching = batching;
        GeneratorNode::new(Arc::clone(&self.spec), config).unwrap()
    }

    fn inputs() -> RenderInputs {
        RenderInputs {
            operator_name: "foo".into(),
            upstream_dependencies: vec!["upstream_foo".into()],
            downstream_dependencies: vec!["downstream_bar".into()],
        }
    }

    fn preamble(&self, batching: Option<BatchingConfig>) -> PreambleMatches {
        let node = self.build_node(batching);
        let rendered = self.templates.render_preamble(&node, &Self::inputs()).unwrap();

        PreambleMatches {
            items_batch_name: Regex::new(r"\s+items,\s+batch_name,").unwrap().is_match(&rendered),
            item_item_name: Regex::new(r"\s+item,\s+item_name,").unwrap().is_match(&rendered),
        }
    }

    fn operator(&self, batching: Option<BatchingConfig>) -> OperatorMatches {
        let mut node = self.build_node(batching);
        node.resolve_properties(
            &ExecutionContext::default(),
            &PropertyMap::new(),
            &CapabilityRegistry::new(),
        )
        .unwrap();
        let rendered = self.templates.render_operator(&node, &Self::inputs()).unwrap();

        let name = node.name().as_str();
        let invocation = format!(r"\s+{}_builder\(\s+index = index,", node.target());
        let matches = |pattern: &str| Regex::new(pattern).unwrap().is_match(&rendered);

        OperatorMatches {
            item_name_builder: matches(&format!(r".*def {name}_item_name_builder\(.*")),
            batch_name_builder: matches(&format!(r".*def {name}_batch_name_builder\(.*")),
            filter_helper: matches(r".*def generator_helper_filter_with_blocklist\(.*"),
            grouped_helper: matches(r".*def generator_helper_grouped_list\(.*"),
            items_batch_name: matches(&format!(
                r"{invocation}\s+items = items,\s+batch_name = batch_name,"
            )),
            item_item_name: matches(&format!(r"{invocation}\s+item = item,\s+item_name = item_name,")),
        }
    }
}

fn enabled() -> Option<BatchingConfig> {
    Some(BatchingConfig {
        batch_size: Some(3),
        disabled: false,
    })
}

fn disabled() -> Option<BatchingConfig> {
    Some(BatchingConfig {
        batch_size: Some(3),
        disabled: true,
    })
}

// ---------------------------------------------------------------------------
// batching_enabled
// ---------------------------------------------------------------------------

#[test]
fn batching_enabled_when_configured() {
    assert!(Harness::new().build_node(enabled()).batching_enabled());
}

#[test]
fn batching_disabled_flag_wins() {
    assert!(!Harness::new().build_node(disabled()).batching_enabled());
}

#[test]
fn batching_undefined_is_disabled() {
    assert!(!Harness::new().build_node(None).batching_enabled());
}

// ---------------------------------------------------------------------------
// Preamble
// ---------------------------------------------------------------------------

#[test]
fn preamble_batching_enabled() {
    let matches = Harness::new().preamble(enabled());
    assert!(matches.items_batch_name);
    assert!(!matches.item_item_name);
}

#[test]
fn preamble_batching_disabled() {
    let matches = Harness::new().preamble(disabled());
    assert!(matches.item_item_name);
    assert!(!matches.items_batch_name);
}

#[test]
fn preamble_batching_undefined() {
    let matches = Harness::new().preamble(None);
    assert!(matches.item_item_name);
    assert!(!matches.items_batch_name);
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

#[test]
fn operator_batching_enabled() {
    let matches = Harness::new().operator(enabled());
    assert!(matches.item_name_builder);
    assert!(matches.batch_name_builder);
    assert!(matches.filter_helper);
    assert!(matches.grouped_helper);
    assert!(matches.items_batch_name);
    assert!(!matches.item_item_name);
}

#[test]
fn operator_batching_disabled() {
    let matches = Harness::new().operator(disabled());
    assert!(matches.item_name_builder);
    assert!(!matches.batch_name_builder);
    assert!(!matches.filter_helper);
    assert!(!matches.grouped_helper);
    assert!(!matches.items_batch_name);
    assert!(matches.item_item_name);
}

#[test]
fn operator_batching_undefined() {
    let matches = Harness::new().operator(None);
    assert!(matches.item_name_builder);
    assert!(!matches.batch_name_builder);
    assert!(!matches.filter_helper);
    assert!(!matches.grouped_helper);
    assert!(!matches.items_batch_name);
    assert!(matches.item_item_name);
}

// ---------------------------------------------------------------------------
// Rendered details
// ---------------------------------------------------------------------------

#[test]
fn batched_operator_groups_resolved_items() {
    let harness = Harness::new();
    let mut node = harness.build_node(enabled());
    node.resolve_properties(
        &ExecutionContext::default(),
        &PropertyMap::new(),
        &CapabilityRegistry::new(),
    )
    .unwrap();
    let rendered = harness
        .templates
        .render_operator(&node, &Harness::inputs())
        .unwrap();

    assert!(rendered.contains("def test_generator_iterator_builder(items):"));
    assert!(rendered.contains("items = ['a', 'b', 'c', 'd', 'e', 'f', 'g'],"));
    assert!(rendered.contains("generator_helper_grouped_list(test_generator_items, 3)"));
    // The spec has no batch-name builder, so the index-based fallback is emitted.
    assert!(rendered.contains("return 'batch_{}'.format(index)"));
    assert!(rendered.contains("upstream_dependencies = ['upstream_foo']"));
    assert!(rendered.contains("downstream_dependencies = ['downstream_bar']"));
}

#[test]
fn spec_batch_name_builder_is_preferred() {
    let source = format!("{GENERATOR_CONFIG_YAML}batch_name_builder_code: return '-'.join(items)\n");
    let spec = Arc::new(GeneratorSpec::from_yaml("list_generator", &source).unwrap());
    let config: GeneratorNodeConfig = serde_json::from_value(json!({
        "name": "joined",
        "type": "list_generator",
        "target": "some_target",
        "properties": { "items": ["a"] },
        "batching": { "batch_size": 2 },
    }))
    .unwrap();
    let mut node = GeneratorNode::new(spec, config).unwrap();
    node.resolve_properties(
        &ExecutionContext::default(),
        &PropertyMap::new(),
        &CapabilityRegistry::new(),
    )
    .unwrap();

    let rendered = TemplateLibrary::builtin()
        .render_operator(&node, &RenderInputs::default())
        .unwrap();
    assert!(rendered.contains("return '-'.join(items)"));
    assert!(!rendered.contains("'batch_{}'"));
}

#[test]
fn operator_name_cannot_break_the_docstring() {
    let harness = Harness::new();
    let node = harness.build_node(None);
    let inputs = RenderInputs {
        operator_name: r#"say """hi""" \"#.into(),
        ..Harness::inputs()
    };
    let rendered = harness.templates.render_preamble(&node, &inputs).unwrap();

    assert!(rendered.contains(
        r#"    'Builds the tasks that say """hi""" \\ creates for one item of test_generator.'"#
    ));
}

proptest! {
    #[test]
    fn operator_groups_by_the_configured_size(size in 1i64..500, disabled in any::<bool>()) {
        let harness = Harness::new();
        let mut node = harness.build_node(Some(BatchingConfig {
            batch_size: Some(size),
            disabled,
        }));
        node.resolve_properties(
            &ExecutionContext::default(),
            &PropertyMap::new(),
            &CapabilityRegistry::new(),
        )
        .unwrap();
        let rendered = harness
            .templates
            .render_operator(&node, &Harness::inputs())
            .unwrap();

        let grouped = format!(
            "for (index, items) in enumerate(generator_helper_grouped_list(test_generator_items, {size})):"
        );
        prop_assert_eq!(rendered.contains(&grouped), !disabled);
        prop_assert_eq!(
            rendered.contains("for (index, item) in enumerate(test_generator_items):"),
            disabled
        );
    }
}

#[test]
fn unbatched_blocklist_is_inlined() {
    let harness = Harness::new();
    let mut config: GeneratorNodeConfig = serde_json::from_value(json!({
        "name": "test_generator",
        "type": "list_generator",
        "target": "some_target",
        "properties": { "items": ["a", "tmp_b"] },
        "regex_blocklist": ["tmp_"],
    }))
    .unwrap();
    config.batching = None;
    let mut node = GeneratorNode::new(Arc::clone(&harness.spec), config).unwrap();
    node.resolve_properties(
        &ExecutionContext::default(),
        &PropertyMap::new(),
        &CapabilityRegistry::new(),
    )
    .unwrap();

    let rendered = harness
        .templates
        .render_operator(&node, &Harness::inputs())
        .unwrap();
    assert!(rendered.contains("for pattern in ['tmp_']"));
    assert!(!rendered.contains("generator_helper_"));
}

#[test]
fn operator_requires_resolution() {
    let harness = Harness::new();
    let node = harness.build_node(None);
    let err = harness
        .templates
        .render_operator(&node, &Harness::inputs())
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::TemplateRender { ref node, ref template, .. }
            if node == "test_generator" && template == "generator_operator.j2"
    ));
}

#[test]
fn override_templates_fail_on_unknown_attributes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("generator_preamble.j2"),
        "def {{ node.target }}_builder({{ node.no_such_attribute }}):\n",
    )
    .unwrap();
    let templates = TemplateLibrary::with_override_dir(dir.path().to_path_buf());

    let node = Harness::new().build_node(None);
    let err = templates.render_preamble(&node, &Harness::inputs()).unwrap_err();
    assert!(matches!(err, CompileError::TemplateRender { .. }));
}

#[test]
fn rendering_is_deterministic() {
    let render = || {
        let harness = Harness::new();
        let mut node = harness.build_node(enabled());
        node.resolve_properties(
            &ExecutionContext::default(),
            &PropertyMap::new(),
            &CapabilityRegistry::new(),
        )
        .unwrap();
        harness
            .templates
            .render_fragments(&node, &Harness::inputs())
            .unwrap()
    };
    assert_eq!(render(), render());
}

// ---------------------------------------------------------------------------
// End to end through the registry
// ---------------------------------------------------------------------------

#[test]
fn compiler_fills_defaults_for_builtin_specs() {
    let specs = SpecRegistry::builtin();
    let templates = TemplateLibrary::builtin();
    let capabilities = builtin_capabilities();
    let default_task_args = PropertyMap::new();
    let compiler = Compiler {
        specs: &specs,
        templates: &templates,
        capabilities: &capabilities,
        default_task_args: &default_task_args,
    };

    let config = GeneratorNodeConfig::from_yaml(
        "node.yaml",
        r#"
name: do_snapshot_copiers
type: requests_json_generator
target: do_something_with_items
properties:
    url: http://my.host.com/my-endpoint
    list_json_key: my-key
"#,
    )
    .unwrap();

    let fragments = compiler
        .compile(config, &ExecutionContext::default(), &Harness::inputs())
        .unwrap();

    assert!(fragments
        .preamble
        .contains("def do_something_with_items_builder("));
    assert!(fragments.operator.contains(
        "def do_snapshot_copiers_iterator_builder(headers, list_json_key, timeout_sec, url):"
    ));
    assert!(fragments.operator.contains("timeout_sec = 5,"));
    assert!(fragments.operator.contains("headers = {},"));
}

#[test]
fn compiler_fails_fast_on_missing_resources() {
    let specs = SpecRegistry::builtin();
    let templates = TemplateLibrary::builtin();
    let capabilities = CapabilityRegistry::new();
    let default_task_args = PropertyMap::new();
    let compiler = Compiler {
        specs: &specs,
        templates: &templates,
        capabilities: &capabilities,
        default_task_args: &default_task_args,
    };

    let config = GeneratorNodeConfig::from_yaml(
        "node.yaml",
        "name: g\ntype: list_generator\ntarget: t\nrequires_resources: [dataproc-cluster]\nproperties:\n  items: [a]\n",
    )
    .unwrap();

    let err = compiler
        .compile(config, &ExecutionContext::default(), &RenderInputs::default())
        .unwrap_err();
    assert_eq!(
        err,
        CompileError::MissingResource {
            node: "g".into(),
            resource: "dataproc-cluster".into(),
        }
    );
}
