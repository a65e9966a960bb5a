//! dagsmith CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load the optional YAML config file and merge
//!    command-line overrides into it.
//! 2. **Wire observability**: configure `tracing-subscriber` with a text or
//!    JSON layer on stderr. Every span and event emitted by the workspace
//!    crates flows through it; stdout is reserved for generated code.
//! 3. **Construct collaborators**: the spec registry, template library and
//!    capability registry, injected into a [`nodes::Compiler`].
//! 4. **Dispatch**: `render` compiles one generator node and prints its
//!    preamble and operator fragments; `specs` lists the available generator
//!    types.

mod config;

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use nodes::{builtin_capabilities, Compiler, GeneratorNodeConfig, RenderInputs, SpecRegistry, TemplateLibrary};
use pipeline::{CompilationRunId, NodeName, Timestamp};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{load_context, CompilerConfig, LogFormat};

/// Compiles generator nodes into workflow code fragments.
#[derive(Debug, Parser)]
#[command(name = "dagsmith", version)]
#[command(about = "Compile generator nodes into Python workflow fragments")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Additional directory to search for generator specs; may be repeated.
    /// Searched before the directories named in the config file.
    #[arg(long = "spec-dir", global = true)]
    spec_dirs: Vec<PathBuf>,

    /// Log level or filter directive (overrides the config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (overrides the config file)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile one generator node and print its preamble and operator
    Render(RenderArgs),
    /// List the generator types that can be instantiated
    Specs,
}

#[derive(Debug, clap::Args)]
struct RenderArgs {
    /// Generator node definition (YAML)
    #[arg(long)]
    node: PathBuf,

    /// Resources available to the node (YAML mapping of name to resource)
    #[arg(long)]
    resources: Option<PathBuf>,

    /// Name of the node referring to this one
    #[arg(long)]
    referrer: Option<String>,

    /// Directory of templates overriding the embedded ones
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Operator display name; defaults to the node name
    #[arg(long)]
    operator_name: Option<String>,

    /// Upstream task the expanded tasks depend on; may be repeated
    #[arg(long = "upstream")]
    upstream: Vec<String>,

    /// Downstream task depending on the expanded tasks; may be repeated
    #[arg(long = "downstream")]
    downstream: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CompilerConfig::load(cli.config.as_deref())?;
    init_tracing(&cli, &config)?;

    let run_id = CompilationRunId::new_random();
    let span = tracing::info_span!("dagsmith", run_id = %run_id, started_at = %Timestamp::now());
    let _enter = span.enter();

    let mut spec_dirs = cli.spec_dirs.clone();
    spec_dirs.extend(config.spec_dirs.iter().cloned());
    let specs = SpecRegistry::with_search_dirs(spec_dirs);

    match cli.command {
        Command::Render(args) => render(args, &config, &specs),
        Command::Specs => list_specs(&specs),
    }
}

fn init_tracing(cli: &Cli, config: &CompilerConfig) -> anyhow::Result<()> {
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directive) if !directive.is_empty() => EnvFilter::try_new(directive),
        _ => EnvFilter::try_new(level),
    }
    .with_context(|| format!("invalid log filter '{level}'"))?;

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format.unwrap_or(config.logging.format) {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("installing tracing subscriber")
}

fn render(args: RenderArgs, config: &CompilerConfig, specs: &SpecRegistry) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&args.node)
        .with_context(|| format!("reading node definition {}", args.node.display()))?;
    let label = args.node.display().to_string();
    let node_config = GeneratorNodeConfig::from_yaml(&label, &source)?;

    let referrer = args.referrer.and_then(NodeName::new);
    let context = load_context(args.resources.as_deref(), referrer)?;

    let templates = match args.template_dir.as_ref().or(config.template_dir.as_ref()) {
        Some(dir) => TemplateLibrary::with_override_dir(dir.clone()),
        None => TemplateLibrary::builtin(),
    };
    let capabilities = builtin_capabilities();

    let inputs = RenderInputs {
        operator_name: args
            .operator_name
            .unwrap_or_else(|| node_config.name.to_string()),
        upstream_dependencies: args.upstream,
        downstream_dependencies: args.downstream,
    };

    let compiler = Compiler {
        specs,
        templates: &templates,
        capabilities: &capabilities,
        default_task_args: &config.default_task_args,
    };
    let fragments = compiler
        .compile(node_config, &context, &inputs)
        .with_context(|| format!("compiling {label}"))?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", fragments.preamble)?;
    writeln!(out, "{}", fragments.operator)?;
    Ok(())
}

fn list_specs(specs: &SpecRegistry) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    for name in specs.available()? {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_flags_parse() {
        let cli = Cli::try_parse_from([
            "dagsmith",
            "render",
            "--node",
            "node.yaml",
            "--upstream",
            "a",
            "--upstream",
            "b",
            "--downstream",
            "c",
            "--spec-dir",
            "specs",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.spec_dirs, vec![PathBuf::from("specs")]);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.node, PathBuf::from("node.yaml"));
        assert_eq!(args.upstream, vec!["a", "b"]);
        assert_eq!(args.downstream, vec!["c"]);
        assert!(args.operator_name.is_none());
    }

    #[test]
    fn render_requires_a_node() {
        assert!(Cli::try_parse_from(["dagsmith", "render"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
