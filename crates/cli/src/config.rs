//! Compiler configuration.
//!
//! An optional YAML file supplies settings shared by every invocation; CLI
//! flags extend or override them. Relative paths in the file are resolved
//! against the file's own directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use pipeline::{ExecutionContext, NodeName, PropertyMap, Resource, ResourceName};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Directories searched for `<type>.yaml` generator specs, before the
    /// built-in specs.
    #[serde(default)]
    pub spec_dirs: Vec<PathBuf>,

    /// Directory whose templates shadow the embedded ones.
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    /// Task arguments applied beneath every node's own properties.
    #[serde(default)]
    pub default_task_args: PropertyMap,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration. `RUST_LOG`, when set, takes precedence over `level`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive: trace, debug, info, warn, error, off, or any
    /// `EnvFilter` expression.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log line format. Logs always go to stderr; stdout carries fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl CompilerConfig {
    /// Loads the file at `path`, or returns defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut config: Self = serde_yaml::from_str(&source)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        for dir in &mut self.spec_dirs {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        if let Some(dir) = self.template_dir.as_mut().filter(|dir| dir.is_relative()) {
            *dir = base.join(&*dir);
        }
    }
}

/// Loads the execution context: resources from an optional YAML mapping of
/// name → `{type, properties}`, plus the referring node, if any.
pub fn load_context(
    resources: Option<&Path>,
    referrer: Option<NodeName>,
) -> anyhow::Result<ExecutionContext> {
    let resources: BTreeMap<ResourceName, Resource> = match resources {
        None => BTreeMap::new(),
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("reading resources file {}", path.display()))?;
            serde_yaml::from_str(&source)
                .with_context(|| format!("parsing resources file {}", path.display()))?
        }
    };
    Ok(ExecutionContext::new(referrer, resources))
}
