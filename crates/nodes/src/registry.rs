//! Generator spec registry.
//!
//! Specs are looked up by generator type name. Each name is loaded at most
//! once per registry: on first access the registry reads
//! `<dir>/<name>.yaml` (or `.yml`) from its search directories, falling back
//! to the built-in specs, and caches the result. Cached specs are never
//! invalidated; a registry lives for one compilation run.
//!
//! The registry is owned and injected by the caller rather than held in a
//! process-wide static, so tests can use isolated registries.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use pipeline::{CompileError, GeneratorType};

use crate::generator::{GeneratorNode, GeneratorNodeConfig};
use crate::spec::GeneratorSpec;

const BUILTIN_SPECS: [(&str, &str); 2] = [
    ("list_generator", include_str!("../specs/list_generator.yaml")),
    (
        "requests_json_generator",
        include_str!("../specs/requests_json_generator.yaml"),
    ),
];

const SPEC_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Read-mostly cache of generator specs keyed by type name.
#[derive(Debug, Default)]
pub struct SpecRegistry {
    search_dirs: Vec<PathBuf>,
    cache: RwLock<HashMap<GeneratorType, Arc<GeneratorSpec>>>,
}

impl SpecRegistry {
    /// A registry that only knows the built-in specs.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// A registry that searches `search_dirs` in order before the built-ins.
    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            cache: RwLock::default(),
        }
    }

    /// Returns the spec registered as `name`, loading it on first access.
    ///
    /// `Ok(None)` means no spec of that name exists anywhere.
    pub fn get(&self, name: &GeneratorType) -> Result<Option<Arc<GeneratorSpec>>, CompileError> {
        if let Some(spec) = self.cache.read().get(name) {
            return Ok(Some(Arc::clone(spec)));
        }

        let Some(spec) = self.load(name)? else {
            return Ok(None);
        };
        let mut cache = self.cache.write();
        let spec = cache.entry(name.clone()).or_insert_with(|| Arc::new(spec));
        Ok(Some(Arc::clone(spec)))
    }

    /// Looks up the spec named by `config.generator_type` and builds the node.
    ///
    /// # Errors
    ///
    /// [`CompileError::UnknownGeneratorType`] when no such spec exists, plus
    /// any spec loading or node construction error.
    pub fn instantiate(&self, config: GeneratorNodeConfig) -> Result<GeneratorNode, CompileError> {
        let spec = self.get(&config.generator_type)?.ok_or_else(|| {
            CompileError::UnknownGeneratorType {
                node: config.name.to_string(),
                generator_type: config.generator_type.to_string(),
            }
        })?;
        GeneratorNode::new(spec, config)
    }

    /// Every type name this registry can resolve, sorted.
    pub fn available(&self) -> Result<Vec<GeneratorType>, CompileError> {
        let mut names: BTreeSet<GeneratorType> = BUILTIN_SPECS
            .iter()
            .filter_map(|(name, _)| GeneratorType::new(*name))
            .collect();

        for dir in &self.search_dirs {
            let entries = std::fs::read_dir(dir).map_err(|err| CompileError::SpecLoad {
                spec: dir.display().to_string(),
                message: err.to_string(),
            })?;
            for entry in entries.flatten() {
                let path = entry.path();
                let is_spec = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| SPEC_EXTENSIONS.contains(&ext));
                if let Some(name) = is_spec
                    .then(|| path.file_stem().and_then(|stem| stem.to_str()))
                    .flatten()
                    .and_then(GeneratorType::new)
                {
                    names.insert(name);
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    fn load(&self, name: &GeneratorType) -> Result<Option<GeneratorSpec>, CompileError> {
        for dir in &self.search_dirs {
            for ext in SPEC_EXTENSIONS {
                let path = dir.join(format!("{name}.{ext}"));
                if path.is_file() {
                    return load_file(name, &path).map(Some);
                }
            }
        }

        let builtin = BUILTIN_SPECS
            .iter()
            .find(|(builtin, _)| *builtin == name.as_str())
            .map(|(_, source)| *source);
        match builtin {
            Some(source) => {
                tracing::debug!(generator_type = %name, "loading built-in generator spec");
                check_name(name, GeneratorSpec::from_yaml(name.as_str(), source)?).map(Some)
            }
            None => Ok(None),
        }
    }
}

fn load_file(name: &GeneratorType, path: &Path) -> Result<GeneratorSpec, CompileError> {
    tracing::debug!(generator_type = %name, path = %path.display(), "loading generator spec");
    let source = std::fs::read_to_string(path).map_err(|err| CompileError::SpecLoad {
        spec: name.to_string(),
        message: format!("{}: {err}", path.display()),
    })?;
    check_name(name, GeneratorSpec::from_yaml(name.as_str(), &source)?)
}

fn check_name(name: &GeneratorType, spec: GeneratorSpec) -> Result<GeneratorSpec, CompileError> {
    if spec.name() != name {
        return Err(CompileError::schema(
            name.as_str(),
            "name",
            format!("spec declares name '{}'", spec.name()),
        ));
    }
    Ok(spec)
}
