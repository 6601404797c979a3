//! Graph manifest
//!
//! TOML description of a module graph, standing in for the host build
//! engine when running from the command line. Each `[[module]]` entry
//! becomes a pending module whose configuration step installs the declared
//! settings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sdkpin_graph::{Graph, GraphError, LintOptions, Module, ModuleKind, PlatformSettings};
use serde::{Deserialize, Serialize};

use crate::layout::{project_name, BuildLayout};

/// Module graph manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphManifest {
    /// Project root, relative to the manifest's directory (default: that directory)
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Module every other module's evaluation depends on
    #[serde(default)]
    pub eager: Option<String>,

    /// Modules in declaration order
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleManifest>,
}

/// A single module entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Graph path, e.g. ":app" or ":feature:login"
    pub name: String,

    pub kind: ModuleKind,

    /// SDK version the module's own configuration declares
    #[serde(default)]
    pub compile_sdk: Option<u32>,

    #[serde(default)]
    pub abort_on_error: Option<bool>,

    #[serde(default)]
    pub check_release_builds: Option<bool>,
}

impl ModuleManifest {
    /// Settings installed by this module's configuration step.
    ///
    /// `None` when the module declares no platform settings at all; lint
    /// options left unset take the platform defaults.
    pub fn declared_settings(&self) -> Option<PlatformSettings> {
        let compile_sdk = self.compile_sdk?;
        let defaults = LintOptions::default();
        Some(PlatformSettings {
            compile_sdk,
            lint: LintOptions {
                abort_on_error: self.abort_on_error.unwrap_or(defaults.abort_on_error),
                check_release_builds: self
                    .check_release_builds
                    .unwrap_or(defaults.check_release_builds),
            },
        })
    }

    fn to_module(&self) -> Module {
        let module = Module::new(self.name.clone(), self.kind);
        match self.declared_settings() {
            Some(settings) => module.with_declared_settings(settings),
            None => module,
        }
    }
}

/// Errors that can occur when loading or validating a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Manifest file not found: {0}")]
    NotFound(PathBuf),

    #[error("Duplicate module name: '{0}'")]
    DuplicateName(String),

    #[error("Invalid module name: '{0}'")]
    InvalidName(String),

    #[error("Eager module '{0}' is not declared in the manifest")]
    UnknownEager(String),

    #[error("Module '{name}': invalid value for '{field}': {reason}")]
    InvalidValue {
        name: String,
        field: String,
        reason: String,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl GraphManifest {
    /// Load a manifest from a file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a manifest from TOML
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let manifest: GraphManifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for module in &self.modules {
            if project_name(&module.name).is_empty() {
                return Err(ManifestError::InvalidName(module.name.clone()));
            }
            if !seen.insert(module.name.as_str()) {
                return Err(ManifestError::DuplicateName(module.name.clone()));
            }

            let has_lint =
                module.abort_on_error.is_some() || module.check_release_builds.is_some();
            match module.compile_sdk {
                Some(0) => {
                    return Err(ManifestError::InvalidValue {
                        name: module.name.clone(),
                        field: "compile_sdk".to_string(),
                        reason: "must be positive".to_string(),
                    })
                }
                Some(_) if module.kind == ModuleKind::Plain => {
                    return Err(ManifestError::InvalidValue {
                        name: module.name.clone(),
                        field: "compile_sdk".to_string(),
                        reason: "plain modules carry no platform settings".to_string(),
                    })
                }
                None if has_lint => {
                    return Err(ManifestError::InvalidValue {
                        name: module.name.clone(),
                        field: "compile_sdk".to_string(),
                        reason: "lint options require compile_sdk".to_string(),
                    })
                }
                _ => {}
            }
        }

        if let Some(eager) = &self.eager {
            if !seen.contains(eager.as_str()) {
                return Err(ManifestError::UnknownEager(eager.clone()));
            }
        }

        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name == name)
    }

    /// Project root for a manifest located in `manifest_dir`
    pub fn project_root(&self, manifest_dir: &Path) -> PathBuf {
        match &self.root {
            Some(root) => manifest_dir.join(root),
            None => manifest_dir.to_path_buf(),
        }
    }

    /// Build the pending module graph.
    ///
    /// Every module gets its relocated build directory before anything is
    /// evaluated.
    pub fn build_graph(
        &self,
        layout: &BuildLayout,
        eager: Option<&str>,
    ) -> Result<Graph, ManifestError> {
        let mut graph = Graph::new();
        for entry in &self.modules {
            let mut module = entry.to_module();
            module.set_build_dir(layout.module_dir(&entry.name));
            graph.add_module(module)?;
        }
        if let Some(eager) = eager {
            graph.set_eager(eager)?;
        }
        Ok(graph)
    }
}
