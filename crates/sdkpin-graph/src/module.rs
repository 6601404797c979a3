//! Module model
//!
//! A module is one node of the build graph. It starts `Pending`, runs its
//! own configuration step once, and becomes `Evaluated`. Library modules
//! expose [`PlatformSettings`] once their configuration has installed them.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BoxError;

/// A module's own configuration step.
pub type ConfigureScript = Box<dyn FnOnce(&mut Module) -> Result<(), BoxError>>;

/// One-shot callback run right after a module is evaluated.
pub type Hook = Box<dyn FnOnce(&mut Module) -> Result<(), BoxError>>;

/// Kind tag of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// The application module
    Application,
    /// A library module exposing platform settings
    Library,
    /// A module without platform settings (pure JVM, tooling, ...)
    Plain,
}

impl ModuleKind {
    /// Whether modules of this kind carry the overridable platform settings
    pub fn exposes_platform_settings(&self) -> bool {
        matches!(self, ModuleKind::Library)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Application => "application",
            ModuleKind::Library => "library",
            ModuleKind::Plain => "plain",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Evaluation state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationState {
    Pending,
    Evaluated,
}

/// Lint options of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintOptions {
    /// Fail the build when lint reports errors
    pub abort_on_error: bool,

    /// Run lint as part of release builds
    pub check_release_builds: bool,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            abort_on_error: true,
            check_release_builds: true,
        }
    }
}

/// Platform settings read by the toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Target SDK version the module compiles against
    pub compile_sdk: u32,

    /// Lint options
    #[serde(default)]
    pub lint: LintOptions,
}

impl PlatformSettings {
    pub fn new(compile_sdk: u32) -> Self {
        Self {
            compile_sdk,
            lint: LintOptions::default(),
        }
    }
}

/// A module of the build graph
pub struct Module {
    name: String,
    kind: ModuleKind,
    state: EvaluationState,
    settings: Option<PlatformSettings>,
    build_dir: Option<PathBuf>,
    script: Option<ConfigureScript>,
    pub(crate) hooks: Vec<Hook>,
}

impl Module {
    /// Create a pending module with no configuration step
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            state: EvaluationState::Pending,
            settings: None,
            build_dir: None,
            script: None,
            hooks: Vec::new(),
        }
    }

    /// Set the module's own configuration step
    pub fn with_script<F>(mut self, script: F) -> Self
    where
        F: FnOnce(&mut Module) -> Result<(), BoxError> + 'static,
    {
        self.script = Some(Box::new(script));
        self
    }

    /// Configuration step that installs the given settings
    pub fn with_declared_settings(self, settings: PlatformSettings) -> Self {
        self.with_script(move |module| {
            module.install_settings(settings);
            Ok(())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn state(&self) -> EvaluationState {
        self.state
    }

    pub fn is_evaluated(&self) -> bool {
        self.state == EvaluationState::Evaluated
    }

    /// Current platform settings, `None` until installed
    pub fn settings(&self) -> Option<&PlatformSettings> {
        self.settings.as_ref()
    }

    pub fn settings_mut(&mut self) -> Option<&mut PlatformSettings> {
        self.settings.as_mut()
    }

    /// Install (or replace) the platform settings surface
    pub fn install_settings(&mut self, settings: PlatformSettings) {
        self.settings = Some(settings);
    }

    pub fn build_dir(&self) -> Option<&Path> {
        self.build_dir.as_deref()
    }

    pub fn set_build_dir(&mut self, dir: PathBuf) {
        self.build_dir = Some(dir);
    }

    /// Number of hooks waiting for this module's evaluation
    pub fn pending_hooks(&self) -> usize {
        self.hooks.len()
    }

    pub(crate) fn take_script(&mut self) -> Option<ConfigureScript> {
        self.script.take()
    }

    pub(crate) fn mark_evaluated(&mut self) {
        self.state = EvaluationState::Evaluated;
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("build_dir", &self.build_dir)
            .field("has_script", &self.script.is_some())
            .field("pending_hooks", &self.hooks.len())
            .finish()
    }
}
