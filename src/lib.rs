//! sdkpin - enforce one platform SDK policy across a module graph
//!
//! Every library module of a multi-module build ends up compiling against
//! the same SDK version with the same lint policy, no matter what its own
//! configuration declares or when that configuration runs relative to the
//! override.

pub mod apply;
pub mod config;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod orchestrator;
pub mod policy;
pub mod probe;
pub mod report;
pub mod session;

pub use config::{ConfigError, EffectiveConfig};
pub use error::OverrideError;
pub use layout::{BuildLayout, LayoutError};
pub use manifest::{GraphManifest, ManifestError, ModuleManifest};
pub use orchestrator::{Orchestrator, Outcome};
pub use policy::EnforcedPolicy;
pub use report::{ModuleReport, OverrideReport};
pub use session::{BuildSession, SessionError};

pub use sdkpin_graph::{
    EvaluationGate, Graph, GraphError, LintOptions, Module, ModuleKind, ModuleRegistry,
    PlatformSettings,
};
