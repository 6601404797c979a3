//! Lazily evaluated module graph.
//!
//! A [`Graph`] owns every module of a multi-module build. Each module runs
//! its own configuration step exactly once (`pending → evaluated`), in an
//! order chosen by whoever drives the build. Code that needs to act on a
//! module *after* its configuration registers a one-shot hook through the
//! [`EvaluationGate`] seam; the hook fires synchronously right after the
//! transition, or immediately if the module is already evaluated.

mod error;
mod graph;
mod module;

pub use error::{BoxError, GraphError};
pub use graph::{EvaluationGate, Graph, ModuleRegistry};
pub use module::{
    ConfigureScript, EvaluationState, Hook, LintOptions, Module, ModuleKind, PlatformSettings,
};
