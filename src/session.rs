//! Build session
//!
//! Drives one enforcement run the way a host build engine would:
//! 1. evaluate the eager module (the evaluation dependency),
//! 2. run the orchestrator over the whole graph,
//! 3. evaluate the remaining modules lazily, in declaration order,
//! 4. check that no module was left with an unfired override hook.

use std::path::Path;

use sdkpin_graph::Graph;
use tracing::{info, warn};

use crate::config::{ConfigError, EffectiveConfig};
use crate::error::OverrideError;
use crate::layout::{BuildLayout, LayoutError};
use crate::manifest::{GraphManifest, ManifestError};
use crate::orchestrator::Orchestrator;
use crate::policy::EnforcedPolicy;
use crate::report::OverrideReport;

/// Errors from a build session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Override(#[from] OverrideError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Override never ran for module(s): {}", .0.join(", "))]
    Unwired(Vec<String>),
}

/// One enforcement run over a module graph
#[derive(Debug)]
pub struct BuildSession {
    graph: Graph,
    layout: BuildLayout,
    policy: EnforcedPolicy,
}

impl BuildSession {
    pub fn new(graph: Graph, layout: BuildLayout, policy: EnforcedPolicy) -> Self {
        Self {
            graph,
            layout,
            policy,
        }
    }

    /// Build a session from a manifest located in `manifest_dir`.
    ///
    /// The manifest's `eager` key wins over the configured eager module. A
    /// configured module the manifest does not declare is ignored with a
    /// warning; the manifest's own key is checked when it is parsed.
    pub fn from_manifest(
        manifest: &GraphManifest,
        manifest_dir: &Path,
        config: &EffectiveConfig,
    ) -> Result<Self, SessionError> {
        let eager = match (&manifest.eager, config.eager_module()) {
            (Some(name), _) => Some(name.as_str()),
            (None, Some(name)) if manifest.contains(name) => Some(name),
            (None, Some(name)) => {
                warn!(module = name, "configured eager module not in graph; ignoring");
                None
            }
            (None, None) => None,
        };

        let layout = BuildLayout::new(&manifest.project_root(manifest_dir), config.build_dir());
        let graph = manifest.build_graph(&layout, eager)?;
        Ok(Self::new(graph, layout, config.policy()))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    pub fn policy(&self) -> &EnforcedPolicy {
        &self.policy
    }

    /// Run the enforcement pass and report the final module states
    pub fn run(&mut self) -> Result<OverrideReport, SessionError> {
        if let Some(eager) = self.graph.evaluate_eager().map_err(OverrideError::from)? {
            info!(module = %eager, "eager module evaluated");
        }

        let orchestrator = Orchestrator::new(self.policy);
        orchestrator.run(&mut self.graph)?;

        let evaluated = self
            .graph
            .evaluate_pending()
            .map_err(OverrideError::from)?;
        info!(modules = evaluated, "lazy modules evaluated");

        let unwired = orchestrator.pending();
        if !unwired.is_empty() {
            return Err(SessionError::Unwired(unwired));
        }

        let report = OverrideReport::new(&self.graph, &orchestrator, &self.layout);
        info!(
            applied = report.applied_count(),
            skipped = report.skipped_count(),
            "platform policy enforced"
        );
        Ok(report)
    }
}
